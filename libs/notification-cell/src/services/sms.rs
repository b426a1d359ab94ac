use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::models::{NotificationError, SmsDispatchReport};

pub struct SmsService {
    client: Client,
    base_url: String,
    api_key: String,
    username: String,
    sender_id: Option<String>,
}

impl SmsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.sms_base_url.clone(),
            api_key: config.sms_api_key.clone(),
            username: config.sms_username.clone(),
            sender_id: config.sms_sender_id.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.username.is_empty()
    }

    /// Push a single message through the gateway's messaging endpoint.
    pub async fn send(
        &self,
        phone_number: &str,
        message: &str,
    ) -> Result<SmsDispatchReport, NotificationError> {
        if !self.is_configured() {
            return Err(NotificationError::NotConfigured);
        }

        let recipient = normalize_phone(phone_number)
            .ok_or_else(|| NotificationError::InvalidPhoneNumber(phone_number.to_string()))?;

        debug!("Dispatching SMS to {}", recipient);

        let mut form = vec![
            ("username".to_string(), self.username.clone()),
            ("to".to_string(), format!("+{}", recipient)),
            ("message".to_string(), message.to_string()),
        ];
        if let Some(ref sender) = self.sender_id {
            form.push(("from".to_string(), sender.clone()));
        }

        let url = format!("{}/version1/messaging", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apiKey", &self.api_key)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| NotificationError::GatewayError(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| NotificationError::GatewayError(e.to_string()))?;

        if !status.is_success() {
            return Err(NotificationError::GatewayError(format!(
                "gateway returned {}: {}",
                status, body
            )));
        }

        let recipient_report = body["SMSMessageData"]["Recipients"]
            .as_array()
            .and_then(|r| r.first())
            .cloned()
            .unwrap_or(Value::Null);

        let delivery_status = recipient_report["status"]
            .as_str()
            .unwrap_or("Unknown")
            .to_string();
        let message_id = recipient_report["messageId"].as_str().map(String::from);

        info!("SMS to {} dispatched with status {}", recipient, delivery_status);

        Ok(SmsDispatchReport {
            recipient,
            status: delivery_status,
            message_id,
        })
    }

    /// Fire-and-forget variant for flows where a delivery failure should not
    /// fail the surrounding operation (payment callbacks, prescriptions).
    pub async fn send_best_effort(&self, phone_number: &str, message: &str) {
        if let Err(e) = self.send(phone_number, message).await {
            warn!("SMS dispatch to {} failed: {}", phone_number, e);
        }
    }
}

/// Normalise Kenyan MSISDNs the way the payment gateway expects them:
/// strip `+`, convert a leading 0 to the 254 prefix, collapse doubled
/// country codes.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if let Some(rest) = cleaned.strip_prefix('0') {
        format!("254{}", rest)
    } else if let Some(rest) = cleaned.strip_prefix("254254") {
        format!("254{}", rest)
    } else {
        cleaned
    };

    if normalized.len() < 10 {
        return None;
    }

    Some(normalized)
}
