use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{PaymentError, StkPushResponse};

/// Thin client for the mobile-money gateway: OAuth token, then STK push.
pub struct MpesaClient {
    client: Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    passkey: String,
    shortcode: String,
    callback_url: String,
}

impl MpesaClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.mpesa_base_url.clone(),
            consumer_key: config.mpesa_consumer_key.clone(),
            consumer_secret: config.mpesa_consumer_secret.clone(),
            passkey: config.mpesa_passkey.clone(),
            shortcode: config.mpesa_shortcode.clone(),
            callback_url: config.mpesa_callback_url.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.consumer_key.is_empty()
            && !self.consumer_secret.is_empty()
            && !self.passkey.is_empty()
            && !self.shortcode.is_empty()
    }

    async fn get_access_token(&self) -> Result<String, PaymentError> {
        let auth = BASE64.encode(format!("{}:{}", self.consumer_key, self.consumer_secret));
        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.base_url
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Basic {}", auth))
            .send()
            .await
            .map_err(|e| PaymentError::GatewayError(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PaymentError::GatewayError(e.to_string()))?;

        if !status.is_success() {
            warn!("OAuth token request failed ({}): {}", status, body);
            return Err(PaymentError::GatewayError(format!(
                "token request returned {}",
                status
            )));
        }

        body["access_token"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| PaymentError::GatewayError("token response missing access_token".to_string()))
    }

    /// Push a payment prompt to the payer's phone. The gateway answers
    /// synchronously with request ids; the actual result arrives later on
    /// the callback URL.
    pub async fn initiate_stk_push(
        &self,
        phone_number: &str,
        amount: f64,
    ) -> Result<StkPushResponse, PaymentError> {
        if !self.is_configured() {
            return Err(PaymentError::NotConfigured);
        }

        let access_token = self.get_access_token().await?;

        let timestamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let password = build_password(&self.shortcode, &self.passkey, &timestamp);

        debug!("Initiating STK push of {} to {}", amount, phone_number);

        let url = format!("{}/mpesa/stkpush/v1/processrequest", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({
                "BusinessShortCode": self.shortcode,
                "Password": password,
                "Timestamp": timestamp,
                "TransactionType": "CustomerPayBillOnline",
                "Amount": amount,
                "PartyA": phone_number,
                "PartyB": self.shortcode,
                "PhoneNumber": phone_number,
                "CallBackURL": self.callback_url,
                "AccountReference": "Telemedicine",
                "TransactionDesc": "Consultation Payment"
            }))
            .send()
            .await
            .map_err(|e| PaymentError::GatewayError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("STK push failed ({}): {}", status, body);
            return Err(PaymentError::GatewayError(format!(
                "STK push returned {}",
                status
            )));
        }

        response
            .json::<StkPushResponse>()
            .await
            .map_err(|e| PaymentError::GatewayError(e.to_string()))
    }
}

/// base64(shortcode + passkey + timestamp), the gateway's password scheme.
pub fn build_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    BASE64.encode(format!("{}{}{}", shortcode, passkey, timestamp))
}
