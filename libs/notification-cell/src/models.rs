use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendSmsRequest {
    pub phone_number: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsDispatchReport {
    pub recipient: String,
    pub status: String,
    pub message_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("SMS gateway not configured")]
    NotConfigured,

    #[error("SMS gateway rejected the request: {0}")]
    GatewayError(String),

    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),
}
