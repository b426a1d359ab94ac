use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One payment request, keyed by the gateway's own checkout-request id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub consultation_id: Uuid,
    pub patient_id: Uuid,
    pub amount: f64,
    pub phone_number: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub result_description: Option<String>,
    pub merchant_request_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentRequest {
    pub phone_number: String,
    pub amount: f64,
    pub consultation_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentResponse {
    pub success: bool,
    pub checkout_request_id: String,
}

/// STK push acknowledgement from the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    #[serde(rename = "ResponseDescription")]
    pub response_description: Option<String>,
}

/// Asynchronous result callback, delivered by the gateway some time after
/// the push. Field names follow the gateway's wire format.
#[derive(Debug, Clone, Deserialize)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
    #[serde(rename = "CallbackMetadata")]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item")]
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: Option<serde_json::Value>,
}

impl StkCallback {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    /// Pull the gateway receipt out of the metadata items.
    pub fn receipt_number(&self) -> Option<String> {
        self.callback_metadata.as_ref().and_then(|meta| {
            meta.items
                .iter()
                .find(|item| item.name == "MpesaReceiptNumber")
                .and_then(|item| item.value.as_ref())
                .and_then(|v| v.as_str())
                .map(String::from)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockPaymentRequest {
    pub phone_number: String,
    pub amount: f64,
    pub consultation_id: Uuid,
}

/// What the callback handler did with a delivery.
#[derive(Debug)]
pub enum CallbackOutcome {
    Processed(Payment),
    /// The payment had already left pending; the delivery was a duplicate
    /// and no side effects ran.
    Duplicate,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment gateway not configured")]
    NotConfigured,

    #[error("Payment record not found")]
    NotFound,

    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("Payment gateway error: {0}")]
    GatewayError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
