use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{NotificationError, SendSmsRequest};
use crate::services::sms::SmsService;

#[axum::debug_handler]
pub async fn send_sms(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<SendSmsRequest>,
) -> Result<Json<Value>, AppError> {
    // Direct dispatch is an operational tool for doctors and admins;
    // patient-facing notifications go out from the owning cells.
    if !user.is_doctor() && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to send SMS".to_string()));
    }

    let sms_service = SmsService::new(&state);

    let report = sms_service
        .send(&request.phone_number, &request.message)
        .await
        .map_err(|e| match e {
            NotificationError::InvalidPhoneNumber(msg) => {
                AppError::BadRequest(format!("Invalid phone number: {}", msg))
            }
            NotificationError::NotConfigured => {
                AppError::ExternalService("SMS gateway not configured".to_string())
            }
            NotificationError::GatewayError(msg) => AppError::ExternalService(msg),
        })?;

    Ok(Json(json!({
        "message": "SMS sent successfully",
        "report": report
    })))
}

#[axum::debug_handler]
pub async fn sms_health(State(state): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!({
        "sms_configured": state.is_sms_configured()
    }))
}
