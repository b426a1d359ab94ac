use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CallbackOutcome, InitiatePaymentRequest, MockPaymentRequest, PaymentError,
    StkCallbackEnvelope,
};
use crate::services::payment::PaymentService;

fn map_error(e: PaymentError) -> AppError {
    match e {
        PaymentError::NotFound => AppError::NotFound("Payment record not found".to_string()),
        PaymentError::InvalidPhoneNumber(msg) => {
            AppError::BadRequest(format!("Invalid phone number: {}", msg))
        }
        PaymentError::NotConfigured => {
            AppError::ExternalService("Payment gateway not configured".to_string())
        }
        PaymentError::GatewayError(msg) => AppError::ExternalService(msg),
        PaymentError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

#[axum::debug_handler]
pub async fn initiate_payment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<Json<Value>, AppError> {
    if request.amount <= 0.0 {
        return Err(AppError::BadRequest("Amount must be positive".to_string()));
    }

    let service = PaymentService::new(&state);

    let response = service
        .initiate_payment(&user, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(response)))
}

/// Gateway-facing result hook. Unauthenticated by necessity; duplicate
/// deliveries are acknowledged without re-running side effects.
#[axum::debug_handler]
pub async fn payment_callback(
    State(state): State<Arc<AppConfig>>,
    Json(envelope): Json<StkCallbackEnvelope>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&state);

    let outcome = service
        .handle_callback(envelope.body.stk_callback)
        .await
        .map_err(map_error)?;

    let body = match outcome {
        CallbackOutcome::Processed(payment) => json!({
            "message": "Callback processed",
            "status": payment.status
        }),
        CallbackOutcome::Duplicate => json!({
            "message": "Callback already processed"
        }),
    };

    Ok(Json(body))
}

#[axum::debug_handler]
pub async fn mock_payment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<MockPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&state);

    let payment = service
        .mock_payment(&user, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "payment_id": payment.id
    })))
}

#[axum::debug_handler]
pub async fn get_payment(
    State(state): State<Arc<AppConfig>>,
    Path(payment_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&state);

    let payment = service.get_payment(&payment_id).await.map_err(map_error)?;

    if payment.patient_id.to_string() != user.id && !user.is_admin() {
        return Err(AppError::Auth(
            "Not authorized to view this payment".to_string(),
        ));
    }

    Ok(Json(json!(payment)))
}
