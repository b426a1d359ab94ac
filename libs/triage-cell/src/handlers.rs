use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{ChatRequest, TriageError};
use crate::services::assistant::TriageAssistant;

#[axum::debug_handler]
pub async fn chat_message(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message is required".to_string()));
    }

    let assistant = TriageAssistant::new(&state);

    let response = assistant.chat(request).await.map_err(|e| match e {
        TriageError::NotConfigured => {
            AppError::ExternalService("Triage assistant not configured".to_string())
        }
        TriageError::UpstreamError(msg) => AppError::ExternalService(msg),
        TriageError::EmptyReply => {
            AppError::ExternalService("Chat completion returned no content".to_string())
        }
    })?;

    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn triage_health(State(state): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!({
        "triage_configured": state.is_triage_configured()
    }))
}
