use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppendMessageRequest, CancelConsultationRequest, ConsultationError,
    CreateConsultationRequest,
};
use crate::services::consultation::{participant_role, ConsultationService};

fn map_error(e: ConsultationError) -> AppError {
    match e {
        ConsultationError::NotFound => AppError::NotFound("Consultation not found".to_string()),
        ConsultationError::AlreadyTaken => AppError::Conflict(e.to_string()),
        ConsultationError::InvalidStatusTransition { .. } => AppError::Conflict(e.to_string()),
        ConsultationError::RoomNotOpen => AppError::BadRequest(e.to_string()),
        ConsultationError::NotParticipant => AppError::Auth(e.to_string()),
        ConsultationError::ValidationError(msg) => AppError::BadRequest(msg),
        ConsultationError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::BadRequest("Invalid consultation id".to_string()))
}

#[axum::debug_handler]
pub async fn create_consultation(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateConsultationRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ConsultationService::new(&state);

    let consultation = service
        .create_consultation(&user, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "consultation": consultation,
        "message": "Consultation created successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_consultation(
    State(state): State<Arc<AppConfig>>,
    Path(consultation_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&consultation_id)?;
    let service = ConsultationService::new(&state);

    let consultation = service
        .get_consultation(id, auth.token())
        .await
        .map_err(map_error)?;

    if participant_role(&consultation, &user).is_none() && !user.is_admin() {
        return Err(AppError::Auth(
            "Not a participant in this consultation".to_string(),
        ));
    }

    Ok(Json(json!(consultation)))
}

#[axum::debug_handler]
pub async fn accept_consultation(
    State(state): State<Arc<AppConfig>>,
    Path(consultation_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can accept consultations".to_string(),
        ));
    }

    let id = parse_id(&consultation_id)?;
    let service = ConsultationService::new(&state);

    let consultation = service
        .accept_consultation(id, &user, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(consultation)))
}

#[axum::debug_handler]
pub async fn decline_consultation(
    State(state): State<Arc<AppConfig>>,
    Path(consultation_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can decline consultations".to_string(),
        ));
    }

    let id = parse_id(&consultation_id)?;
    let service = ConsultationService::new(&state);

    let consultation = service
        .decline_consultation(id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(consultation)))
}

#[axum::debug_handler]
pub async fn cancel_consultation(
    State(state): State<Arc<AppConfig>>,
    Path(consultation_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelConsultationRequest>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&consultation_id)?;
    let service = ConsultationService::new(&state);

    let consultation = service
        .get_consultation(id, auth.token())
        .await
        .map_err(map_error)?;

    if participant_role(&consultation, &user).is_none() && !user.is_admin() {
        return Err(AppError::Auth(
            "Not a participant in this consultation".to_string(),
        ));
    }

    let consultation = service
        .cancel_consultation(id, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(consultation)))
}

#[axum::debug_handler]
pub async fn complete_consultation(
    State(state): State<Arc<AppConfig>>,
    Path(consultation_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&consultation_id)?;
    let service = ConsultationService::new(&state);

    let consultation = service
        .get_consultation(id, auth.token())
        .await
        .map_err(map_error)?;

    if participant_role(&consultation, &user).is_none() {
        return Err(AppError::Auth(
            "Not a participant in this consultation".to_string(),
        ));
    }

    let consultation = service
        .complete_consultation(id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(consultation)))
}

#[axum::debug_handler]
pub async fn append_message(
    State(state): State<Arc<AppConfig>>,
    Path(consultation_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AppendMessageRequest>,
) -> Result<Json<Value>, AppError> {
    if request.content.trim().is_empty() {
        return Err(AppError::BadRequest("Message content is required".to_string()));
    }

    let id = parse_id(&consultation_id)?;
    let service = ConsultationService::new(&state);

    let consultation = service
        .append_message(id, &user, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(consultation)))
}

#[axum::debug_handler]
pub async fn get_room(
    State(state): State<Arc<AppConfig>>,
    Path(consultation_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&consultation_id)?;
    let service = ConsultationService::new(&state);

    let room = service
        .get_room(id, &user, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(room)))
}

#[axum::debug_handler]
pub async fn list_pending(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can view the pending queue".to_string(),
        ));
    }

    let doctor_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid user id".to_string()))?;

    let service = ConsultationService::new(&state);

    let consultations = service
        .list_pending_for_doctor(doctor_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "consultations": consultations,
        "total": consultations.len()
    })))
}

#[axum::debug_handler]
pub async fn list_mine(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid user id".to_string()))?;

    let service = ConsultationService::new(&state);

    let consultations = service
        .list_for_patient(patient_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "consultations": consultations,
        "total": consultations.len()
    })))
}
