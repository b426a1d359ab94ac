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
    CreateConsultationNoteRequest, CreatePrescriptionRequest, HealthRecordError,
    HistoryEntryRequest, UpdatePrescriptionRequest,
};
use crate::services::{MedicalHistoryService, PrescriptionService};

fn map_error(e: HealthRecordError) -> AppError {
    match e {
        HealthRecordError::NotFound => AppError::NotFound("Record not found".to_string()),
        HealthRecordError::ValidationError(msg) => AppError::BadRequest(msg),
        HealthRecordError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value).map_err(|_| AppError::BadRequest(format!("Invalid {}", what)))
}

// ==============================================================================
// PRESCRIPTION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_prescription(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can issue prescriptions".to_string(),
        ));
    }

    let doctor_id = parse_uuid(&user.id, "user id")?;
    let service = PrescriptionService::new(&state);

    let prescription = service
        .create_prescription(doctor_id, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "prescription": prescription,
        "message": "Prescription created successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_prescription(
    State(state): State<Arc<AppConfig>>,
    Path(prescription_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let id = parse_uuid(&prescription_id, "prescription id")?;
    let service = PrescriptionService::new(&state);

    let prescription = service
        .get_prescription(id, auth.token())
        .await
        .map_err(map_error)?;

    let is_party = prescription.patient_id.to_string() == user.id
        || prescription.doctor_id.to_string() == user.id;
    if !is_party && !user.is_admin() {
        return Err(AppError::Auth(
            "Not authorized to view this prescription".to_string(),
        ));
    }

    Ok(Json(json!(prescription)))
}

#[axum::debug_handler]
pub async fn update_prescription(
    State(state): State<Arc<AppConfig>>,
    Path(prescription_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can update prescriptions".to_string(),
        ));
    }

    let id = parse_uuid(&prescription_id, "prescription id")?;
    let service = PrescriptionService::new(&state);

    let existing = service
        .get_prescription(id, auth.token())
        .await
        .map_err(map_error)?;

    if existing.doctor_id.to_string() != user.id {
        return Err(AppError::Auth(
            "Only the issuing doctor can update a prescription".to_string(),
        ));
    }

    let prescription = service
        .update_prescription(id, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(prescription)))
}

#[axum::debug_handler]
pub async fn list_my_prescriptions(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = parse_uuid(&user.id, "user id")?;
    let service = PrescriptionService::new(&state);

    let prescriptions = service
        .list_for_patient(patient_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "prescriptions": prescriptions,
        "total": prescriptions.len()
    })))
}

// ==============================================================================
// MEDICAL HISTORY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_medical_history(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let id = parse_uuid(&patient_id, "patient id")?;

    // Patients read their own record; the doctor-facing UI reads anyone's.
    if user.id != patient_id && !user.is_doctor() && !user.is_admin() {
        return Err(AppError::Auth(
            "Not authorized to view this medical history".to_string(),
        ));
    }

    let service = MedicalHistoryService::new(&state);

    let history = service
        .get_or_create(id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(history)))
}

#[axum::debug_handler]
pub async fn apply_history_entry(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<HistoryEntryRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can edit medical histories".to_string(),
        ));
    }

    let id = parse_uuid(&patient_id, "patient id")?;
    let service = MedicalHistoryService::new(&state);

    let history = service
        .apply_entry(id, &user.id, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(history)))
}

// ==============================================================================
// CONSULTATION NOTE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_consultation_note(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateConsultationNoteRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can record consultation notes".to_string(),
        ));
    }

    let doctor_id = parse_uuid(&user.id, "user id")?;
    let service = MedicalHistoryService::new(&state);

    let note = service
        .create_note(doctor_id, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(note)))
}

#[axum::debug_handler]
pub async fn list_consultation_notes(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let id = parse_uuid(&patient_id, "patient id")?;

    if user.id != patient_id && !user.is_doctor() && !user.is_admin() {
        return Err(AppError::Auth(
            "Not authorized to view these notes".to_string(),
        ));
    }

    let service = MedicalHistoryService::new(&state);

    let notes = service
        .list_notes_for_patient(id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "notes": notes,
        "total": notes.len()
    })))
}
