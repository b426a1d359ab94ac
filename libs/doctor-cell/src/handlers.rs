use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::HeaderMap,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::client_ip;

use crate::models::{
    DoctorError, DoctorSearchFilters, MatchDoctorRequest, RegisterDoctorRequest,
    SetAvailabilityRequest, UpdateDoctorRequest,
};
use crate::services::{DoctorService, MatchingService, RateLimitService, SeedService};

#[derive(Debug, Deserialize)]
pub struct DoctorSearchQuery {
    pub specialty: Option<String>,
    pub available_only: Option<bool>,
    pub min_rating: Option<f32>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn search_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let filters = DoctorSearchFilters {
        specialty: query.specialty,
        available_only: query.available_only,
        min_rating: query.min_rating,
        limit: query.limit,
        offset: query.offset,
    };

    let doctors = doctor_service
        .search_doctors(filters, None)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .get_doctor(&doctor_id, None)
        .await
        .map_err(|_| AppError::NotFound("Doctor not found".to_string()))?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn match_doctors(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    Json(request): Json<MatchDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let limiter = RateLimitService::new(&state);
    let client_key = client_ip(&headers).unwrap_or_else(|| "unknown".to_string());

    if !limiter.check(&client_key).await {
        return Err(AppError::RateLimited("Please try again later".to_string()));
    }

    let matching_service = MatchingService::new(&state);

    let response = matching_service
        .match_doctors(request)
        .await
        .map_err(|e| match e {
            DoctorError::MissingSpecialty => {
                AppError::BadRequest("Specialty is required".to_string())
            }
            DoctorError::ValidationError(msg) => AppError::BadRequest(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!(response)))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn register_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RegisterDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .register_doctor(&user.id, request, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "doctor": doctor,
        "message": "Registration received, pending approval"
    })))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_admin() && user.id != doctor_id {
        return Err(AppError::Auth(
            "Not authorized to update this doctor profile".to_string(),
        ));
    }

    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .update_doctor(&doctor_id, request, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn set_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if user.id != doctor_id {
        return Err(AppError::Auth(
            "Not authorized to change availability for this doctor".to_string(),
        ));
    }

    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .set_availability(&doctor_id, request, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn approve_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_admin() {
        return Err(AppError::Auth(
            "Only administrators can approve doctors".to_string(),
        ));
    }

    let approved = payload["approved"]
        .as_bool()
        .ok_or_else(|| AppError::BadRequest("approved field is required".to_string()))?;

    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .approve_doctor(&doctor_id, approved, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn seed_doctors(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_admin() {
        return Err(AppError::Auth(
            "Only administrators can seed sample data".to_string(),
        ));
    }

    let seed_service = SeedService::new(&state);

    let count = seed_service
        .seed_doctors(token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "message": "Doctors seeded successfully",
        "count": count
    })))
}
