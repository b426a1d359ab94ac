use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn health_record_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/prescriptions", post(handlers::create_prescription))
        .route("/prescriptions/mine", get(handlers::list_my_prescriptions))
        .route("/prescriptions/{prescription_id}", get(handlers::get_prescription))
        .route("/prescriptions/{prescription_id}", patch(handlers::update_prescription))
        .route("/history/{patient_id}", get(handlers::get_medical_history))
        .route("/history/{patient_id}/entries", post(handlers::apply_history_entry))
        .route("/notes", post(handlers::create_consultation_note))
        .route("/notes/{patient_id}", get(handlers::list_consultation_notes))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
