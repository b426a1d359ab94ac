use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Matching stays public: patients hit it from the triage flow before
    // any session exists. It carries its own rate limiting instead.
    let public_routes = Router::new()
        .route("/search", get(handlers::search_doctors))
        .route("/match", post(handlers::match_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor));

    let protected_routes = Router::new()
        .route("/", post(handlers::register_doctor))
        .route("/{doctor_id}", patch(handlers::update_doctor))
        .route("/{doctor_id}/availability", patch(handlers::set_availability))
        .route("/{doctor_id}/approve", patch(handlers::approve_doctor))
        .route("/seed", post(handlers::seed_doctors))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
