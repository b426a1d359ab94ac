use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn consultation_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_consultation))
        .route("/pending", get(handlers::list_pending))
        .route("/mine", get(handlers::list_mine))
        .route("/{consultation_id}", get(handlers::get_consultation))
        .route("/{consultation_id}/accept", post(handlers::accept_consultation))
        .route("/{consultation_id}/decline", post(handlers::decline_consultation))
        .route("/{consultation_id}/cancel", post(handlers::cancel_consultation))
        .route("/{consultation_id}/complete", post(handlers::complete_consultation))
        .route("/{consultation_id}/messages", post(handlers::append_message))
        .route("/{consultation_id}/room", get(handlers::get_room))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
