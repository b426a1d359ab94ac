use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn triage_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::triage_health));

    let protected_routes = Router::new()
        .route("/message", post(handlers::chat_message))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
