use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn payment_routes(state: Arc<AppConfig>) -> Router {
    // The gateway posts results without credentials, so the callback
    // cannot sit behind the auth middleware.
    let public_routes = Router::new().route("/callback", post(handlers::payment_callback));

    let protected_routes = Router::new()
        .route("/initiate", post(handlers::initiate_payment))
        .route("/mock", post(handlers::mock_payment))
        .route("/{payment_id}", get(handlers::get_payment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
