use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;

use consultation_cell::router::consultation_routes;
use doctor_cell::router::doctor_routes;
use health_record_cell::router::health_record_routes;
use notification_cell::router::notification_routes;
use payment_cell::router::payment_routes;
use shared_config::AppConfig;
use triage_cell::router::triage_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let health_state = state.clone();

    Router::new()
        .route("/", get(|| async { "Afya Care API is running!" }))
        .route(
            "/health",
            get(move || {
                let config = health_state.clone();
                async move {
                    Json(json!({
                        "status": "ok",
                        "database_configured": config.is_configured(),
                        "payment_configured": config.is_payment_configured(),
                        "sms_configured": config.is_sms_configured(),
                        "triage_configured": config.is_triage_configured(),
                    }))
                }
            }),
        )
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/consultations", consultation_routes(state.clone()))
        .nest("/payments", payment_routes(state.clone()))
        .nest("/triage", triage_routes(state.clone()))
        .nest("/notifications", notification_routes(state.clone()))
        .nest("/records", health_record_routes(state))
}
