use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::router::doctor_routes;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn create_test_app(mock_server: &MockServer) -> Router {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    doctor_routes(Arc::new(config))
}

async fn post_match(app: Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/match")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn match_returns_specialists_sorted_by_rating() {
    let mock_server = MockServer::start().await;

    let high = Uuid::new_v4().to_string();
    let low = Uuid::new_v4().to_string();

    // Supabase applies the order=rating.desc clause, so the mock returns
    // rows already sorted the way the database would.
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialty", "eq.Dermatology"))
        .and(query_param("is_available", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&high, "Dr. A", "Dermatology", 4.9),
            MockSupabaseResponses::doctor_response(&low, "Dr. B", "Dermatology", 4.2),
        ])))
        .mount(&mock_server)
        .await;

    // Zero active consultations for either doctor.
    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let (status, body) = post_match(
        create_test_app(&mock_server),
        json!({ "specialty": "Dermatology", "symptoms": ["rash"] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched_doctors"].as_array().unwrap().len(), 2);
    assert_eq!(body["matched_doctors"][0]["id"], high.as_str());
    assert_eq!(body["matched_doctors"][1]["id"], low.as_str());
    assert_eq!(body["availability_info"]["estimated_wait_time"], "1-5 minutes");
    assert_eq!(body["message"], "Successfully matched with specialists");
}

#[tokio::test]
async fn match_falls_back_to_general_practice() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialty", "eq.Neurology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let gp = Uuid::new_v4().to_string();
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("can_handle_general", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&gp, "Dr. GP", "General Practice", 4.5),
        ])))
        .mount(&mock_server)
        .await;

    let (status, body) = post_match(
        create_test_app(&mock_server),
        json!({ "specialty": "Neurology" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched_doctors"].as_array().unwrap().len(), 1);
    assert_eq!(body["matched_doctors"][0]["id"], gp.as_str());
    assert_eq!(body["availability_info"]["estimated_wait_time"], "5-10 minutes");
    assert_eq!(body["message"], "Matched with available general practitioners");
}

#[tokio::test]
async fn match_falls_back_to_any_available_doctor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialty", "eq.Neurology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("can_handle_general", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let any = Uuid::new_v4().to_string();
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("is_available", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&any, "Dr. Any", "Pediatrics", 4.1),
        ])))
        .mount(&mock_server)
        .await;

    let (status, body) = post_match(
        create_test_app(&mock_server),
        json!({ "specialty": "Neurology" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched_doctors"].as_array().unwrap().len(), 1);
    assert_eq!(body["availability_info"]["estimated_wait_time"], "10-15 minutes");
    assert_eq!(body["message"], "Matched with any available doctors");
}

#[tokio::test]
async fn match_reports_empty_when_nobody_is_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let (status, body) = post_match(
        create_test_app(&mock_server),
        json!({ "specialty": "Neurology" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["matched_doctors"].as_array().unwrap().is_empty());
    assert_eq!(body["availability_info"]["estimated_wait_time"], "15-20 minutes");
    assert_eq!(body["message"], "No available doctors found at this time");
}

#[tokio::test]
async fn match_rejects_missing_specialty() {
    let mock_server = MockServer::start().await;

    let (status, body) = post_match(
        create_test_app(&mock_server),
        json!({ "specialty": "   " }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Specialty is required");
}

#[tokio::test]
async fn match_estimates_wait_from_doctor_loads() {
    let mock_server = MockServer::start().await;

    let a = Uuid::new_v4().to_string();
    let b = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialty", "eq.Dermatology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&a, "Dr. A", "Dermatology", 4.9),
            MockSupabaseResponses::doctor_response(&b, "Dr. B", "Dermatology", 4.2),
        ])))
        .mount(&mock_server)
        .await;

    // Three open consultations against A, one against B: average 2.0.
    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "doctor_id": a },
            { "doctor_id": a },
            { "doctor_id": a },
            { "doctor_id": b },
        ])))
        .mount(&mock_server)
        .await;

    let (status, body) = post_match(
        create_test_app(&mock_server),
        json!({ "specialty": "Dermatology" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availability_info"]["estimated_wait_time"], "5-10 minutes");
    assert_eq!(body["availability_info"]["doctor_loads"][a.as_str()], 3);
    assert_eq!(body["availability_info"]["doctor_loads"][b.as_str()], 1);
}

#[tokio::test]
async fn register_doctor_requires_authentication() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(&mock_server);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "name": "Dr. New",
                        "specialty": "Dermatology",
                        "consultation_fee": 1200.0
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
