use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use health_record_cell::router::health_record_routes;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestContext {
    app: Router,
    jwt_secret: String,
}

fn create_test_context(mock_server: &MockServer) -> TestContext {
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();
    config.sms_base_url = mock_server.uri();

    TestContext {
        app: health_record_routes(Arc::new(config)),
        jwt_secret: test_config.jwt_secret,
    }
}

fn prescription_row(
    id: &str,
    consultation_id: &str,
    patient_id: &str,
    doctor_id: &str,
) -> serde_json::Value {
    json!({
        "id": id,
        "consultation_id": consultation_id,
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "medications": [
            { "name": "Amoxicillin", "dosage": "500mg", "frequency": "3x daily", "duration": "7 days", "notes": null }
        ],
        "instructions": "Take with food",
        "follow_up": { "recommended": true, "date": "2024-02-01", "notes": null },
        "status": "active",
        "created_at": "2024-01-01T00:00:00Z"
    })
}

fn history_row(patient_id: &str, allergies: serde_json::Value) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "patient_id": patient_id,
        "blood_group": null,
        "allergies": allergies,
        "chronic_conditions": [],
        "family_history": [],
        "current_medications": [],
        "surgical_history": [],
        "vaccinations": [],
        "notes": null,
        "last_updated": "2024-01-01T00:00:00Z",
        "updated_by": null
    })
}

async fn send(
    app: Router,
    method_str: &str,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder()
        .method(method_str)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token));

    let request = match body {
        Some(json_body) => builder.body(Body::from(json_body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn doctor_issues_prescription_and_patient_is_notified() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server);

    let doctor = TestUser::doctor("doctor@example.com");
    let consultation_id = Uuid::new_v4().to_string();
    let patient_id = Uuid::new_v4().to_string();
    let prescription_id = Uuid::new_v4().to_string();

    Mock::given(method("POST"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            prescription_row(&prescription_id, &consultation_id, &patient_id, &doctor.id)
        ])))
        .mount(&mock_server)
        .await;

    // Consultation gets back-linked to the prescription.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/consultations"))
        .and(body_partial_json(json!({ "prescription_id": prescription_id })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "patient_contact": { "phone": "254700000000", "email": null } }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/version1/messaging"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "SMSMessageData": { "Recipients": [{ "status": "Success", "messageId": "ATXid_2" }] }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&doctor, &ctx.jwt_secret, Some(1));
    let (status, body) = send(
        ctx.app,
        "POST",
        "/prescriptions",
        &token,
        Some(json!({
            "consultation_id": consultation_id,
            "patient_id": patient_id,
            "medications": [
                { "name": "Amoxicillin", "dosage": "500mg", "frequency": "3x daily", "duration": "7 days", "notes": null }
            ],
            "instructions": "Take with food",
            "follow_up": { "recommended": true, "date": "2024-02-01", "notes": null }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prescription"]["status"], "active");
    assert_eq!(body["message"], "Prescription created successfully");
}

#[tokio::test]
async fn patient_cannot_issue_prescriptions() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server);

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &ctx.jwt_secret, Some(1));

    let (status, _) = send(
        ctx.app,
        "POST",
        "/prescriptions",
        &token,
        Some(json!({
            "consultation_id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "medications": [],
            "instructions": "",
            "follow_up": null
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn prescription_requires_medications() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server);

    let doctor = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &ctx.jwt_secret, Some(1));

    let (status, body) = send(
        ctx.app,
        "POST",
        "/prescriptions",
        &token,
        Some(json!({
            "consultation_id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "medications": [],
            "instructions": "none",
            "follow_up": null
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("medication"));
}

#[tokio::test]
async fn medical_history_is_created_on_first_access() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server);

    let patient = TestUser::patient("patient@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_histories"))
        .and(query_param("patient_id", format!("eq.{}", patient.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/medical_histories"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([history_row(&patient.id, json!([]))])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&patient, &ctx.jwt_secret, Some(1));
    let (status, body) = send(
        ctx.app,
        "GET",
        &format!("/history/{}", patient.id),
        &token,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient_id"], patient.id.as_str());
    assert!(body["allergies"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn doctor_appends_history_entry() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server);

    let doctor = TestUser::doctor("doctor@example.com");
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_histories"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([history_row(&patient_id, json!([]))])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medical_histories"))
        .and(body_partial_json(json!({ "allergies": ["penicillin"] })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([history_row(&patient_id, json!(["penicillin"]))])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&doctor, &ctx.jwt_secret, Some(1));
    let (status, body) = send(
        ctx.app,
        "POST",
        &format!("/history/{}/entries", patient_id),
        &token,
        Some(json!({
            "section": "allergies",
            "action": "add",
            "entry": "penicillin"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allergies"][0], "penicillin");
}

#[tokio::test]
async fn patient_cannot_read_another_patients_history() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server);

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &ctx.jwt_secret, Some(1));

    let (status, _) = send(
        ctx.app,
        "GET",
        &format!("/history/{}", Uuid::new_v4()),
        &token,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
