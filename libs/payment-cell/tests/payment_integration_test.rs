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

use payment_cell::router::payment_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct TestContext {
    app: Router,
    jwt_secret: String,
}

fn create_test_context(mock_server: &MockServer) -> TestContext {
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();
    config.mpesa_base_url = mock_server.uri();
    config.sms_base_url = mock_server.uri();

    TestContext {
        app: payment_routes(Arc::new(config)),
        jwt_secret: test_config.jwt_secret,
    }
}

async fn send(
    app: Router,
    method_str: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method(method_str)
        .uri(uri)
        .header("content-type", "application/json");

    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

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

fn success_callback(checkout_id: &str) -> serde_json::Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout_id,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        { "Name": "Amount", "Value": 1000.0 },
                        { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" },
                        { "Name": "PhoneNumber", "Value": 254700000000u64 }
                    ]
                }
            }
        }
    })
}

#[tokio::test]
async fn initiate_persists_pending_payment() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server);

    Mock::given(method("GET"))
        .and(path("/oauth/v1/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": "3599"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/mpesa/stkpush/v1/processrequest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": "ws_CO_191220191020363925",
            "ResponseCode": "0",
            "ResponseDescription": "Success. Request accepted for processing"
        })))
        .mount(&mock_server)
        .await;

    // The record written at initiation must be pending.
    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .and(body_partial_json(json!({ "status": "pending" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::payment_response("ws_CO_191220191020363925", "pending")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &ctx.jwt_secret, Some(1));

    let (status, body) = send(
        ctx.app,
        "POST",
        "/initiate",
        Some(&token),
        Some(json!({
            "phone_number": "0712345678",
            "amount": 1000.0,
            "consultation_id": Uuid::new_v4()
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["checkout_request_id"], "ws_CO_191220191020363925");
}

#[tokio::test]
async fn successful_callback_completes_payment_and_notifies() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server);

    let checkout_id = "ws_CO_success_001";

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .and(query_param("id", format!("eq.{}", checkout_id)))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::payment_response(checkout_id, "completed")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Exactly one SMS goes out for a first delivery.
    Mock::given(method("POST"))
        .and(path("/version1/messaging"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "SMSMessageData": {
                "Recipients": [{ "status": "Success", "messageId": "ATXid_1" }]
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let (status, body) = send(
        ctx.app,
        "POST",
        "/callback",
        None,
        Some(success_callback(checkout_id)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Callback processed");
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn duplicate_callback_is_acknowledged_without_side_effects() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server);

    let checkout_id = "ws_CO_dup_001";

    // Conditional update matches nothing: the record already left pending.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::payment_response(checkout_id, "completed")
        ])))
        .mount(&mock_server)
        .await;

    // No SMS on a duplicate.
    Mock::given(method("POST"))
        .and(path("/version1/messaging"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (status, body) = send(
        ctx.app,
        "POST",
        "/callback",
        None,
        Some(success_callback(checkout_id)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Callback already processed");
}

#[tokio::test]
async fn failed_callback_marks_payment_failed_without_sms() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server);

    let checkout_id = "ws_CO_fail_001";

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .and(body_partial_json(json!({ "status": "failed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::payment_response(checkout_id, "failed")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/version1/messaging"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (status, body) = send(
        ctx.app,
        "POST",
        "/callback",
        None,
        Some(json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-2",
                    "CheckoutRequestID": checkout_id,
                    "ResultCode": 1032,
                    "ResultDesc": "Request cancelled by user"
                }
            }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn callback_for_unknown_payment_is_not_found() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let (status, _) = send(
        ctx.app,
        "POST",
        "/callback",
        None,
        Some(success_callback("ws_CO_missing")),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn initiate_requires_authentication() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server);

    let (status, _) = send(
        ctx.app,
        "POST",
        "/initiate",
        None,
        Some(json!({
            "phone_number": "0712345678",
            "amount": 1000.0,
            "consultation_id": Uuid::new_v4()
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
