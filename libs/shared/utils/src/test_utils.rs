use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            mpesa_consumer_key: "test-consumer-key".to_string(),
            mpesa_consumer_secret: "test-consumer-secret".to_string(),
            mpesa_passkey: "test-passkey".to_string(),
            mpesa_shortcode: "174379".to_string(),
            mpesa_base_url: "http://localhost:54322".to_string(),
            mpesa_callback_url: "http://localhost:3000/payments/callback".to_string(),
            sms_api_key: "test-sms-key".to_string(),
            sms_username: "sandbox".to_string(),
            sms_sender_id: None,
            sms_base_url: "http://localhost:54323".to_string(),
            openai_api_key: "test-openai-key".to_string(),
            openai_base_url: "http://localhost:54324/v1".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            redis_url: None,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub phone: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            phone: "254700000000".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            phone: "254700000000".to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            phone: Some(self.phone.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "phone": user.phone,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_response(id: &str, name: &str, specialty: &str, rating: f32) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "specialty": specialty,
            "phone": "254711000000",
            "is_available": true,
            "is_active": true,
            "can_handle_general": specialty == "General Practice",
            "rating": rating,
            "experience": 8,
            "consultation_fee": 1000.0,
            "bio": "Experienced practitioner",
            "image_url": null,
            "languages": ["English", "Swahili"],
            "working_hours": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn consultation_response(
        id: &str,
        patient_id: &str,
        doctor_id: Option<&str>,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "patient_info": {
                "patient_type": "self",
                "age": 30,
                "specialty": "General Practice",
                "primary_symptom": "headache",
                "additional_symptoms": []
            },
            "patient_contact": {
                "phone": "254700000000",
                "email": "test@example.com"
            },
            "assessment": null,
            "status": status,
            "room_id": null,
            "estimated_wait": "1-5 minutes",
            "messages": [],
            "prescription_id": null,
            "payment_id": null,
            "cancelled_by": null,
            "created_at": "2024-01-01T00:00:00Z",
            "start_time": null,
            "end_time": null
        })
    }

    pub fn payment_response(checkout_request_id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": checkout_request_id,
            "consultation_id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "amount": 1000.0,
            "phone_number": "254700000000",
            "status": status,
            "transaction_id": null,
            "result_description": null,
            "merchant_request_id": "mr-001",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
        assert!(app_config.is_payment_configured());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, "doctor");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert_eq!(user_model.id, user.id);
        assert!(user_model.is_doctor());
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }
}
