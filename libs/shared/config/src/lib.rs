use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub mpesa_consumer_key: String,
    pub mpesa_consumer_secret: String,
    pub mpesa_passkey: String,
    pub mpesa_shortcode: String,
    pub mpesa_base_url: String,
    pub mpesa_callback_url: String,
    pub sms_api_key: String,
    pub sms_username: String,
    pub sms_sender_id: Option<String>,
    pub sms_base_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub redis_url: Option<String>,
}

fn env_or_empty(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env_or_empty("SUPABASE_URL"),
            supabase_anon_key: env_or_empty("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_jwt_secret: env_or_empty("SUPABASE_JWT_SECRET"),
            mpesa_consumer_key: env_or_empty("MPESA_CONSUMER_KEY"),
            mpesa_consumer_secret: env_or_empty("MPESA_CONSUMER_SECRET"),
            mpesa_passkey: env_or_empty("MPESA_PASSKEY"),
            mpesa_shortcode: env_or_empty("MPESA_SHORTCODE"),
            mpesa_base_url: env::var("MPESA_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox.safaricom.co.ke".to_string()),
            mpesa_callback_url: env_or_empty("MPESA_CALLBACK_URL"),
            sms_api_key: env_or_empty("SMS_API_KEY"),
            sms_username: env_or_empty("SMS_USERNAME"),
            sms_sender_id: env::var("SMS_SENDER_ID").ok(),
            sms_base_url: env::var("SMS_BASE_URL")
                .unwrap_or_else(|_| "https://api.africastalking.com".to_string()),
            openai_api_key: env_or_empty("OPENAI_API_KEY"),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            redis_url: env::var("REDIS_URL").ok(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_payment_configured(&self) -> bool {
        !self.mpesa_consumer_key.is_empty()
            && !self.mpesa_consumer_secret.is_empty()
            && !self.mpesa_passkey.is_empty()
            && !self.mpesa_shortcode.is_empty()
    }

    pub fn is_sms_configured(&self) -> bool {
        !self.sms_api_key.is_empty() && !self.sms_username.is_empty()
    }

    pub fn is_triage_configured(&self) -> bool {
        !self.openai_api_key.is_empty()
    }
}
