use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

/// Development utility that inserts a handful of sample doctors so the
/// matcher has something to chew on in a fresh environment.
pub struct SeedService {
    supabase: SupabaseClient,
}

impl SeedService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn seed_doctors(&self, auth_token: &str) -> Result<usize> {
        let samples = sample_doctors();
        let count = samples.len();

        for doctor in samples {
            self.supabase
                .insert_returning("/rest/v1/doctors", Some(auth_token), doctor)
                .await?;
        }

        info!("Seeded {} sample doctors", count);
        Ok(count)
    }
}

fn sample_doctors() -> Vec<serde_json::Value> {
    let now = Utc::now().to_rfc3339();

    vec![
        json!({
            "id": Uuid::new_v4(),
            "name": "Dr. Sarah Johnson",
            "specialty": "General Practice",
            "phone": "254711111111",
            "is_available": true,
            "is_active": true,
            "can_handle_general": true,
            "rating": 4.8,
            "experience": 12,
            "consultation_fee": 1000.0,
            "bio": "General practitioner with a focus on family medicine",
            "languages": ["English", "Swahili"],
            "created_at": now,
            "updated_at": now
        }),
        json!({
            "id": Uuid::new_v4(),
            "name": "Dr. Michael Chen",
            "specialty": "Pediatrics",
            "phone": "254722222222",
            "is_available": true,
            "is_active": true,
            "can_handle_general": false,
            "rating": 4.9,
            "experience": 9,
            "consultation_fee": 1500.0,
            "bio": "Pediatrician",
            "languages": ["English"],
            "created_at": now,
            "updated_at": now
        }),
        json!({
            "id": Uuid::new_v4(),
            "name": "Dr. Emily Williams",
            "specialty": "Dermatology",
            "phone": "254733333333",
            "is_available": true,
            "is_active": true,
            "can_handle_general": false,
            "rating": 4.7,
            "experience": 7,
            "consultation_fee": 1500.0,
            "bio": "Dermatologist",
            "languages": ["English", "Swahili"],
            "created_at": now,
            "updated_at": now
        }),
    ]
}
