use std::collections::HashMap;

use chrono::Utc;
use regex::Regex;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AvailabilityInfo, Doctor, DoctorError, MatchDoctorRequest, MatchDoctorResponse, MatchTier,
};

const SPECIALTY_LIMIT: usize = 5;
const GENERAL_PRACTICE_LIMIT: usize = 3;
const ANY_AVAILABLE_LIMIT: usize = 5;

pub struct MatchingService {
    supabase: SupabaseClient,
}

impl MatchingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Match available doctors against a requested specialty.
    ///
    /// Three query tiers: exact specialty, then doctors flagged as able to
    /// cover general practice, then anyone available at all. An exhausted
    /// third tier returns an empty list with a fixed message rather than
    /// queueing the request.
    pub async fn match_doctors(
        &self,
        request: MatchDoctorRequest,
    ) -> Result<MatchDoctorResponse, DoctorError> {
        let specialty = sanitize_input(&request.specialty);
        if specialty.is_empty() {
            return Err(DoctorError::MissingSpecialty);
        }

        debug!(
            "Processing match request: specialty={}, symptoms={}",
            specialty,
            request.symptoms.len()
        );

        let primary = self
            .query_doctors(
                &format!(
                    "/rest/v1/doctors?specialty=eq.{}&is_available=eq.true&is_active=eq.true&order=rating.desc&limit={}",
                    specialty, SPECIALTY_LIMIT
                ),
            )
            .await?;

        if !primary.is_empty() {
            let availability_info = self.calculate_availability(&primary).await;
            info!(
                "Matched {} {} specialists, estimated wait {}",
                primary.len(),
                specialty,
                availability_info.estimated_wait_time
            );
            return Ok(MatchDoctorResponse {
                matched_doctors: primary,
                availability_info,
                message: MatchTier::Specialty.message().to_string(),
            });
        }

        debug!("No exact specialty match, trying general practice fallback");

        let general = self
            .query_doctors(
                &format!(
                    "/rest/v1/doctors?can_handle_general=eq.true&is_available=eq.true&is_active=eq.true&order=rating.desc&limit={}",
                    GENERAL_PRACTICE_LIMIT
                ),
            )
            .await?;

        if !general.is_empty() {
            return Ok(MatchDoctorResponse {
                matched_doctors: general,
                availability_info: AvailabilityInfo::with_fixed_wait("5-10 minutes", Utc::now()),
                message: MatchTier::GeneralPractice.message().to_string(),
            });
        }

        debug!("General practice fallback empty, trying any available doctor");

        let any_available = self
            .query_doctors(
                &format!(
                    "/rest/v1/doctors?is_available=eq.true&is_active=eq.true&order=rating.desc&limit={}",
                    ANY_AVAILABLE_LIMIT
                ),
            )
            .await?;

        if !any_available.is_empty() {
            return Ok(MatchDoctorResponse {
                matched_doctors: any_available,
                availability_info: AvailabilityInfo::with_fixed_wait("10-15 minutes", Utc::now()),
                message: MatchTier::AnyAvailable.message().to_string(),
            });
        }

        warn!("No available doctors found for specialty {}", specialty);

        Ok(MatchDoctorResponse {
            matched_doctors: vec![],
            availability_info: AvailabilityInfo::with_fixed_wait("15-20 minutes", Utc::now()),
            message: MatchTier::NoneAvailable.message().to_string(),
        })
    }

    async fn query_doctors(&self, path: &str) -> Result<Vec<Doctor>, DoctorError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let doctors = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Doctor>, _>>()
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(doctors.into_iter().map(Doctor::sanitized).collect())
    }

    /// Count pending/active consultations per matched doctor and bucket the
    /// average into a wait-time label. A failed load query degrades to the
    /// middle bucket instead of failing the whole match.
    async fn calculate_availability(&self, doctors: &[Doctor]) -> AvailabilityInfo {
        if doctors.is_empty() {
            return AvailabilityInfo::with_fixed_wait("1-5 minutes", Utc::now());
        }

        let ids = doctors
            .iter()
            .map(|d| d.id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let path = format!(
            "/rest/v1/consultations?doctor_id=in.({})&status=in.(pending,active)&select=doctor_id",
            ids
        );

        let rows: Vec<Value> = match self.supabase.request(Method::GET, &path, None, None).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Error calculating availability: {}", e);
                return AvailabilityInfo::with_fixed_wait("5-10 minutes", Utc::now());
            }
        };

        let mut doctor_loads: HashMap<Uuid, i64> =
            doctors.iter().map(|d| (d.id, 0)).collect();

        for row in rows {
            if let Some(doctor_id) = row["doctor_id"]
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
            {
                if let Some(load) = doctor_loads.get_mut(&doctor_id) {
                    *load += 1;
                }
            }
        }

        let estimated_wait_time = wait_time_bucket(average_load(&doctor_loads)).to_string();

        AvailabilityInfo {
            doctor_loads,
            estimated_wait_time,
            timestamp: Utc::now(),
        }
    }
}

pub fn average_load(doctor_loads: &HashMap<Uuid, i64>) -> f64 {
    if doctor_loads.is_empty() {
        return 0.0;
    }
    doctor_loads.values().sum::<i64>() as f64 / doctor_loads.len() as f64
}

/// Coarse heuristic label, not a queueing estimate.
pub fn wait_time_bucket(average_load: f64) -> &'static str {
    if average_load == 0.0 {
        "1-5 minutes"
    } else if average_load <= 2.0 {
        "5-10 minutes"
    } else if average_load <= 4.0 {
        "10-15 minutes"
    } else {
        "15+ minutes"
    }
}

/// Strip anything outside word characters, whitespace and dashes before the
/// specialty reaches a query string.
pub fn sanitize_input(input: &str) -> String {
    let re = Regex::new(r"[^\w\s-]").expect("static pattern");
    re.replace_all(input.trim(), "").to_string()
}
