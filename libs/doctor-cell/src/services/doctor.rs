use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Doctor, DoctorSearchFilters, RegisterDoctorRequest, SetAvailabilityRequest,
    UpdateDoctorRequest,
};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Register a new doctor profile. Profiles start inactive and only show
    /// up in searches once an admin approves them.
    pub async fn register_doctor(
        &self,
        user_id: &str,
        request: RegisterDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor> {
        debug!("Registering doctor profile for user: {}", user_id);

        let existing_check_path = format!("/rest/v1/doctors?id=eq.{}", user_id);
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_check_path, Some(auth_token), None)
            .await?;

        if !existing.is_empty() {
            return Err(anyhow!("Doctor profile already exists for this account"));
        }

        let doctor_data = json!({
            "id": user_id,
            "name": request.name,
            "specialty": request.specialty,
            "phone": request.phone,
            "is_available": false,
            "is_active": false,
            "can_handle_general": request.can_handle_general.unwrap_or(false),
            "rating": 0.0,
            "experience": request.experience.unwrap_or(0),
            "consultation_fee": request.consultation_fee,
            "bio": request.bio,
            "image_url": request.image_url,
            "languages": request.languages.unwrap_or_default(),
            "working_hours": request.working_hours,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result = self
            .supabase
            .insert_returning("/rest/v1/doctors", Some(auth_token), doctor_data)
            .await?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to create doctor profile"))?;

        let doctor: Doctor = serde_json::from_value(row)?;
        debug!("Doctor profile created, pending approval: {}", doctor.id);

        Ok(doctor)
    }

    pub async fn get_doctor(&self, doctor_id: &str, auth_token: Option<&str>) -> Result<Doctor> {
        debug!("Fetching doctor profile: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Doctor not found"))?;

        let doctor: Doctor = serde_json::from_value(row)?;
        Ok(doctor.sanitized())
    }

    pub async fn search_doctors(
        &self,
        filters: DoctorSearchFilters,
        auth_token: Option<&str>,
    ) -> Result<Vec<Doctor>> {
        debug!("Searching doctors with filters: {:?}", filters);

        let mut query_parts = vec!["is_active=eq.true".to_string()];

        if let Some(specialty) = filters.specialty {
            query_parts.push(format!("specialty=ilike.%{}%", specialty));
        }
        if filters.available_only.unwrap_or(false) {
            query_parts.push("is_available=eq.true".to_string());
        }
        if let Some(min_rating) = filters.min_rating {
            query_parts.push(format!("rating=gte.{}", min_rating));
        }

        let mut path = format!("/rest/v1/doctors?{}", query_parts.join("&"));
        path.push_str("&order=rating.desc");

        if let Some(limit) = filters.limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = filters.offset {
            path.push_str(&format!("&offset={}", offset));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await?;

        let doctors = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Doctor>, _>>()?;

        Ok(doctors.into_iter().map(Doctor::sanitized).collect())
    }

    pub async fn update_doctor(
        &self,
        doctor_id: &str,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor> {
        debug!("Updating doctor profile: {}", doctor_id);

        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(specialty) = request.specialty {
            update_data.insert("specialty".to_string(), json!(specialty));
        }
        if let Some(bio) = request.bio {
            update_data.insert("bio".to_string(), json!(bio));
        }
        if let Some(experience) = request.experience {
            update_data.insert("experience".to_string(), json!(experience));
        }
        if let Some(fee) = request.consultation_fee {
            update_data.insert("consultation_fee".to_string(), json!(fee));
        }
        if let Some(image_url) = request.image_url {
            update_data.insert("image_url".to_string(), json!(image_url));
        }
        if let Some(languages) = request.languages {
            update_data.insert("languages".to_string(), json!(languages));
        }
        if let Some(gp) = request.can_handle_general {
            update_data.insert("can_handle_general".to_string(), json!(gp));
        }
        if let Some(hours) = request.working_hours {
            update_data.insert("working_hours".to_string(), json!(hours));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result = self
            .supabase
            .conditional_update(&path, Some(auth_token), Value::Object(update_data))
            .await?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to update doctor profile"))?;

        let doctor: Doctor = serde_json::from_value(row)?;
        Ok(doctor)
    }

    /// Doctor-side availability toggle.
    pub async fn set_availability(
        &self,
        doctor_id: &str,
        request: SetAvailabilityRequest,
        auth_token: &str,
    ) -> Result<Doctor> {
        debug!(
            "Setting availability for doctor {}: {}",
            doctor_id, request.is_available
        );

        let update_data = json!({
            "is_available": request.is_available,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result = self
            .supabase
            .conditional_update(&path, Some(auth_token), update_data)
            .await?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Doctor not found"))?;

        let doctor: Doctor = serde_json::from_value(row)?;
        Ok(doctor)
    }

    /// Admin approval flips the profile active. Registration never
    /// hard-deletes, so rejection is just leaving the profile inactive.
    pub async fn approve_doctor(
        &self,
        doctor_id: &str,
        approved: bool,
        auth_token: &str,
    ) -> Result<Doctor> {
        debug!("Setting approval for doctor {}: {}", doctor_id, approved);

        let update_data = json!({
            "is_active": approved,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result = self
            .supabase
            .conditional_update(&path, Some(auth_token), update_data)
            .await?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Doctor not found"))?;

        let doctor: Doctor = serde_json::from_value(row)?;
        Ok(doctor)
    }
}
