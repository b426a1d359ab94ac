use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub phone: Option<String>,
    pub is_available: bool,
    pub is_active: bool,
    pub can_handle_general: bool,
    pub rating: f32,
    pub experience: i32,
    pub consultation_fee: f64,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    pub working_hours: Option<WorkingHours>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    /// Clamp fields that arrive from the document store unchecked.
    pub fn sanitized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            self.name = "Unknown Doctor".to_string();
        }
        self.specialty = self.specialty.trim().to_string();
        if self.specialty.is_empty() {
            self.specialty = "General Practice".to_string();
        }
        self.rating = self.rating.clamp(0.0, 5.0);
        self.experience = self.experience.max(0);
        self
    }

    /// A doctor only takes new consultations while approved and toggled on.
    pub fn accepts_patients(&self) -> bool {
        self.is_active && self.is_available
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDoctorRequest {
    pub name: String,
    pub specialty: String,
    pub phone: Option<String>,
    pub experience: Option<i32>,
    pub consultation_fee: f64,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub languages: Option<Vec<String>>,
    pub can_handle_general: Option<bool>,
    pub working_hours: Option<WorkingHours>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub bio: Option<String>,
    pub experience: Option<i32>,
    pub consultation_fee: Option<f64>,
    pub image_url: Option<String>,
    pub languages: Option<Vec<String>>,
    pub can_handle_general: Option<bool>,
    pub working_hours: Option<WorkingHours>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAvailabilityRequest {
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSearchFilters {
    pub specialty: Option<String>,
    pub available_only: Option<bool>,
    pub min_rating: Option<f32>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// MATCHING MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDoctorRequest {
    pub specialty: String,
    /// Carried for the triage record only; not used to rank doctors.
    #[serde(default)]
    pub symptoms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDoctorResponse {
    pub matched_doctors: Vec<Doctor>,
    pub availability_info: AvailabilityInfo,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityInfo {
    pub doctor_loads: HashMap<Uuid, i64>,
    pub estimated_wait_time: String,
    pub timestamp: DateTime<Utc>,
}

impl AvailabilityInfo {
    pub fn with_fixed_wait(wait: &str, now: DateTime<Utc>) -> Self {
        Self {
            doctor_loads: HashMap::new(),
            estimated_wait_time: wait.to_string(),
            timestamp: now,
        }
    }
}

/// Which query tier produced the match, reported back in the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Specialty,
    GeneralPractice,
    AnyAvailable,
    NoneAvailable,
}

impl MatchTier {
    pub fn message(&self) -> &'static str {
        match self {
            MatchTier::Specialty => "Successfully matched with specialists",
            MatchTier::GeneralPractice => "Matched with available general practitioners",
            MatchTier::AnyAvailable => "Matched with any available doctors",
            MatchTier::NoneAvailable => "No available doctors found at this time",
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Specialty is required")]
    MissingSpecialty,

    #[error("Too many requests")]
    RateLimited,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
