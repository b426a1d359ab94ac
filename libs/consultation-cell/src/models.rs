use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use triage_cell::models::TriageAssessment;

// ==============================================================================
// CORE CONSULTATION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub patient_info: PatientInfo,
    pub patient_contact: Option<PatientContact>,
    pub assessment: Option<TriageAssessment>,
    pub status: ConsultationStatus,
    pub room_id: Option<String>,
    pub estimated_wait: Option<String>,
    #[serde(default)]
    pub messages: Vec<ConsultationMessage>,
    pub prescription_id: Option<Uuid>,
    /// Gateway checkout id, written by the payment callback once the
    /// consultation fee clears.
    pub payment_id: Option<String>,
    pub cancelled_by: Option<CancelledBy>,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Canonical status vocabulary. The document store holds the snake_case
/// strings; every call site goes through this enum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl ConsultationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConsultationStatus::Completed | ConsultationStatus::Cancelled)
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationStatus::Pending => write!(f, "pending"),
            ConsultationStatus::Active => write!(f, "active"),
            ConsultationStatus::Completed => write!(f, "completed"),
            ConsultationStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientInfo {
    pub patient_type: PatientType,
    pub age: Option<i32>,
    pub specialty: String,
    pub primary_symptom: String,
    #[serde(default)]
    pub additional_symptoms: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatientType {
    #[serde(rename = "self")]
    Myself,
    Child,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientContact {
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationMessage {
    pub sender: ParticipantRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Patient,
    Doctor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CancelledBy {
    Patient,
    Doctor,
    System,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConsultationRequest {
    /// Preselected doctor from the matcher, if the patient picked one.
    pub doctor_id: Option<Uuid>,
    pub patient_info: PatientInfo,
    pub assessment: Option<TriageAssessment>,
    pub estimated_wait: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelConsultationRequest {
    pub reason: Option<String>,
    pub cancelled_by: CancelledBy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendMessageRequest {
    pub content: String,
}

/// Opaque handle both parties pass to the video SDK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub consultation_id: Uuid,
    pub room_id: String,
    pub participant_role: ParticipantRole,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConsultationError {
    #[error("Consultation not found")]
    NotFound,

    #[error("Consultation has already been accepted by another doctor")]
    AlreadyTaken,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: ConsultationStatus,
        to: ConsultationStatus,
    },

    #[error("Consultation room is not open")]
    RoomNotOpen,

    #[error("Not a participant in this consultation")]
    NotParticipant,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
