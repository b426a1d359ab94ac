use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// PRESCRIPTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub consultation_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub medications: Vec<Medication>,
    pub instructions: String,
    pub follow_up: Option<FollowUp>,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUp {
    pub recommended: bool,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Active,
    Completed,
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrescriptionStatus::Active => write!(f, "active"),
            PrescriptionStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub consultation_id: Uuid,
    pub patient_id: Uuid,
    pub medications: Vec<Medication>,
    pub instructions: String,
    pub follow_up: Option<FollowUp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePrescriptionRequest {
    pub status: Option<PrescriptionStatus>,
    pub follow_up: Option<FollowUp>,
}

// ==============================================================================
// MEDICAL HISTORY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub blood_group: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub chronic_conditions: Vec<String>,
    #[serde(default)]
    pub family_history: Vec<FamilyCondition>,
    #[serde(default)]
    pub current_medications: Vec<CurrentMedication>,
    #[serde(default)]
    pub surgical_history: Vec<SurgicalEntry>,
    #[serde(default)]
    pub vaccinations: Vec<Vaccination>,
    pub notes: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyCondition {
    pub condition: String,
    pub relationship: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurgicalEntry {
    pub procedure: String,
    pub date: NaiveDate,
    pub hospital: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vaccination {
    pub name: String,
    pub date: NaiveDate,
}

/// Append/remove operation against one list section of the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntryRequest {
    pub section: HistorySection,
    pub action: EntryAction,
    pub entry: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistorySection {
    Allergies,
    ChronicConditions,
    FamilyHistory,
    CurrentMedications,
    SurgicalHistory,
    Vaccinations,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryAction {
    Add,
    Remove,
}

// ==============================================================================
// CONSULTATION NOTE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationNote {
    pub id: Uuid,
    pub consultation_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub diagnosis: String,
    pub treatment: String,
    pub follow_up_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConsultationNoteRequest {
    pub consultation_id: Uuid,
    pub patient_id: Uuid,
    pub symptoms: Vec<String>,
    pub diagnosis: String,
    pub treatment: String,
    pub follow_up_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum HealthRecordError {
    #[error("Record not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
