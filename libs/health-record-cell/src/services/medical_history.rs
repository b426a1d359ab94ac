use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    ConsultationNote, CreateConsultationNoteRequest, EntryAction, HealthRecordError,
    HistoryEntryRequest, HistorySection, MedicalHistory,
};

pub struct MedicalHistoryService {
    supabase: SupabaseClient,
}

impl MedicalHistoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Fetch the patient's history, creating an empty document on first
    /// access.
    pub async fn get_or_create(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalHistory, HealthRecordError> {
        let path = format!("/rest/v1/medical_histories?patient_id=eq.{}", patient_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| HealthRecordError::DatabaseError(e.to_string()))?;

        if let Some(row) = result.into_iter().next() {
            return serde_json::from_value(row)
                .map_err(|e| HealthRecordError::DatabaseError(e.to_string()));
        }

        debug!("No history on file for patient {}, creating", patient_id);

        let history_data = json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "blood_group": null,
            "allergies": [],
            "chronic_conditions": [],
            "family_history": [],
            "current_medications": [],
            "surgical_history": [],
            "vaccinations": [],
            "notes": null,
            "last_updated": Utc::now().to_rfc3339(),
            "updated_by": null
        });

        let created = self
            .supabase
            .insert_returning("/rest/v1/medical_histories", Some(auth_token), history_data)
            .await
            .map_err(|e| HealthRecordError::DatabaseError(e.to_string()))?;

        let row = created.into_iter().next().ok_or_else(|| {
            HealthRecordError::DatabaseError("Insert returned no row".to_string())
        })?;

        serde_json::from_value(row).map_err(|e| HealthRecordError::DatabaseError(e.to_string()))
    }

    /// Append to or remove from one list section of the history document.
    pub async fn apply_entry(
        &self,
        patient_id: Uuid,
        updated_by: &str,
        request: HistoryEntryRequest,
        auth_token: &str,
    ) -> Result<MedicalHistory, HealthRecordError> {
        let history = self.get_or_create(patient_id, auth_token).await?;

        let mut doc = serde_json::to_value(&history)
            .map_err(|e| HealthRecordError::DatabaseError(e.to_string()))?;

        let field = section_field(request.section);
        let list = doc[field].as_array_mut().ok_or_else(|| {
            HealthRecordError::DatabaseError(format!("History section {} is not a list", field))
        })?;

        match request.action {
            EntryAction::Add => list.push(request.entry),
            EntryAction::Remove => list.retain(|existing| existing != &request.entry),
        }

        let update = json!({
            field: doc[field],
            "last_updated": Utc::now().to_rfc3339(),
            "updated_by": updated_by
        });

        let path = format!("/rest/v1/medical_histories?patient_id=eq.{}", patient_id);
        let result = self
            .supabase
            .conditional_update(&path, Some(auth_token), update)
            .await
            .map_err(|e| HealthRecordError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(HealthRecordError::NotFound)?;

        info!("Medical history for patient {} updated ({})", patient_id, field);
        serde_json::from_value(row).map_err(|e| HealthRecordError::DatabaseError(e.to_string()))
    }

    pub async fn create_note(
        &self,
        doctor_id: Uuid,
        request: CreateConsultationNoteRequest,
        auth_token: &str,
    ) -> Result<ConsultationNote, HealthRecordError> {
        let note_data = json!({
            "id": Uuid::new_v4(),
            "consultation_id": request.consultation_id,
            "patient_id": request.patient_id,
            "doctor_id": doctor_id,
            "symptoms": request.symptoms,
            "diagnosis": request.diagnosis,
            "treatment": request.treatment,
            "follow_up_date": request.follow_up_date,
            "notes": request.notes,
            "created_at": Utc::now().to_rfc3339()
        });

        let result = self
            .supabase
            .insert_returning("/rest/v1/consultation_notes", Some(auth_token), note_data)
            .await
            .map_err(|e| HealthRecordError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or_else(|| {
            HealthRecordError::DatabaseError("Insert returned no row".to_string())
        })?;

        serde_json::from_value(row).map_err(|e| HealthRecordError::DatabaseError(e.to_string()))
    }

    pub async fn list_notes_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<ConsultationNote>, HealthRecordError> {
        let path = format!(
            "/rest/v1/consultation_notes?patient_id=eq.{}&order=created_at.desc",
            patient_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| HealthRecordError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| HealthRecordError::DatabaseError(e.to_string()))
            })
            .collect()
    }
}

fn section_field(section: HistorySection) -> &'static str {
    match section {
        HistorySection::Allergies => "allergies",
        HistorySection::ChronicConditions => "chronic_conditions",
        HistorySection::FamilyHistory => "family_history",
        HistorySection::CurrentMedications => "current_medications",
        HistorySection::SurgicalHistory => "surgical_history",
        HistorySection::Vaccinations => "vaccinations",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_fields_map_to_document_keys() {
        assert_eq!(section_field(HistorySection::Allergies), "allergies");
        assert_eq!(section_field(HistorySection::Vaccinations), "vaccinations");
        assert_eq!(
            section_field(HistorySection::ChronicConditions),
            "chronic_conditions"
        );
    }
}
