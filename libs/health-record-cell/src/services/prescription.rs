use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use notification_cell::services::sms::SmsService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CreatePrescriptionRequest, HealthRecordError, Prescription, PrescriptionStatus,
    UpdatePrescriptionRequest,
};

const PRESCRIPTION_READY_SMS: &str =
    "Your prescription is ready. Please check your account for details.";

pub struct PrescriptionService {
    supabase: SupabaseClient,
    sms: SmsService,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            sms: SmsService::new(config),
        }
    }

    /// Issue a prescription after a consultation and let the patient know
    /// by SMS when a contact number is on file.
    pub async fn create_prescription(
        &self,
        doctor_id: Uuid,
        request: CreatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<Prescription, HealthRecordError> {
        if request.medications.is_empty() {
            return Err(HealthRecordError::ValidationError(
                "At least one medication is required".to_string(),
            ));
        }

        debug!(
            "Creating prescription for consultation {}",
            request.consultation_id
        );

        let prescription_id = Uuid::new_v4();
        let prescription_data = json!({
            "id": prescription_id,
            "consultation_id": request.consultation_id,
            "patient_id": request.patient_id,
            "doctor_id": doctor_id,
            "medications": request.medications,
            "instructions": request.instructions,
            "follow_up": request.follow_up,
            "status": PrescriptionStatus::Active,
            "created_at": Utc::now().to_rfc3339()
        });

        let result = self
            .supabase
            .insert_returning("/rest/v1/prescriptions", Some(auth_token), prescription_data)
            .await
            .map_err(|e| HealthRecordError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or_else(|| {
            HealthRecordError::DatabaseError("Insert returned no row".to_string())
        })?;

        let prescription: Prescription = serde_json::from_value(row)
            .map_err(|e| HealthRecordError::DatabaseError(e.to_string()))?;

        // Back-reference from the consultation for the patient dashboard.
        let link_path = format!(
            "/rest/v1/consultations?id=eq.{}",
            request.consultation_id
        );
        let _ = self
            .supabase
            .conditional_update(
                &link_path,
                Some(auth_token),
                json!({ "prescription_id": prescription_id }),
            )
            .await;

        if let Some(phone) = self
            .lookup_patient_phone(request.consultation_id, auth_token)
            .await
        {
            self.sms.send_best_effort(&phone, PRESCRIPTION_READY_SMS).await;
        }

        info!("Prescription {} issued", prescription.id);
        Ok(prescription)
    }

    pub async fn get_prescription(
        &self,
        prescription_id: Uuid,
        auth_token: &str,
    ) -> Result<Prescription, HealthRecordError> {
        let path = format!("/rest/v1/prescriptions?id=eq.{}", prescription_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| HealthRecordError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(HealthRecordError::NotFound)?;
        serde_json::from_value(row).map_err(|e| HealthRecordError::DatabaseError(e.to_string()))
    }

    pub async fn update_prescription(
        &self,
        prescription_id: Uuid,
        request: UpdatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<Prescription, HealthRecordError> {
        let mut update = serde_json::Map::new();
        if let Some(status) = request.status {
            update.insert("status".to_string(), json!(status));
        }
        if let Some(follow_up) = request.follow_up {
            update.insert("follow_up".to_string(), json!(follow_up));
        }

        if update.is_empty() {
            return Err(HealthRecordError::ValidationError(
                "Nothing to update".to_string(),
            ));
        }

        let path = format!("/rest/v1/prescriptions?id=eq.{}", prescription_id);
        let result = self
            .supabase
            .conditional_update(&path, Some(auth_token), Value::Object(update))
            .await
            .map_err(|e| HealthRecordError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(HealthRecordError::NotFound)?;
        serde_json::from_value(row).map_err(|e| HealthRecordError::DatabaseError(e.to_string()))
    }

    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Prescription>, HealthRecordError> {
        let path = format!(
            "/rest/v1/prescriptions?patient_id=eq.{}&order=created_at.desc",
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

    async fn lookup_patient_phone(
        &self,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Option<String> {
        let path = format!(
            "/rest/v1/consultations?id=eq.{}&select=patient_contact",
            consultation_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .ok()?;

        result
            .first()
            .and_then(|row| row["patient_contact"]["phone"].as_str())
            .map(String::from)
    }
}
