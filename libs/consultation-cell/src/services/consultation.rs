use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::services::sms::SmsService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    AppendMessageRequest, CancelConsultationRequest, CancelledBy, Consultation,
    ConsultationError, ConsultationMessage, ConsultationStatus, CreateConsultationRequest,
    ParticipantRole, PatientContact, RoomInfo,
};
use crate::services::lifecycle::ConsultationLifecycle;

pub struct ConsultationService {
    supabase: SupabaseClient,
    lifecycle: ConsultationLifecycle,
    sms: SmsService,
}

impl ConsultationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            lifecycle: ConsultationLifecycle::new(),
            sms: SmsService::new(config),
        }
    }

    /// Create a consultation from a finished pre-assessment. Starts pending;
    /// payment and acceptance move it along from there.
    pub async fn create_consultation(
        &self,
        patient: &User,
        request: CreateConsultationRequest,
        auth_token: &str,
    ) -> Result<Consultation, ConsultationError> {
        let patient_id = parse_uuid(&patient.id)?;

        debug!(
            "Creating consultation for patient {} (specialty {})",
            patient_id, request.patient_info.specialty
        );

        let consultation_data = json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "doctor_id": request.doctor_id,
            "patient_info": request.patient_info,
            "patient_contact": PatientContact {
                phone: patient.phone.clone(),
                email: patient.email.clone(),
            },
            "assessment": request.assessment,
            "status": ConsultationStatus::Pending,
            "room_id": null,
            "estimated_wait": request.estimated_wait,
            "messages": [],
            "prescription_id": null,
            "payment_id": null,
            "cancelled_by": null,
            "created_at": Utc::now().to_rfc3339(),
            "start_time": null,
            "end_time": null
        });

        let result = self
            .supabase
            .insert_returning("/rest/v1/consultations", Some(auth_token), consultation_data)
            .await
            .map_err(|e| ConsultationError::DatabaseError(e.to_string()))?;

        let consultation = parse_row(result.into_iter().next())?;

        // Nudge the preselected doctor; a failed SMS must not lose the
        // consultation that was just written.
        if let Some(doctor_id) = request.doctor_id {
            if let Some(phone) = self.lookup_doctor_phone(doctor_id, auth_token).await {
                self.sms
                    .send_best_effort(&phone, "New consultation request. Please log in to the system.")
                    .await;
            }
        }

        info!("Consultation {} created with status pending", consultation.id);
        Ok(consultation)
    }

    pub async fn get_consultation(
        &self,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Result<Consultation, ConsultationError> {
        let path = format!("/rest/v1/consultations?id=eq.{}", consultation_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ConsultationError::DatabaseError(e.to_string()))?;

        parse_row(result.into_iter().next())
    }

    /// Doctor accepts a pending consultation. The update is filtered on the
    /// current status so two doctors racing for the same patient resolve to
    /// a single winner; the loser sees the conflict.
    pub async fn accept_consultation(
        &self,
        consultation_id: Uuid,
        doctor: &User,
        auth_token: &str,
    ) -> Result<Consultation, ConsultationError> {
        let doctor_id = parse_uuid(&doctor.id)?;

        debug!(
            "Doctor {} accepting consultation {}",
            doctor_id, consultation_id
        );

        let room_id = issue_room_id(consultation_id);

        let path = format!(
            "/rest/v1/consultations?id=eq.{}&status=eq.{}",
            consultation_id,
            ConsultationStatus::Pending
        );
        let update = json!({
            "doctor_id": doctor_id,
            "status": ConsultationStatus::Active,
            "room_id": room_id,
            "start_time": Utc::now().to_rfc3339()
        });

        let result = self
            .supabase
            .conditional_update(&path, Some(auth_token), update)
            .await
            .map_err(|e| ConsultationError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let consultation: Consultation = serde_json::from_value(row)
                    .map_err(|e| ConsultationError::DatabaseError(e.to_string()))?;
                info!(
                    "Consultation {} accepted by doctor {}, room {}",
                    consultation_id, doctor_id, room_id
                );
                Ok(consultation)
            }
            // The filter matched nothing: either the record is gone or
            // someone else moved it out of pending first.
            None => {
                let current = self.get_consultation(consultation_id, auth_token).await?;
                warn!(
                    "Accept lost the race for consultation {} (status {})",
                    consultation_id, current.status
                );
                Err(ConsultationError::AlreadyTaken)
            }
        }
    }

    /// Doctor turns down a pending consultation.
    pub async fn decline_consultation(
        &self,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Result<Consultation, ConsultationError> {
        self.cancel_from_pending(consultation_id, CancelledBy::Doctor, auth_token)
            .await
    }

    pub async fn cancel_consultation(
        &self,
        consultation_id: Uuid,
        request: CancelConsultationRequest,
        auth_token: &str,
    ) -> Result<Consultation, ConsultationError> {
        let current = self.get_consultation(consultation_id, auth_token).await?;

        self.lifecycle
            .validate_transition(current.status, ConsultationStatus::Cancelled)?;

        let path = format!(
            "/rest/v1/consultations?id=eq.{}&status=eq.{}",
            consultation_id, current.status
        );
        let update = json!({
            "status": ConsultationStatus::Cancelled,
            "cancelled_by": request.cancelled_by,
            "end_time": Utc::now().to_rfc3339()
        });

        let result = self
            .supabase
            .conditional_update(&path, Some(auth_token), update)
            .await
            .map_err(|e| ConsultationError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                info!("Consultation {} cancelled", consultation_id);
                serde_json::from_value(row)
                    .map_err(|e| ConsultationError::DatabaseError(e.to_string()))
            }
            None => Err(ConsultationError::InvalidStatusTransition {
                from: current.status,
                to: ConsultationStatus::Cancelled,
            }),
        }
    }

    /// Either party leaving the room closes the consultation.
    pub async fn complete_consultation(
        &self,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Result<Consultation, ConsultationError> {
        let path = format!(
            "/rest/v1/consultations?id=eq.{}&status=eq.{}",
            consultation_id,
            ConsultationStatus::Active
        );
        let update = json!({
            "status": ConsultationStatus::Completed,
            "end_time": Utc::now().to_rfc3339()
        });

        let result = self
            .supabase
            .conditional_update(&path, Some(auth_token), update)
            .await
            .map_err(|e| ConsultationError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                info!("Consultation {} completed", consultation_id);
                serde_json::from_value(row)
                    .map_err(|e| ConsultationError::DatabaseError(e.to_string()))
            }
            None => {
                let current = self.get_consultation(consultation_id, auth_token).await?;
                Err(ConsultationError::InvalidStatusTransition {
                    from: current.status,
                    to: ConsultationStatus::Completed,
                })
            }
        }
    }

    /// Append to the embedded transcript. Closed consultations keep their
    /// transcript frozen.
    pub async fn append_message(
        &self,
        consultation_id: Uuid,
        user: &User,
        request: AppendMessageRequest,
        auth_token: &str,
    ) -> Result<Consultation, ConsultationError> {
        let consultation = self.get_consultation(consultation_id, auth_token).await?;
        let role = participant_role(&consultation, user).ok_or(ConsultationError::NotParticipant)?;

        if consultation.status.is_terminal() {
            return Err(ConsultationError::ValidationError(
                "Cannot add messages to a closed consultation".to_string(),
            ));
        }

        let mut messages = consultation.messages;
        messages.push(ConsultationMessage {
            sender: role,
            content: request.content,
            timestamp: Utc::now(),
        });

        let path = format!("/rest/v1/consultations?id=eq.{}", consultation_id);
        let update = json!({ "messages": messages });

        let result = self
            .supabase
            .conditional_update(&path, Some(auth_token), update)
            .await
            .map_err(|e| ConsultationError::DatabaseError(e.to_string()))?;

        parse_row(result.into_iter().next())
    }

    /// Hand out the room identifier once the consultation is live.
    pub async fn get_room(
        &self,
        consultation_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<RoomInfo, ConsultationError> {
        let consultation = self.get_consultation(consultation_id, auth_token).await?;
        let role = participant_role(&consultation, user).ok_or(ConsultationError::NotParticipant)?;

        if consultation.status != ConsultationStatus::Active {
            return Err(ConsultationError::RoomNotOpen);
        }

        let room_id = consultation.room_id.ok_or(ConsultationError::RoomNotOpen)?;

        Ok(RoomInfo {
            consultation_id,
            room_id,
            participant_role: role,
        })
    }

    /// Pending consultations a doctor can pick up: unassigned ones plus any
    /// routed directly to them.
    pub async fn list_pending_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Consultation>, ConsultationError> {
        let path = format!(
            "/rest/v1/consultations?status=eq.{}&or=(doctor_id.is.null,doctor_id.eq.{})&order=created_at.asc",
            ConsultationStatus::Pending,
            doctor_id
        );

        self.query_consultations(&path, auth_token).await
    }

    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Consultation>, ConsultationError> {
        let path = format!(
            "/rest/v1/consultations?patient_id=eq.{}&order=created_at.desc",
            patient_id
        );

        self.query_consultations(&path, auth_token).await
    }

    async fn query_consultations(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Consultation>, ConsultationError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| ConsultationError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| ConsultationError::DatabaseError(e.to_string()))
            })
            .collect()
    }

    async fn cancel_from_pending(
        &self,
        consultation_id: Uuid,
        cancelled_by: CancelledBy,
        auth_token: &str,
    ) -> Result<Consultation, ConsultationError> {
        let path = format!(
            "/rest/v1/consultations?id=eq.{}&status=eq.{}",
            consultation_id,
            ConsultationStatus::Pending
        );
        let update = json!({
            "status": ConsultationStatus::Cancelled,
            "cancelled_by": cancelled_by,
            "end_time": Utc::now().to_rfc3339()
        });

        let result = self
            .supabase
            .conditional_update(&path, Some(auth_token), update)
            .await
            .map_err(|e| ConsultationError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map_err(|e| ConsultationError::DatabaseError(e.to_string())),
            None => {
                let current = self.get_consultation(consultation_id, auth_token).await?;
                Err(ConsultationError::InvalidStatusTransition {
                    from: current.status,
                    to: ConsultationStatus::Cancelled,
                })
            }
        }
    }

    async fn lookup_doctor_phone(&self, doctor_id: Uuid, auth_token: &str) -> Option<String> {
        let path = format!("/rest/v1/doctors?id=eq.{}&select=phone", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .ok()?;

        result
            .first()
            .and_then(|row| row["phone"].as_str())
            .map(String::from)
    }
}

pub fn participant_role(consultation: &Consultation, user: &User) -> Option<ParticipantRole> {
    let user_id = Uuid::parse_str(&user.id).ok()?;

    if consultation.patient_id == user_id {
        return Some(ParticipantRole::Patient);
    }
    if consultation.doctor_id == Some(user_id) {
        return Some(ParticipantRole::Doctor);
    }
    None
}

fn issue_room_id(consultation_id: Uuid) -> String {
    let short: String = consultation_id.to_string().chars().take(8).collect();
    format!("room_{}_{}", short, Utc::now().timestamp())
}

fn parse_uuid(id: &str) -> Result<Uuid, ConsultationError> {
    Uuid::parse_str(id).map_err(|_| ConsultationError::ValidationError("Invalid user id".to_string()))
}

fn parse_row(row: Option<Value>) -> Result<Consultation, ConsultationError> {
    let row = row.ok_or(ConsultationError::NotFound)?;
    serde_json::from_value(row).map_err(|e| ConsultationError::DatabaseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PatientInfo, PatientType};
    use chrono::Utc;

    fn consultation_fixture(patient_id: Uuid, doctor_id: Option<Uuid>) -> Consultation {
        Consultation {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            patient_info: PatientInfo {
                patient_type: PatientType::Myself,
                age: Some(30),
                specialty: "General Practice".to_string(),
                primary_symptom: "headache".to_string(),
                additional_symptoms: vec![],
            },
            patient_contact: None,
            assessment: None,
            status: ConsultationStatus::Pending,
            room_id: None,
            estimated_wait: None,
            messages: vec![],
            prescription_id: None,
            payment_id: None,
            cancelled_by: None,
            created_at: Utc::now(),
            start_time: None,
            end_time: None,
        }
    }

    fn user(id: Uuid) -> User {
        User {
            id: id.to_string(),
            email: None,
            phone: None,
            role: None,
            metadata: None,
            created_at: None,
        }
    }

    #[test]
    fn patient_and_doctor_resolve_to_roles() {
        let patient_id = Uuid::new_v4();
        let doctor_id = Uuid::new_v4();
        let consultation = consultation_fixture(patient_id, Some(doctor_id));

        assert_eq!(
            participant_role(&consultation, &user(patient_id)),
            Some(ParticipantRole::Patient)
        );
        assert_eq!(
            participant_role(&consultation, &user(doctor_id)),
            Some(ParticipantRole::Doctor)
        );
        assert_eq!(participant_role(&consultation, &user(Uuid::new_v4())), None);
    }

    #[test]
    fn room_id_embeds_consultation_prefix() {
        let id = Uuid::new_v4();
        let room = issue_room_id(id);
        let short: String = id.to_string().chars().take(8).collect();
        assert!(room.starts_with(&format!("room_{}_", short)));
    }
}
