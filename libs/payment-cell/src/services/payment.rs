use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::services::sms::{normalize_phone, SmsService};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    CallbackOutcome, InitiatePaymentRequest, InitiatePaymentResponse, MockPaymentRequest,
    Payment, PaymentError, PaymentStatus, StkCallback,
};
use crate::services::mpesa::MpesaClient;

const PAYMENT_RECEIVED_SMS: &str = "Payment received. You will be connected to a doctor shortly.";

pub struct PaymentService {
    supabase: SupabaseClient,
    mpesa: MpesaClient,
    sms: SmsService,
}

impl PaymentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            mpesa: MpesaClient::new(config),
            sms: SmsService::new(config),
        }
    }

    /// Push the consultation fee to the patient's phone and persist a
    /// pending record keyed by the gateway's checkout-request id.
    pub async fn initiate_payment(
        &self,
        patient: &User,
        request: InitiatePaymentRequest,
        auth_token: &str,
    ) -> Result<InitiatePaymentResponse, PaymentError> {
        let patient_id = Uuid::parse_str(&patient.id)
            .map_err(|_| PaymentError::DatabaseError("Invalid user id".to_string()))?;

        let phone = normalize_phone(&request.phone_number)
            .ok_or_else(|| PaymentError::InvalidPhoneNumber(request.phone_number.clone()))?;

        let stk = self.mpesa.initiate_stk_push(&phone, request.amount).await?;

        let payment_data = json!({
            "id": stk.checkout_request_id,
            "consultation_id": request.consultation_id,
            "patient_id": patient_id,
            "amount": request.amount,
            "phone_number": phone,
            "status": PaymentStatus::Pending,
            "transaction_id": null,
            "result_description": null,
            "merchant_request_id": stk.merchant_request_id,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        self.supabase
            .insert_returning("/rest/v1/payments", Some(auth_token), payment_data)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        info!(
            "Payment {} initiated for consultation {}",
            stk.checkout_request_id, request.consultation_id
        );

        Ok(InitiatePaymentResponse {
            success: true,
            checkout_request_id: stk.checkout_request_id,
        })
    }

    /// Apply the gateway's asynchronous result. The status write is filtered
    /// on pending so a redelivered callback matches nothing and produces no
    /// second SMS or consultation update.
    pub async fn handle_callback(
        &self,
        callback: StkCallback,
    ) -> Result<CallbackOutcome, PaymentError> {
        let checkout_id = &callback.checkout_request_id;
        debug!(
            "Processing payment callback for {} (result code {})",
            checkout_id, callback.result_code
        );

        let next_status = if callback.is_success() {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        };

        let path = format!(
            "/rest/v1/payments?id=eq.{}&status=eq.{}",
            checkout_id,
            PaymentStatus::Pending
        );
        let update = json!({
            "status": next_status,
            "transaction_id": callback.receipt_number(),
            "result_description": callback.result_desc,
            "updated_at": Utc::now().to_rfc3339()
        });

        let result = self
            .supabase
            .conditional_update(&path, None, update)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        let Some(row) = result.into_iter().next() else {
            // Nothing was pending under this id: either an unknown payment
            // or a duplicate delivery.
            return match self.get_payment(checkout_id).await {
                Ok(existing) => {
                    warn!(
                        "Duplicate callback for payment {} (already {})",
                        checkout_id, existing.status
                    );
                    Ok(CallbackOutcome::Duplicate)
                }
                Err(PaymentError::NotFound) => Err(PaymentError::NotFound),
                Err(e) => Err(e),
            };
        };

        let payment: Payment =
            serde_json::from_value(row).map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        if payment.status == PaymentStatus::Completed {
            self.sms
                .send_best_effort(&payment.phone_number, PAYMENT_RECEIVED_SMS)
                .await;

            self.mark_consultation_paid(payment.consultation_id, &payment.id)
                .await;
        }

        info!("Payment {} reconciled to {}", payment.id, payment.status);
        Ok(CallbackOutcome::Processed(payment))
    }

    /// Mock substitute for environments without gateway credentials:
    /// records an already-completed payment and logs the SMS instead of
    /// sending it.
    pub async fn mock_payment(
        &self,
        patient: &User,
        request: MockPaymentRequest,
        auth_token: &str,
    ) -> Result<Payment, PaymentError> {
        let patient_id = Uuid::parse_str(&patient.id)
            .map_err(|_| PaymentError::DatabaseError("Invalid user id".to_string()))?;

        let phone = normalize_phone(&request.phone_number)
            .ok_or_else(|| PaymentError::InvalidPhoneNumber(request.phone_number.clone()))?;

        let checkout_id = format!("TEST-{}", Utc::now().timestamp_millis());

        let payment_data = json!({
            "id": checkout_id,
            "consultation_id": request.consultation_id,
            "patient_id": patient_id,
            "amount": request.amount,
            "phone_number": phone,
            "status": PaymentStatus::Completed,
            "transaction_id": checkout_id,
            "result_description": "Mock payment",
            "merchant_request_id": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result = self
            .supabase
            .insert_returning("/rest/v1/payments", Some(auth_token), payment_data)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        let payment: Payment = result
            .into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?
            .ok_or_else(|| PaymentError::DatabaseError("Insert returned no row".to_string()))?;

        info!(
            "[MOCK SMS] To: {}, Message: Test payment received: KES {} for consultation. TransactionID: {}",
            payment.phone_number, payment.amount, payment.id
        );

        self.mark_consultation_paid(payment.consultation_id, &payment.id)
            .await;

        Ok(payment)
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<Payment, PaymentError> {
        let path = format!("/rest/v1/payments?id=eq.{}", payment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(PaymentError::NotFound)?;
        serde_json::from_value(row).map_err(|e| PaymentError::DatabaseError(e.to_string()))
    }

    /// Stamp the linked consultation with the cleared payment. Best effort:
    /// the payment record is already authoritative, so a failed stamp is
    /// logged and retried by support tooling rather than failing the
    /// callback.
    async fn mark_consultation_paid(&self, consultation_id: Uuid, payment_id: &str) {
        let path = format!("/rest/v1/consultations?id=eq.{}", consultation_id);
        let update = json!({ "payment_id": payment_id });

        if let Err(e) = self.supabase.conditional_update(&path, None, update).await {
            warn!(
                "Failed to stamp consultation {} with payment {}: {}",
                consultation_id, payment_id, e
            );
        }
    }
}
