use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use std::sync::Arc;

use shared_database::supabase::SupabaseClient;

use crate::models::{MedicalHistory, PatientError, UpdateMedicalHistoryRequest};

pub struct MedicalHistoryService {
    supabase: Arc<SupabaseClient>,
}

impl MedicalHistoryService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// The patient's own history record. A blank row is created at
    /// registration, so a missing record means the account predates that or
    /// was removed.
    pub async fn get_history(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalHistory, PatientError> {
        let path = format!("/rest/v1/medical_history?patient_id=eq.{}", patient_id);

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::HistoryNotFound);
        }

        serde_json::from_value(result[0].clone()).map_err(|e| {
            PatientError::DatabaseError(format!("Failed to parse medical history: {}", e))
        })
    }

    /// Upsert: updates the existing record, or creates one with "None"
    /// defaults for the omitted sections.
    pub async fn update_history(
        &self,
        patient_id: Uuid,
        request: UpdateMedicalHistoryRequest,
        auth_token: &str,
    ) -> Result<MedicalHistory, PatientError> {
        request.validate()?;

        let existing = self.get_history(patient_id, auth_token).await;

        let result = match existing {
            Ok(_) => {
                let mut update_data = serde_json::Map::new();
                update_data.insert(
                    "conditions".to_string(),
                    json!(request.conditions.unwrap_or_else(none_default)),
                );
                update_data.insert(
                    "surgeries".to_string(),
                    json!(request.surgeries.unwrap_or_else(none_default)),
                );
                update_data.insert(
                    "medications".to_string(),
                    json!(request.medications.unwrap_or_else(none_default)),
                );
                update_data.insert(
                    "allergies".to_string(),
                    json!(request.allergies.unwrap_or_else(none_default)),
                );
                update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

                let path = format!("/rest/v1/medical_history?patient_id=eq.{}", patient_id);
                self.supabase
                    .request_with_headers::<Vec<Value>>(
                        Method::PATCH,
                        &path,
                        Some(auth_token),
                        Some(Value::Object(update_data)),
                        Some(representation_headers()),
                    )
                    .await
            }
            Err(PatientError::HistoryNotFound) => {
                debug!("Creating medical history record for patient {}", patient_id);
                let history_data = json!({
                    "patient_id": patient_id,
                    "conditions": request.conditions.unwrap_or_else(none_default),
                    "surgeries": request.surgeries.unwrap_or_else(none_default),
                    "medications": request.medications.unwrap_or_else(none_default),
                    "allergies": request.allergies.unwrap_or_else(none_default),
                    "created_at": Utc::now().to_rfc3339()
                });

                self.supabase
                    .request_with_headers::<Vec<Value>>(
                        Method::POST,
                        "/rest/v1/medical_history",
                        Some(auth_token),
                        Some(history_data),
                        Some(representation_headers()),
                    )
                    .await
            }
            Err(other) => return Err(other),
        };

        let rows = result.map_err(|e| PatientError::DatabaseError(e.to_string()))?;
        if rows.is_empty() {
            return Err(PatientError::DatabaseError(
                "Failed to update medical history".to_string(),
            ));
        }

        info!("Medical history updated for patient {}", patient_id);

        serde_json::from_value(rows[0].clone()).map_err(|e| {
            PatientError::DatabaseError(format!("Failed to parse medical history: {}", e))
        })
    }

    /// Doctor's view of a patient's history, gated on the two having at
    /// least one appointment together (cancelled ones included, matching the
    /// roster).
    pub async fn get_history_for_doctor(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalHistory, PatientError> {
        let access_path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&doctor_id=eq.{}&select=id&limit=1",
            patient_id, doctor_id
        );

        let shared: Vec<Value> = self
            .supabase
            .request(Method::GET, &access_path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if shared.is_empty() {
            return Err(PatientError::NoSharedAppointments);
        }

        self.get_history(patient_id, auth_token).await
    }
}

fn none_default() -> String {
    "None".to_string()
}

fn representation_headers() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "Prefer",
        reqwest::header::HeaderValue::from_static("return=representation"),
    );
    headers
}
