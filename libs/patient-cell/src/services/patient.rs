use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use std::collections::HashSet;
use std::sync::Arc;

use shared_database::supabase::SupabaseClient;

use crate::models::{Patient, PatientError, PatientSummary, UpdatePatientProfileRequest};

// Password column stays out of every select.
const PATIENT_COLUMNS: &str =
    "id,first_name,last_name,email,phone,address,gender,date_of_birth,created_at,updated_at";

pub struct PatientService {
    supabase: Arc<SupabaseClient>,
}

impl PatientService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn get_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Fetching patient profile: {}", patient_id);

        let path = format!(
            "/rest/v1/patients?id=eq.{}&select={}",
            patient_id, PATIENT_COLUMNS
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }

    pub async fn update_profile(
        &self,
        patient_id: Uuid,
        request: UpdatePatientProfileRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        request.validate()?;

        let mut update_data = serde_json::Map::new();
        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(date_of_birth) = request.date_of_birth {
            update_data.insert("date_of_birth".to_string(), json!(date_of_birth));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/patients?id=eq.{}&select={}",
            patient_id, PATIENT_COLUMNS
        );
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }

    /// Patients the doctor has (or had) appointments with, deduplicated
    /// across repeat bookings.
    pub async fn roster_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<PatientSummary>, PatientError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&select=patient_id,patients(id,first_name,last_name,gender,phone,date_of_birth)",
            doctor_id
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut roster = Vec::new();
        for row in rows {
            let Some(patient_value) = row.get("patients") else {
                continue;
            };
            let patient: PatientSummary = serde_json::from_value(patient_value.clone())
                .map_err(|e| {
                    PatientError::DatabaseError(format!("Failed to parse patient: {}", e))
                })?;
            if seen.insert(patient.id) {
                roster.push(patient);
            }
        }

        roster.sort_by(|a, b| {
            (a.first_name.as_str(), a.last_name.as_str())
                .cmp(&(b.first_name.as_str(), b.last_name.as_str()))
        });

        Ok(roster)
    }
}
