use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use std::sync::Arc;

use appointment_cell::models::{Appointment, AppointmentStatus, Diagnosis};
use appointment_cell::services::lifecycle::AppointmentLifecycleService;
use shared_database::supabase::SupabaseClient;

use crate::models::{DiagnosisRequest, DoctorError};

pub struct DiagnosisService {
    supabase: Arc<SupabaseClient>,
    lifecycle: AppointmentLifecycleService,
}

impl DiagnosisService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            supabase,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Records the doctor's findings against an appointment and closes it
    /// out. Only the doctor the appointment was booked with may diagnose,
    /// and only while it is still scheduled.
    pub async fn submit_diagnosis(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        request: DiagnosisRequest,
        auth_token: &str,
    ) -> Result<(Appointment, Diagnosis), DoctorError> {
        request.validate()?;

        let appointment = self
            .fetch_doctor_appointment(appointment_id, doctor_id, auth_token)
            .await?;

        self.lifecycle
            .validate_status_transition(&appointment.status, &AppointmentStatus::Completed)
            .map_err(|_| DoctorError::InvalidAppointmentStatus(appointment.status))?;

        let diagnosis_data = json!({
            "diagnosis": request.diagnosis,
            "prescription": request.prescription,
            "doctor_notes": request.doctor_notes.unwrap_or_default()
        });

        let path = format!("/rest/v1/diagnoses?appointment_id=eq.{}", appointment_id);
        let updated: Vec<Diagnosis> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(diagnosis_data),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let diagnosis = updated.into_iter().next().ok_or_else(|| {
            DoctorError::DatabaseError("Diagnosis update returned no rows".to_string())
        })?;

        let status_update = json!({
            "status": AppointmentStatus::Completed,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(status_update),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::DatabaseError(
                "Failed to complete appointment".to_string(),
            ));
        }

        let completed: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        info!("Appointment {} diagnosed and completed by doctor {}", appointment_id, doctor_id);

        Ok((completed, diagnosis))
    }

    async fn fetch_doctor_appointment(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, DoctorError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&doctor_id=eq.{}",
            appointment_id, doctor_id
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::AppointmentNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }
}

fn representation_headers() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "Prefer",
        reqwest::header::HeaderValue::from_static("return=representation"),
    );
    headers
}
