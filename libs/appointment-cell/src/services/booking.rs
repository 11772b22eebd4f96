// libs/appointment-cell/src/services/booking.rs
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use std::sync::Arc;

use shared_database::supabase::{StoreError, SupabaseClient};
use shared_models::auth::{AuthUser, UserRole};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, Diagnosis,
    DoctorSummary, UpdateAppointmentRequest,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    conflicts: ConflictDetectionService,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            conflicts: ConflictDetectionService::new(Arc::clone(&supabase)),
            lifecycle: AppointmentLifecycleService::new(),
            supabase,
        }
    }

    /// Books an appointment for the patient. The sequential checks produce
    /// the caller-facing error messages; the store's exclusion constraint is
    /// the authoritative guard when two bookings race, surfacing as a 409
    /// that folds into the same slot-taken outcome.
    pub async fn book_appointment(
        &self,
        patient_id: Uuid,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<(Appointment, DoctorSummary), AppointmentError> {
        request.validate(Utc::now().date_naive())?;

        info!(
            "Booking appointment for patient {} with doctor {} on {}",
            patient_id, request.doctor_id, request.appointment_date
        );

        let doctor = self.fetch_doctor(request.doctor_id, auth_token).await?;

        if self
            .conflicts
            .doctor_has_conflict(
                request.doctor_id,
                request.appointment_date,
                request.start_time,
                request.end_time,
                auth_token,
            )
            .await?
        {
            return Err(AppointmentError::SlotTaken);
        }

        if self
            .conflicts
            .patient_has_conflict(
                patient_id,
                request.appointment_date,
                request.start_time,
                request.end_time,
                auth_token,
            )
            .await?
        {
            return Err(AppointmentError::PatientUnavailable);
        }

        let appointment = self
            .create_appointment_record(patient_id, &request, auth_token)
            .await?;

        self.create_placeholder_diagnosis(&appointment, auth_token)
            .await?;

        info!("Appointment {} booked", appointment.id);

        Ok((appointment, doctor))
    }

    /// Single appointment with the joined counterpart and diagnosis rows,
    /// scoped to the caller.
    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        user: &AuthUser,
        auth_token: &str,
    ) -> Result<Value, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&{}=eq.{}&select={}",
            appointment_id,
            owner_column(user.role),
            user.id,
            detail_select(user.role)
        );

        let mut result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        Ok(result.remove(0))
    }

    /// The caller's appointments, newest first.
    pub async fn list_appointments(
        &self,
        user: &AuthUser,
        auth_token: &str,
    ) -> Result<Vec<Value>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?{}=eq.{}&select={}&order=appointment_date.desc,start_time.desc",
            owner_column(user.role),
            user.id,
            detail_select(user.role)
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }

    /// Patients may rewrite the free-text fields while the appointment is
    /// still scheduled.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        patient_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        request.validate()?;

        let current = self
            .fetch_owned_appointment(appointment_id, "patient_id", patient_id, auth_token)
            .await?;

        if !self.lifecycle.can_modify(&current.status) {
            return Err(AppointmentError::InvalidStatusTransition(current.status));
        }

        let mut update_data = serde_json::Map::new();
        if let Some(concerns) = request.concerns {
            update_data.insert("concerns".to_string(), json!(concerns));
        }
        if let Some(symptoms) = request.symptoms {
            update_data.insert("symptoms".to_string(), json!(symptoms));
        }
        if let Some(patient_notes) = request.patient_notes {
            update_data.insert("patient_notes".to_string(), json!(patient_notes));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        self.patch_appointment(appointment_id, Value::Object(update_data), auth_token)
            .await
    }

    /// Cancels a scheduled appointment. The row is kept with status
    /// `cancelled` so the slot frees up while history survives.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        user: &AuthUser,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self
            .fetch_owned_appointment(appointment_id, owner_column(user.role), user.id, auth_token)
            .await?;

        self.lifecycle
            .validate_status_transition(&current.status, &AppointmentStatus::Cancelled)?;

        let update_data = json!({
            "status": AppointmentStatus::Cancelled,
            "updated_at": Utc::now().to_rfc3339()
        });

        let cancelled = self
            .patch_appointment(appointment_id, update_data, auth_token)
            .await?;

        info!("Appointment {} cancelled by {}", appointment_id, user.id);

        Ok(cancelled)
    }

    async fn fetch_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorSummary, AppointmentError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::DoctorNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse doctor: {}", e)))
    }

    async fn fetch_owned_appointment(
        &self,
        appointment_id: Uuid,
        owner_col: &str,
        owner_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&{}=eq.{}",
            appointment_id, owner_col, owner_id
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone()).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))
        })
    }

    async fn create_appointment_record(
        &self,
        patient_id: Uuid,
        request: &BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let now = Utc::now();

        let appointment_data = json!({
            "patient_id": patient_id,
            "doctor_id": request.doctor_id,
            "appointment_date": request.appointment_date,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
            "status": AppointmentStatus::Scheduled,
            "concerns": request.concerns,
            "symptoms": request.symptoms,
            "patient_notes": request.patient_notes.clone().unwrap_or_default(),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| match e {
                // The exclusion constraint lost us the race for the slot.
                StoreError::Conflict(_) => AppointmentError::SlotTaken,
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;

        if result.is_empty() {
            return Err(AppointmentError::DatabaseError(
                "Failed to create appointment".to_string(),
            ));
        }

        serde_json::from_value(result[0].clone()).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse created appointment: {}", e))
        })
    }

    async fn create_placeholder_diagnosis(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let diagnosis_data = json!({
            "appointment_id": appointment.id,
            "doctor_id": appointment.doctor_id,
            "diagnosis": "Pending",
            "prescription": "Pending",
            "doctor_notes": "",
            "created_at": Utc::now().to_rfc3339()
        });

        let created: Vec<Diagnosis> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/diagnoses",
                Some(auth_token),
                Some(diagnosis_data),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let diagnosis = created.into_iter().next().ok_or_else(|| {
            AppointmentError::DatabaseError("Diagnosis insert returned no rows".to_string())
        })?;

        debug!(
            "Placeholder diagnosis {} created for appointment {}",
            diagnosis.id, appointment.id
        );
        Ok(())
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        update_data: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::DatabaseError(
                "Failed to update appointment".to_string(),
            ));
        }

        serde_json::from_value(result[0].clone()).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse updated appointment: {}", e))
        })
    }
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

fn owner_column(role: UserRole) -> &'static str {
    match role {
        UserRole::Patient => "patient_id",
        UserRole::Doctor => "doctor_id",
    }
}

/// Embedded select: each side of the appointment sees the other side's
/// contact card plus the diagnosis record.
fn detail_select(role: UserRole) -> &'static str {
    match role {
        UserRole::Patient => {
            "*,doctors(first_name,last_name,specialization),diagnoses(diagnosis,prescription,doctor_notes)"
        }
        UserRole::Doctor => {
            "*,patients(first_name,last_name,phone),diagnoses(diagnosis,prescription,doctor_notes)"
        }
    }
}
