use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use std::sync::Arc;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError};

/// Half-open interval overlap: `[start1, end1)` intersects `[start2, end2)`.
/// Back-to-back slots share a boundary instant and never conflict.
pub fn intervals_overlap(
    start1: NaiveTime,
    end1: NaiveTime,
    start2: NaiveTime,
    end2: NaiveTime,
) -> bool {
    start1 < end2 && start2 < end1
}

pub struct ConflictDetectionService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictDetectionService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// True when the doctor already has a non-cancelled appointment
    /// overlapping the requested window on that date.
    pub async fn doctor_has_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        debug!(
            "Checking doctor {} calendar on {} between {} and {}",
            doctor_id, date, start_time, end_time
        );

        let existing = self
            .active_appointments_on("doctor_id", doctor_id, date, auth_token)
            .await?;

        let conflict = existing
            .iter()
            .any(|apt| intervals_overlap(start_time, end_time, apt.start_time, apt.end_time));

        if conflict {
            warn!("Doctor {} already booked in requested window on {}", doctor_id, date);
        }

        Ok(conflict)
    }

    /// True when the patient already holds a non-cancelled appointment (with
    /// any doctor) overlapping the requested window on that date.
    pub async fn patient_has_conflict(
        &self,
        patient_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        debug!(
            "Checking patient {} calendar on {} between {} and {}",
            patient_id, date, start_time, end_time
        );

        let existing = self
            .active_appointments_on("patient_id", patient_id, date, auth_token)
            .await?;

        Ok(existing
            .iter()
            .any(|apt| intervals_overlap(start_time, end_time, apt.start_time, apt.end_time)))
    }

    /// Fetches the non-cancelled appointments for one side of the booking on
    /// a given date. Cancelled rows free their slot and are filtered at the
    /// store.
    pub async fn active_appointments_on(
        &self,
        owner_column: &str,
        owner_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?{}=eq.{}&appointment_date=eq.{}&status=neq.cancelled&order=start_time.asc",
            owner_column, owner_id, date
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| {
                AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e))
            })?;

        Ok(appointments)
    }
}
