// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Times travel as "HH:MM" in request payloads and "HH:MM:SS" in store rows;
/// both deserialize into the same `NaiveTime` field.
pub mod time_hms {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(&raw, fmt).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time of day: {}", raw)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    #[serde(with = "time_hms")]
    pub start_time: NaiveTime,
    #[serde(with = "time_hms")]
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub concerns: String,
    pub symptoms: String,
    #[serde(default)]
    pub patient_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Placeholder record created alongside every booking; the doctor overwrites
/// the "Pending" fields when submitting a diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub doctor_id: Uuid,
    pub diagnosis: String,
    pub prescription: String,
    #[serde(default)]
    pub doctor_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The slice of a doctor row echoed back in booking confirmations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
}

impl DoctorSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    #[serde(with = "time_hms")]
    pub start_time: NaiveTime,
    #[serde(with = "time_hms")]
    pub end_time: NaiveTime,
    pub concerns: String,
    pub symptoms: String,
    #[serde(default)]
    pub patient_notes: Option<String>,
}

impl BookAppointmentRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(), AppointmentError> {
        if self.appointment_date < today {
            return Err(AppointmentError::ValidationError(
                "Appointment date cannot be in the past".to_string(),
            ));
        }
        if self.start_time >= self.end_time {
            return Err(AppointmentError::ValidationError(
                "Start time must be before end time".to_string(),
            ));
        }
        if self.concerns.trim().is_empty() {
            return Err(AppointmentError::ValidationError(
                "Concerns are required".to_string(),
            ));
        }
        if self.concerns.len() > 200 {
            return Err(AppointmentError::ValidationError(
                "Concerns must be at most 200 characters".to_string(),
            ));
        }
        if self.symptoms.trim().is_empty() {
            return Err(AppointmentError::ValidationError(
                "Symptoms are required".to_string(),
            ));
        }
        if self.symptoms.len() > 200 {
            return Err(AppointmentError::ValidationError(
                "Symptoms must be at most 200 characters".to_string(),
            ));
        }
        if let Some(notes) = &self.patient_notes {
            if notes.len() > 500 {
                return Err(AppointmentError::ValidationError(
                    "Patient notes must be at most 500 characters".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub concerns: Option<String>,
    pub symptoms: Option<String>,
    pub patient_notes: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        if self.concerns.is_none() && self.symptoms.is_none() && self.patient_notes.is_none() {
            return Err(AppointmentError::ValidationError(
                "At least one field must be provided".to_string(),
            ));
        }
        if let Some(concerns) = &self.concerns {
            if concerns.trim().is_empty() || concerns.len() > 200 {
                return Err(AppointmentError::ValidationError(
                    "Concerns must be between 1 and 200 characters".to_string(),
                ));
            }
        }
        if let Some(symptoms) = &self.symptoms {
            if symptoms.trim().is_empty() || symptoms.len() > 200 {
                return Err(AppointmentError::ValidationError(
                    "Symptoms must be between 1 and 200 characters".to_string(),
                ));
            }
        }
        if let Some(notes) = &self.patient_notes {
            if notes.len() > 500 {
                return Err(AppointmentError::ValidationError(
                    "Patient notes must be at most 500 characters".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// One bookable window in a doctor's day.
#[derive(Debug, Clone, Serialize)]
pub struct AvailableSlot {
    #[serde(with = "time_hms")]
    pub start_time: NaiveTime,
    #[serde(with = "time_hms")]
    pub end_time: NaiveTime,
    pub display_time: String,
}

/// Working-day constants for slot enumeration. Per-doctor schedules are not
/// modeled; every doctor shares the same fixed window.
#[derive(Debug, Clone)]
pub struct SchedulingRules {
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub slot_minutes: i64,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            day_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            day_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            slot_minutes: 60,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Time slot is already booked")]
    SlotTaken,

    #[error("You already have an appointment at this time")]
    PatientUnavailable,

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
