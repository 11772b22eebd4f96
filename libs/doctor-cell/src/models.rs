use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::models::AppointmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
    pub specialization: String,
    pub license_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape for the public directory; no contact details beyond email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorListing {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialization: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDoctorProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
}

impl UpdateDoctorProfileRequest {
    pub fn validate(&self) -> Result<(), DoctorError> {
        if self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.specialization.is_none()
        {
            return Err(DoctorError::ValidationError(
                "At least one field must be provided".to_string(),
            ));
        }
        if let Some(name) = &self.first_name {
            if name.trim().is_empty() || name.len() > 50 {
                return Err(DoctorError::ValidationError(
                    "First name must be between 1 and 50 characters".to_string(),
                ));
            }
        }
        if let Some(name) = &self.last_name {
            if name.trim().is_empty() || name.len() > 50 {
                return Err(DoctorError::ValidationError(
                    "Last name must be between 1 and 50 characters".to_string(),
                ));
            }
        }
        if let Some(phone) = &self.phone {
            let phone_regex = regex::Regex::new(r"^[0-9]{10}$").unwrap();
            if !phone_regex.is_match(phone) {
                return Err(DoctorError::ValidationError(
                    "Phone must be exactly 10 digits".to_string(),
                ));
            }
        }
        if let Some(specialization) = &self.specialization {
            if specialization.trim().is_empty() || specialization.len() > 100 {
                return Err(DoctorError::ValidationError(
                    "Specialization must be between 1 and 100 characters".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct DiagnosisRequest {
    pub diagnosis: String,
    pub prescription: String,
    #[serde(default)]
    pub doctor_notes: Option<String>,
}

impl DiagnosisRequest {
    pub fn validate(&self) -> Result<(), DoctorError> {
        if self.diagnosis.trim().len() < 5 || self.diagnosis.len() > 200 {
            return Err(DoctorError::ValidationError(
                "Diagnosis must be between 5 and 200 characters".to_string(),
            ));
        }
        if self.prescription.trim().len() < 5 || self.prescription.len() > 200 {
            return Err(DoctorError::ValidationError(
                "Prescription must be between 5 and 200 characters".to_string(),
            ));
        }
        if let Some(notes) = &self.doctor_notes {
            if notes.len() > 500 {
                return Err(DoctorError::ValidationError(
                    "Doctor notes must be at most 500 characters".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Appointment is not open for diagnosis: {0}")]
    InvalidAppointmentStatus(AppointmentStatus),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
