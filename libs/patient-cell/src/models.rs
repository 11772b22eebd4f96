use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape for a doctor's patient roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePatientProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

impl UpdatePatientProfileRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        if self.first_name.is_none()
            && self.last_name.is_none()
            && self.address.is_none()
            && self.phone.is_none()
            && self.date_of_birth.is_none()
        {
            return Err(PatientError::ValidationError(
                "At least one field must be provided".to_string(),
            ));
        }
        if let Some(name) = &self.first_name {
            if name.trim().is_empty() || name.len() > 50 {
                return Err(PatientError::ValidationError(
                    "First name must be between 1 and 50 characters".to_string(),
                ));
            }
        }
        if let Some(name) = &self.last_name {
            if name.trim().is_empty() || name.len() > 50 {
                return Err(PatientError::ValidationError(
                    "Last name must be between 1 and 50 characters".to_string(),
                ));
            }
        }
        if let Some(phone) = &self.phone {
            let phone_regex = regex::Regex::new(r"^[0-9]{10}$").unwrap();
            if !phone_regex.is_match(phone) {
                return Err(PatientError::ValidationError(
                    "Phone must be exactly 10 digits".to_string(),
                ));
            }
        }
        if let Some(address) = &self.address {
            if address.len() > 200 {
                return Err(PatientError::ValidationError(
                    "Address must be at most 200 characters".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Free-text sections, each defaulting to "None" until the patient fills
/// them in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub conditions: String,
    pub surgeries: String,
    pub medications: String,
    pub allergies: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMedicalHistoryRequest {
    pub conditions: Option<String>,
    pub surgeries: Option<String>,
    pub medications: Option<String>,
    pub allergies: Option<String>,
}

impl UpdateMedicalHistoryRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        for (field, value) in [
            ("Conditions", &self.conditions),
            ("Surgeries", &self.surgeries),
            ("Medications", &self.medications),
            ("Allergies", &self.allergies),
        ] {
            if let Some(text) = value {
                if text.len() > 1000 {
                    return Err(PatientError::ValidationError(format!(
                        "{} must be at most 1000 characters",
                        field
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Medical history not found")]
    HistoryNotFound,

    #[error("Access denied. You do not have appointments with this patient.")]
    NoSharedAppointments,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
