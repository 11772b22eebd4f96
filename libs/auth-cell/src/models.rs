// libs/auth-cell/src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::auth::UserRole;

fn valid_email(email: &str) -> bool {
    let email_regex = regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    email_regex.is_match(email)
}

fn valid_phone(phone: &str) -> bool {
    let phone_regex = regex::Regex::new(r"^[0-9]{10}$").unwrap();
    phone_regex.is_match(phone)
}

fn validate_name(value: &str, field: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::ValidationError(format!(
            "{} is required",
            field
        )));
    }
    if value.len() > 50 {
        return Err(AuthError::ValidationError(format!(
            "{} must be at most 50 characters",
            field
        )));
    }
    Ok(())
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if !valid_email(email) {
        return Err(AuthError::ValidationError(
            "A valid email address is required".to_string(),
        ));
    }
    if password.len() < 6 {
        return Err(AuthError::ValidationError(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct RegisterPatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    pub gender: String,
    pub date_of_birth: NaiveDate,
}

impl RegisterPatientRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        validate_name(&self.first_name, "First name")?;
        validate_name(&self.last_name, "Last name")?;
        validate_credentials(&self.email, &self.password)?;

        if !valid_phone(&self.phone) {
            return Err(AuthError::ValidationError(
                "Phone number must be exactly 10 digits".to_string(),
            ));
        }

        if self.gender.trim().is_empty() {
            return Err(AuthError::ValidationError(
                "Gender is required".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterDoctorRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub gender: String,
    pub specialization: String,
    pub license_number: String,
}

impl RegisterDoctorRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        validate_name(&self.first_name, "First name")?;
        validate_name(&self.last_name, "Last name")?;
        validate_credentials(&self.email, &self.password)?;

        if !valid_phone(&self.phone) {
            return Err(AuthError::ValidationError(
                "Phone number must be exactly 10 digits".to_string(),
            ));
        }

        if self.specialization.trim().is_empty() || self.specialization.len() > 100 {
            return Err(AuthError::ValidationError(
                "Specialization must be between 1 and 100 characters".to_string(),
            ));
        }

        if self.license_number.trim().is_empty() {
            return Err(AuthError::ValidationError(
                "License number is required".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.new_password.len() < 6 {
            return Err(AuthError::ValidationError(
                "Password must be at least 6 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Public shape of an authenticated account, returned alongside a token.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("An account with this email already exists")]
    EmailTaken(UserRole),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
