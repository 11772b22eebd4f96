// libs/auth-cell/src/services/auth.rs
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{StoreError, SupabaseClient};
use shared_models::auth::{AuthUser, UserRole};
use shared_utils::jwt::issue_token;

use crate::models::{
    AuthError, AuthSession, LoginRequest, RegisterDoctorRequest, RegisterPatientRequest,
    ResetPasswordRequest, SessionUser,
};
use crate::services::password::PasswordService;

const PATIENT_PROFILE_COLUMNS: &str =
    "id,first_name,last_name,email,phone,address,gender,date_of_birth,created_at,updated_at";
const DOCTOR_PROFILE_COLUMNS: &str =
    "id,first_name,last_name,email,phone,gender,specialization,license_number,created_at,updated_at";

#[derive(Debug, Deserialize)]
struct CreatedAccount {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct CredentialRow {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct PasswordRow {
    password: String,
}

pub struct AuthService {
    supabase: Arc<SupabaseClient>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(supabase: Arc<SupabaseClient>, jwt_secret: String) -> Self {
        Self {
            supabase,
            jwt_secret,
        }
    }

    pub async fn register_patient(
        &self,
        request: RegisterPatientRequest,
    ) -> Result<AuthSession, AuthError> {
        request.validate()?;
        self.ensure_email_free("patients", &request.email, UserRole::Patient)
            .await?;

        let password_hash = PasswordService::hash_password(&request.password)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let rows: Vec<CreatedAccount> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/patients",
                None,
                Some(json!({
                    "first_name": request.first_name,
                    "last_name": request.last_name,
                    "email": request.email,
                    "password": password_hash,
                    "phone": request.phone,
                    "address": request.address,
                    "gender": request.gender,
                    "date_of_birth": request.date_of_birth.format("%Y-%m-%d").to_string(),
                })),
                Some(representation_headers()),
            )
            .await
            .map_err(store_error)?;

        let account = rows
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::DatabaseError("Registration returned no rows".to_string()))?;

        // Every patient starts with a blank medical history record.
        self.create_blank_history(account.id).await?;

        info!("Registered patient {}", account.id);
        self.open_session(account, UserRole::Patient)
    }

    pub async fn register_doctor(
        &self,
        request: RegisterDoctorRequest,
    ) -> Result<AuthSession, AuthError> {
        request.validate()?;
        self.ensure_email_free("doctors", &request.email, UserRole::Doctor)
            .await?;

        let password_hash = PasswordService::hash_password(&request.password)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let rows: Vec<CreatedAccount> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctors",
                None,
                Some(json!({
                    "first_name": request.first_name,
                    "last_name": request.last_name,
                    "email": request.email,
                    "password": password_hash,
                    "phone": request.phone,
                    "gender": request.gender,
                    "specialization": request.specialization,
                    "license_number": request.license_number,
                })),
                Some(representation_headers()),
            )
            .await
            .map_err(store_error)?;

        let account = rows
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::DatabaseError("Registration returned no rows".to_string()))?;

        info!("Registered doctor {}", account.id);
        self.open_session(account, UserRole::Doctor)
    }

    /// Checks the patients table first, then doctors; the matching table
    /// decides the role baked into the token.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession, AuthError> {
        let (row, role) = match self.find_credentials("patients", &request.email).await? {
            Some(row) => (row, UserRole::Patient),
            None => match self.find_credentials("doctors", &request.email).await? {
                Some(row) => (row, UserRole::Doctor),
                None => return Err(AuthError::InvalidCredentials),
            },
        };

        let verified = PasswordService::verify_password(&request.password, &row.password)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        debug!("Login for {} as {}", row.id, role);
        self.open_session(
            CreatedAccount {
                id: row.id,
                email: row.email,
                first_name: row.first_name,
                last_name: row.last_name,
            },
            role,
        )
    }

    pub async fn get_profile(&self, user: &AuthUser, token: &str) -> Result<Value, AuthError> {
        let (table, columns) = match user.role {
            UserRole::Patient => ("patients", PATIENT_PROFILE_COLUMNS),
            UserRole::Doctor => ("doctors", DOCTOR_PROFILE_COLUMNS),
        };

        let path = format!("/rest/v1/{}?id=eq.{}&select={}", table, user.id, columns);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(token), None)
            .await
            .map_err(store_error)?;

        rows.into_iter().next().ok_or(AuthError::ProfileNotFound)
    }

    pub async fn reset_password(
        &self,
        user: &AuthUser,
        request: ResetPasswordRequest,
        token: &str,
    ) -> Result<(), AuthError> {
        request.validate()?;

        let table = match user.role {
            UserRole::Patient => "patients",
            UserRole::Doctor => "doctors",
        };

        let path = format!("/rest/v1/{}?id=eq.{}&select=password", table, user.id);
        let rows: Vec<PasswordRow> = self
            .supabase
            .request(Method::GET, &path, Some(token), None)
            .await
            .map_err(store_error)?;
        let row = rows.into_iter().next().ok_or(AuthError::ProfileNotFound)?;

        let verified = PasswordService::verify_password(&request.old_password, &row.password)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
        if !verified {
            return Err(AuthError::IncorrectPassword);
        }

        let password_hash = PasswordService::hash_password(&request.new_password)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let patch_path = format!("/rest/v1/{}?id=eq.{}", table, user.id);
        let _rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &patch_path,
                Some(token),
                Some(json!({ "password": password_hash })),
                Some(representation_headers()),
            )
            .await
            .map_err(store_error)?;

        info!("Password updated for {}", user.id);
        Ok(())
    }

    async fn ensure_email_free(
        &self,
        table: &str,
        email: &str,
        role: UserRole,
    ) -> Result<(), AuthError> {
        let path = format!("/rest/v1/{}?email=eq.{}&select=id", table, email);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(store_error)?;

        if rows.is_empty() {
            Ok(())
        } else {
            Err(AuthError::EmailTaken(role))
        }
    }

    async fn find_credentials(
        &self,
        table: &str,
        email: &str,
    ) -> Result<Option<CredentialRow>, AuthError> {
        let path = format!(
            "/rest/v1/{}?email=eq.{}&select=id,email,first_name,last_name,password",
            table, email
        );
        let rows: Vec<CredentialRow> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().next())
    }

    async fn create_blank_history(&self, patient_id: Uuid) -> Result<(), AuthError> {
        let _rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/medical_history",
                None,
                Some(json!({
                    "patient_id": patient_id,
                    "conditions": "None",
                    "surgeries": "None",
                    "medications": "None",
                    "allergies": "None",
                })),
                Some(representation_headers()),
            )
            .await
            .map_err(store_error)?;

        Ok(())
    }

    fn open_session(
        &self,
        account: CreatedAccount,
        role: UserRole,
    ) -> Result<AuthSession, AuthError> {
        let token = issue_token(account.id, &account.email, role, &self.jwt_secret)
            .map_err(AuthError::Token)?;

        Ok(AuthSession {
            token,
            user: SessionUser {
                name: format!("{} {}", account.first_name, account.last_name),
                email: account.email,
                role,
            },
        })
    }
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

fn store_error(e: StoreError) -> AuthError {
    AuthError::DatabaseError(e.to_string())
}
