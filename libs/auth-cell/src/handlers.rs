// libs/auth-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::{AuthUser, UserRole};
use shared_models::error::AppError;

use crate::models::{
    AuthError, LoginRequest, RegisterDoctorRequest, RegisterPatientRequest, ResetPasswordRequest,
};
use crate::services::AuthService;

fn auth_service(state: &Arc<AppState>) -> AuthService {
    AuthService::new(
        Arc::clone(&state.supabase),
        state.config.supabase_jwt_secret.clone(),
    )
}

#[axum::debug_handler]
pub async fn register_patient(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterPatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let session = auth_service(&state)
        .register_patient(request)
        .await
        .map_err(map_auth_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": session.token,
            "user": session.user
        })),
    ))
}

#[axum::debug_handler]
pub async fn register_doctor(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let session = auth_service(&state)
        .register_doctor(request)
        .await
        .map_err(map_auth_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": session.token,
            "user": session.user
        })),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let session = auth_service(&state)
        .login(request)
        .await
        .map_err(map_auth_error)?;

    Ok(Json(json!({
        "token": session.token,
        "user": session.user
    })))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let profile = auth_service(&state)
        .get_profile(&user, auth.token())
        .await
        .map_err(map_auth_error)?;

    Ok(Json(json!({
        "role": user.role,
        "profile": profile
    })))
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    auth_service(&state)
        .reset_password(&user, request, auth.token())
        .await
        .map_err(map_auth_error)?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

// Tokens are stateless, so logout is a client-side affair.
#[axum::debug_handler]
pub async fn logout() -> Json<Value> {
    Json(json!({ "message": "Logged out successfully" }))
}

fn map_auth_error(e: AuthError) -> AppError {
    match e {
        AuthError::EmailTaken(UserRole::Patient) => {
            AppError::BadRequest("Patient with this email already exists".to_string())
        }
        AuthError::EmailTaken(UserRole::Doctor) => {
            AppError::BadRequest("Doctor with this email already exists".to_string())
        }
        AuthError::InvalidCredentials => AppError::Auth("Invalid credentials".to_string()),
        AuthError::IncorrectPassword => {
            AppError::BadRequest("Current password is incorrect".to_string())
        }
        AuthError::ProfileNotFound => AppError::NotFound("Profile not found".to_string()),
        AuthError::ValidationError(msg) => AppError::ValidationError(msg),
        AuthError::Token(msg) => AppError::Internal(msg),
        AuthError::PasswordHash(msg) => AppError::Internal(msg),
        AuthError::DatabaseError(msg) => AppError::Database(msg),
    }
}
