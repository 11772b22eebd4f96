use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{AuthUser, UserRole};
use shared_models::error::AppError;

use crate::models::{DiagnosisRequest, DoctorError, UpdateDoctorProfileRequest};
use crate::services::{diagnosis::DiagnosisService, doctor::DoctorService};

// Public directory; no auth required so patients can browse before booking.
#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(Arc::clone(&state.supabase));

    let doctors = doctor_service
        .list_doctors()
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "count": doctors.len(),
        "doctors": doctors
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(Arc::clone(&state.supabase));

    let doctor = doctor_service
        .get_doctor(doctor_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({ "doctor": doctor })))
}

#[axum::debug_handler]
pub async fn get_own_profile(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let doctor_service = DoctorService::new(Arc::clone(&state.supabase));

    let doctor = doctor_service
        .get_doctor(user.id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({ "doctor": doctor })))
}

#[axum::debug_handler]
pub async fn update_own_profile(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateDoctorProfileRequest>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let doctor_service = DoctorService::new(Arc::clone(&state.supabase));

    let doctor = doctor_service
        .update_profile(user.id, request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn submit_diagnosis(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<DiagnosisRequest>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let diagnosis_service = DiagnosisService::new(Arc::clone(&state.supabase));

    let (appointment, diagnosis) = diagnosis_service
        .submit_diagnosis(appointment_id, user.id, request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "message": "Diagnosis submitted successfully",
        "appointment": appointment,
        "diagnosis": diagnosis
    })))
}

fn require_doctor(user: &AuthUser) -> Result<(), AppError> {
    match user.role {
        UserRole::Doctor => Ok(()),
        UserRole::Patient => Err(AppError::Forbidden(
            "Only doctors can access this resource".to_string(),
        )),
    }
}

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::AppointmentNotFound => {
            AppError::NotFound("Appointment not found".to_string())
        }
        DoctorError::InvalidAppointmentStatus(status) => AppError::BadRequest(format!(
            "Appointment is not open for diagnosis: {}",
            status
        )),
        DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}
