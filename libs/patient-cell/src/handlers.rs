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

use crate::models::{PatientError, UpdateMedicalHistoryRequest, UpdatePatientProfileRequest};
use crate::services::{MedicalHistoryService, PatientService};

#[axum::debug_handler]
pub async fn get_own_profile(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let service = PatientService::new(Arc::clone(&state.supabase));

    let patient = service
        .get_patient(user.id, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({ "patient": patient })))
}

#[axum::debug_handler]
pub async fn update_own_profile(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdatePatientProfileRequest>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let service = PatientService::new(Arc::clone(&state.supabase));

    let patient = service
        .update_profile(user.id, request, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "patient": patient
    })))
}

/// Doctor's roster: every patient they share an appointment with.
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let service = PatientService::new(Arc::clone(&state.supabase));

    let patients = service
        .roster_for_doctor(user.id, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "count": patients.len(),
        "patients": patients
    })))
}

#[axum::debug_handler]
pub async fn get_own_medical_history(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let service = MedicalHistoryService::new(Arc::clone(&state.supabase));

    let history = service
        .get_history(user.id, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({ "medical_history": history })))
}

#[axum::debug_handler]
pub async fn update_own_medical_history(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateMedicalHistoryRequest>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let service = MedicalHistoryService::new(Arc::clone(&state.supabase));

    let history = service
        .update_history(user.id, request, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "message": "Medical history updated successfully",
        "medical_history": history
    })))
}

/// Doctor's view of a patient's history plus the patient card, allowed only
/// when they share an appointment.
#[axum::debug_handler]
pub async fn get_patient_medical_history(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let history_service = MedicalHistoryService::new(Arc::clone(&state.supabase));
    let patient_service = PatientService::new(Arc::clone(&state.supabase));

    let history = history_service
        .get_history_for_doctor(patient_id, user.id, auth.token())
        .await
        .map_err(map_patient_error)?;

    let patient = patient_service
        .get_patient(patient_id, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "patient": {
            "first_name": patient.first_name,
            "last_name": patient.last_name,
            "gender": patient.gender,
            "date_of_birth": patient.date_of_birth
        },
        "medical_history": history
    })))
}

fn require_patient(user: &AuthUser) -> Result<(), AppError> {
    match user.role {
        UserRole::Patient => Ok(()),
        UserRole::Doctor => Err(AppError::Forbidden(
            "Only patients can access this resource".to_string(),
        )),
    }
}

fn require_doctor(user: &AuthUser) -> Result<(), AppError> {
    match user.role {
        UserRole::Doctor => Ok(()),
        UserRole::Patient => Err(AppError::Forbidden(
            "Only doctors can access this resource".to_string(),
        )),
    }
}

fn map_patient_error(e: PatientError) -> AppError {
    match e {
        PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
        PatientError::HistoryNotFound => {
            AppError::NotFound("Medical history not found".to_string())
        }
        PatientError::NoSharedAppointments => AppError::Forbidden(
            "Access denied. You do not have appointments with this patient.".to_string(),
        ),
        PatientError::ValidationError(msg) => AppError::ValidationError(msg),
        PatientError::DatabaseError(msg) => AppError::Database(msg),
    }
}
