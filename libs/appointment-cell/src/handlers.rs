// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{AuthUser, UserRole};
use shared_models::error::AppError;

use crate::models::{AppointmentError, BookAppointmentRequest, UpdateAppointmentRequest};
use crate::services::booking::AppointmentBookingService;
use crate::services::slots::SlotAvailabilityService;

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = auth.token();

    match user.role {
        UserRole::Patient => {}
        UserRole::Doctor => {
            return Err(AppError::Forbidden(
                "Only patients can book appointments".to_string(),
            ));
        }
    }

    let booking_service = AppointmentBookingService::new(Arc::clone(&state.supabase));

    let (appointment, doctor) = booking_service
        .book_appointment(user.id, request, token)
        .await
        .map_err(map_booking_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment booked successfully",
            "appointment": appointment,
            "doctor": {
                "name": doctor.full_name(),
                "specialization": doctor.specialization
            }
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(Arc::clone(&state.supabase));

    let appointments = booking_service
        .list_appointments(&user, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "count": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(Arc::clone(&state.supabase));

    let appointment = booking_service
        .get_appointment(appointment_id, &user, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    match user.role {
        UserRole::Patient => {}
        UserRole::Doctor => {
            return Err(AppError::Forbidden(
                "Only patients can edit appointment details".to_string(),
            ));
        }
    }

    let booking_service = AppointmentBookingService::new(Arc::clone(&state.supabase));

    let appointment = booking_service
        .update_appointment(appointment_id, user.id, request, auth.token())
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound | AppointmentError::InvalidStatusTransition(_) => {
                AppError::NotFound("Appointment not found or cannot be modified".to_string())
            }
            other => map_booking_error(other),
        })?;

    Ok(Json(json!({
        "message": "Appointment updated successfully",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(Arc::clone(&state.supabase));

    booking_service
        .cancel_appointment(appointment_id, &user, auth.token())
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound | AppointmentError::InvalidStatusTransition(_) => {
                AppError::NotFound("Appointment not found or already cancelled".to_string())
            }
            other => map_booking_error(other),
        })?;

    Ok(Json(json!({
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path((doctor_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<Value>, AppError> {
    let slot_service = SlotAvailabilityService::new(Arc::clone(&state.supabase));

    let slots = slot_service
        .available_slots(doctor_id, date, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "date": date,
        "doctor_id": doctor_id,
        "available_slots": slots
    })))
}

fn map_booking_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AppointmentError::SlotTaken => {
            AppError::BadRequest("Time slot is already booked".to_string())
        }
        AppointmentError::PatientUnavailable => {
            AppError::BadRequest("You already have an appointment at this time".to_string())
        }
        AppointmentError::InvalidStatusTransition(status) => AppError::BadRequest(format!(
            "Appointment cannot be modified in current status: {}",
            status
        )),
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}
