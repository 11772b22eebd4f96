use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{
    AppointmentError, AppointmentStatus, BookAppointmentRequest, UpdateAppointmentRequest,
};
use appointment_cell::services::booking::AppointmentBookingService;
use appointment_cell::services::slots::SlotAvailabilityService;
use shared_database::SupabaseClient;
use shared_models::auth::UserRole;
use shared_utils::test_utils::{MockStoreResponses, TestConfig, TestUser};

const TOKEN: &str = "test-token";

fn store_client(server: &MockServer) -> Arc<SupabaseClient> {
    let config = TestConfig::with_store_url(&server.uri()).to_app_config();
    Arc::new(SupabaseClient::new(&config))
}

fn upcoming_date() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(7)
}

fn booking_request(doctor_id: Uuid, date: NaiveDate) -> BookAppointmentRequest {
    serde_json::from_value(json!({
        "doctor_id": doctor_id,
        "appointment_date": date.format("%Y-%m-%d").to_string(),
        "start_time": "10:00",
        "end_time": "11:00",
        "concerns": "Recurring headaches",
        "symptoms": "Headache, dizziness"
    }))
    .unwrap()
}

async fn mock_doctor_lookup(server: &MockServer, doctor_id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([MockStoreResponses::doctor_row(doctor_id)])),
        )
        .mount(server)
        .await;
}

async fn mock_calendar(server: &MockServer, owner_column: &str, owner_id: Uuid, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param(owner_column, format!("eq.{}", owner_id)))
        .and(query_param("status", "neq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

#[tokio::test]
async fn booking_succeeds_when_both_calendars_are_free() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let date = upcoming_date();
    let date_str = date.format("%Y-%m-%d").to_string();

    mock_doctor_lookup(&server, doctor_id).await;
    mock_calendar(&server, "doctor_id", doctor_id, json!([])).await;
    mock_calendar(&server, "patient_id", patient_id, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::appointment_row(
                patient_id,
                doctor_id,
                &date_str,
                "10:00:00",
                "11:00:00",
                "scheduled"
            )
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/diagnoses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::diagnosis_row(Uuid::new_v4(), doctor_id)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let service = AppointmentBookingService::new(store_client(&server));
    let (appointment, doctor) = service
        .book_appointment(patient_id, booking_request(doctor_id, date), TOKEN)
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(appointment.doctor_id, doctor_id);
    assert_eq!(doctor.id, doctor_id);
    assert_eq!(doctor.specialization, "Cardiology");
}

#[tokio::test]
async fn booking_fails_for_unknown_doctor() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = AppointmentBookingService::new(store_client(&server));
    let result = service
        .book_appointment(Uuid::new_v4(), booking_request(doctor_id, upcoming_date()), TOKEN)
        .await;

    assert_matches!(result, Err(AppointmentError::DoctorNotFound));
}

#[tokio::test]
async fn booking_rejects_doctor_conflict() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let date = upcoming_date();
    let date_str = date.format("%Y-%m-%d").to_string();

    mock_doctor_lookup(&server, doctor_id).await;
    mock_calendar(
        &server,
        "doctor_id",
        doctor_id,
        json!([MockStoreResponses::appointment_row(
            Uuid::new_v4(),
            doctor_id,
            &date_str,
            "10:30:00",
            "11:30:00",
            "scheduled"
        )]),
    )
    .await;

    let service = AppointmentBookingService::new(store_client(&server));
    let result = service
        .book_appointment(patient_id, booking_request(doctor_id, date), TOKEN)
        .await;

    assert_matches!(result, Err(AppointmentError::SlotTaken));
}

#[tokio::test]
async fn booking_rejects_patient_double_booking() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let other_doctor = Uuid::new_v4();
    let date = upcoming_date();
    let date_str = date.format("%Y-%m-%d").to_string();

    mock_doctor_lookup(&server, doctor_id).await;
    mock_calendar(&server, "doctor_id", doctor_id, json!([])).await;
    mock_calendar(
        &server,
        "patient_id",
        patient_id,
        json!([MockStoreResponses::appointment_row(
            patient_id,
            other_doctor,
            &date_str,
            "10:00:00",
            "11:00:00",
            "scheduled"
        )]),
    )
    .await;

    let service = AppointmentBookingService::new(store_client(&server));
    let result = service
        .book_appointment(patient_id, booking_request(doctor_id, date), TOKEN)
        .await;

    assert_matches!(result, Err(AppointmentError::PatientUnavailable));
}

#[tokio::test]
async fn back_to_back_booking_is_allowed() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let date = upcoming_date();
    let date_str = date.format("%Y-%m-%d").to_string();

    mock_doctor_lookup(&server, doctor_id).await;
    // Existing appointment ends exactly when the new one starts.
    mock_calendar(
        &server,
        "doctor_id",
        doctor_id,
        json!([MockStoreResponses::appointment_row(
            Uuid::new_v4(),
            doctor_id,
            &date_str,
            "09:00:00",
            "10:00:00",
            "scheduled"
        )]),
    )
    .await;
    mock_calendar(&server, "patient_id", patient_id, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::appointment_row(
                patient_id,
                doctor_id,
                &date_str,
                "10:00:00",
                "11:00:00",
                "scheduled"
            )
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/diagnoses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::diagnosis_row(Uuid::new_v4(), doctor_id)
        ])))
        .mount(&server)
        .await;

    let service = AppointmentBookingService::new(store_client(&server));
    let result = service
        .book_appointment(patient_id, booking_request(doctor_id, date), TOKEN)
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn lost_insert_race_reports_slot_taken() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let date = upcoming_date();

    mock_doctor_lookup(&server, doctor_id).await;
    mock_calendar(&server, "doctor_id", doctor_id, json!([])).await;
    mock_calendar(&server, "patient_id", patient_id, json!([])).await;

    // Both sequential checks passed, but the exclusion constraint rejects
    // the insert.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_string(
            r#"{"code":"23P01","message":"conflicting key value violates exclusion constraint"}"#,
        ))
        .mount(&server)
        .await;

    let service = AppointmentBookingService::new(store_client(&server));
    let result = service
        .book_appointment(patient_id, booking_request(doctor_id, date), TOKEN)
        .await;

    assert_matches!(result, Err(AppointmentError::SlotTaken));
}

#[tokio::test]
async fn cancelling_a_scheduled_appointment_succeeds() {
    let server = MockServer::start().await;
    let user = TestUser::patient("ada@example.com");
    let appointment_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let date_str = upcoming_date().format("%Y-%m-%d").to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                user.id,
                doctor_id,
                &date_str,
                "10:00:00",
                "11:00:00",
                "scheduled"
            )
        ])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                user.id,
                doctor_id,
                &date_str,
                "10:00:00",
                "11:00:00",
                "cancelled"
            )
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let service = AppointmentBookingService::new(store_client(&server));
    let cancelled = service
        .cancel_appointment(appointment_id, &user.to_auth_user(), TOKEN)
        .await
        .unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn cancelling_a_completed_appointment_is_rejected() {
    let server = MockServer::start().await;
    let user = TestUser::patient("ada@example.com");
    let appointment_id = Uuid::new_v4();
    let date_str = upcoming_date().format("%Y-%m-%d").to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                user.id,
                Uuid::new_v4(),
                &date_str,
                "10:00:00",
                "11:00:00",
                "completed"
            )
        ])))
        .mount(&server)
        .await;

    let service = AppointmentBookingService::new(store_client(&server));
    let result = service
        .cancel_appointment(appointment_id, &user.to_auth_user(), TOKEN)
        .await;

    assert_matches!(
        result,
        Err(AppointmentError::InvalidStatusTransition(AppointmentStatus::Completed))
    );
}

#[tokio::test]
async fn updating_a_cancelled_appointment_is_rejected() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let date_str = upcoming_date().format("%Y-%m-%d").to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                patient_id,
                Uuid::new_v4(),
                &date_str,
                "10:00:00",
                "11:00:00",
                "cancelled"
            )
        ])))
        .mount(&server)
        .await;

    let request = UpdateAppointmentRequest {
        concerns: Some("Updated concerns".to_string()),
        symptoms: None,
        patient_notes: None,
    };

    let service = AppointmentBookingService::new(store_client(&server));
    let result = service
        .update_appointment(appointment_id, patient_id, request, TOKEN)
        .await;

    assert_matches!(
        result,
        Err(AppointmentError::InvalidStatusTransition(AppointmentStatus::Cancelled))
    );
}

#[tokio::test]
async fn missing_appointment_is_not_found() {
    let server = MockServer::start().await;
    let user = TestUser::patient("ada@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = AppointmentBookingService::new(store_client(&server));
    let result = service
        .cancel_appointment(Uuid::new_v4(), &user.to_auth_user(), TOKEN)
        .await;

    assert_matches!(result, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn available_slots_exclude_booked_windows() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let date = upcoming_date();
    let date_str = date.format("%Y-%m-%d").to_string();

    mock_calendar(
        &server,
        "doctor_id",
        doctor_id,
        json!([
            MockStoreResponses::appointment_row(
                Uuid::new_v4(),
                doctor_id,
                &date_str,
                "10:00:00",
                "11:00:00",
                "scheduled"
            ),
            // Straddles two hourly windows.
            MockStoreResponses::appointment_row(
                Uuid::new_v4(),
                doctor_id,
                &date_str,
                "14:30:00",
                "15:30:00",
                "scheduled"
            )
        ]),
    )
    .await;

    let service = SlotAvailabilityService::new(store_client(&server));
    let slots = service.available_slots(doctor_id, date, TOKEN).await.unwrap();

    let labels: Vec<&str> = slots.iter().map(|s| s.display_time.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "9:00 - 10:00",
            "11:00 - 12:00",
            "12:00 - 13:00",
            "13:00 - 14:00",
            "16:00 - 17:00"
        ]
    );
}

#[tokio::test]
async fn empty_calendar_offers_the_full_day() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    mock_calendar(&server, "doctor_id", doctor_id, json!([])).await;

    let service = SlotAvailabilityService::new(store_client(&server));
    let slots = service
        .available_slots(doctor_id, upcoming_date(), TOKEN)
        .await
        .unwrap();

    assert_eq!(slots.len(), 8);
    assert_eq!(slots[0].display_time, "9:00 - 10:00");
}

#[tokio::test]
async fn rebooking_a_cancelled_window_succeeds() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let date = upcoming_date();
    let date_str = date.format("%Y-%m-%d").to_string();

    mock_doctor_lookup(&server, doctor_id).await;
    mock_calendar(&server, "doctor_id", doctor_id, json!([])).await;
    mock_calendar(&server, "patient_id", patient_id, json!([])).await;

    // Catch-all for calendar reads that omit the cancelled filter: a
    // cancelled appointment still occupies the requested window. Only a
    // query carrying status=neq.cancelled reaches the empty mocks above.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                patient_id,
                doctor_id,
                &date_str,
                "10:00:00",
                "11:00:00",
                "cancelled"
            )
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::appointment_row(
                patient_id,
                doctor_id,
                &date_str,
                "10:00:00",
                "11:00:00",
                "scheduled"
            )
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/diagnoses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::diagnosis_row(Uuid::new_v4(), doctor_id)
        ])))
        .mount(&server)
        .await;

    let service = AppointmentBookingService::new(store_client(&server));
    let (appointment, _) = service
        .book_appointment(patient_id, booking_request(doctor_id, date), TOKEN)
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn slots_over_cancelled_appointments_stay_available() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let date = upcoming_date();
    let date_str = date.format("%Y-%m-%d").to_string();

    mock_calendar(&server, "doctor_id", doctor_id, json!([])).await;

    // Without the cancelled filter this row would blank out the morning.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                Uuid::new_v4(),
                doctor_id,
                &date_str,
                "09:00:00",
                "12:00:00",
                "cancelled"
            )
        ])))
        .mount(&server)
        .await;

    let service = SlotAvailabilityService::new(store_client(&server));
    let slots = service.available_slots(doctor_id, date, TOKEN).await.unwrap();

    assert_eq!(slots.len(), 8);
    assert_eq!(slots[0].display_time, "9:00 - 10:00");
}

#[tokio::test]
async fn list_appointments_uses_the_callers_role_column() {
    let server = MockServer::start().await;
    let doctor = TestUser::doctor("greta@example.com");
    let date_str = upcoming_date().format("%Y-%m-%d").to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_row(
                Uuid::new_v4(),
                doctor.id,
                &date_str,
                "10:00:00",
                "11:00:00",
                "scheduled"
            )
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let service = AppointmentBookingService::new(store_client(&server));
    let appointments = service
        .list_appointments(&doctor.to_auth_user(), TOKEN)
        .await
        .unwrap();

    assert_eq!(appointments.len(), 1);
    assert_eq!(doctor.role, UserRole::Doctor);
}
