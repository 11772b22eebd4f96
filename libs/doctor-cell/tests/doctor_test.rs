use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::{DoctorError, UpdateDoctorProfileRequest};
use doctor_cell::services::DoctorService;
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockStoreResponses, TestConfig};

const TOKEN: &str = "test-token";

fn store_client(server: &MockServer) -> Arc<SupabaseClient> {
    let config = TestConfig::with_store_url(&server.uri()).to_app_config();
    Arc::new(SupabaseClient::new(&config))
}

#[tokio::test]
async fn get_doctor_returns_profile_without_password() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([MockStoreResponses::doctor_row(doctor_id)])),
        )
        .mount(&server)
        .await;

    let service = DoctorService::new(store_client(&server));
    let doctor = service.get_doctor(doctor_id, TOKEN).await.unwrap();

    assert_eq!(doctor.id, doctor_id);
    assert_eq!(doctor.first_name, "Greta");
    assert_eq!(doctor.last_name, "House");
    assert_eq!(doctor.specialization, "Cardiology");
}

#[tokio::test]
async fn unknown_doctor_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = DoctorService::new(store_client(&server));
    let result = service.get_doctor(Uuid::new_v4(), TOKEN).await;

    assert_matches!(result, Err(DoctorError::NotFound));
}

#[tokio::test]
async fn listing_doctors_returns_the_roster() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param(
            "order",
            "specialization.asc,first_name.asc,last_name.asc",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": Uuid::new_v4(),
                "first_name": "Greta",
                "last_name": "House",
                "email": "greta.house@example.com",
                "specialization": "Cardiology"
            },
            {
                "id": Uuid::new_v4(),
                "first_name": "James",
                "last_name": "Wilson",
                "email": "james.wilson@example.com",
                "specialization": "Oncology"
            }
        ])))
        .mount(&server)
        .await;

    let service = DoctorService::new(store_client(&server));
    let doctors = service.list_doctors().await.unwrap();

    assert_eq!(doctors.len(), 2);
    assert_eq!(doctors[0].specialization, "Cardiology");
}

#[tokio::test]
async fn updating_profile_patches_the_row() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([MockStoreResponses::doctor_row(doctor_id)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = UpdateDoctorProfileRequest {
        first_name: None,
        last_name: None,
        phone: Some("5559998888".to_string()),
        specialization: None,
    };

    let service = DoctorService::new(store_client(&server));
    let doctor = service.update_profile(doctor_id, request, TOKEN).await.unwrap();

    assert_eq!(doctor.id, doctor_id);
}

#[test]
fn profile_update_rejects_bad_phone_numbers() {
    for phone in ["12345", "555000111122", "555-000-1111"] {
        let request = UpdateDoctorProfileRequest {
            first_name: None,
            last_name: None,
            phone: Some(phone.to_string()),
            specialization: None,
        };
        assert_matches!(request.validate(), Err(DoctorError::ValidationError(_)));
    }
}

#[test]
fn profile_update_requires_at_least_one_field() {
    let request = UpdateDoctorProfileRequest {
        first_name: None,
        last_name: None,
        phone: None,
        specialization: None,
    };
    assert!(request.validate().is_err());
}
