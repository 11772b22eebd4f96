use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::models::{
    AuthError, LoginRequest, RegisterPatientRequest, ResetPasswordRequest,
};
use auth_cell::services::{AuthService, PasswordService};
use shared_database::SupabaseClient;
use shared_models::auth::UserRole;
use shared_utils::jwt::validate_token;
use shared_utils::test_utils::{TestConfig, TestUser};

const TOKEN: &str = "test-token";

fn auth_service(server: &MockServer) -> AuthService {
    let test_config = TestConfig::with_store_url(&server.uri());
    let config = test_config.to_app_config();
    AuthService::new(
        Arc::new(SupabaseClient::new(&config)),
        test_config.jwt_secret,
    )
}

fn register_request(email: &str) -> RegisterPatientRequest {
    serde_json::from_value(json!({
        "first_name": "Ada",
        "last_name": "Morris",
        "email": email,
        "password": "sup3r-secret",
        "phone": "5552223333",
        "gender": "female",
        "date_of_birth": "1990-01-01"
    }))
    .unwrap()
}

fn credential_row(id: Uuid, email: &str, password_hash: &str) -> serde_json::Value {
    json!({
        "id": id,
        "email": email,
        "first_name": "Ada",
        "last_name": "Morris",
        "password": password_hash
    })
}

#[tokio::test]
async fn registration_creates_account_history_and_token() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("email", "eq.ada@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": patient_id,
            "email": "ada@example.com",
            "first_name": "Ada",
            "last_name": "Morris"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    // The blank history row is created in the same flow.
    Mock::given(method("POST"))
        .and(path("/rest/v1/medical_history"))
        .and(body_partial_json(json!({
            "patient_id": patient_id,
            "conditions": "None",
            "surgeries": "None",
            "medications": "None",
            "allergies": "None"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "patient_id": patient_id
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let service = auth_service(&server);
    let session = service
        .register_patient(register_request("ada@example.com"))
        .await
        .unwrap();

    assert_eq!(session.user.email, "ada@example.com");
    assert_eq!(session.user.name, "Ada Morris");
    assert_eq!(session.user.role, UserRole::Patient);

    // The issued token round-trips through our own validator.
    let secret = TestConfig::default().jwt_secret;
    let auth_user = validate_token(&session.token, &secret).unwrap();
    assert_eq!(auth_user.id, patient_id);
    assert_eq!(auth_user.role, UserRole::Patient);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::new_v4() }])),
        )
        .mount(&server)
        .await;

    let service = auth_service(&server);
    let result = service
        .register_patient(register_request("ada@example.com"))
        .await;

    assert_matches!(result, Err(AuthError::EmailTaken(UserRole::Patient)));
}

#[test]
fn registration_enforces_field_rules() {
    let mut request = register_request("not-an-email");
    assert_matches!(request.validate(), Err(AuthError::ValidationError(_)));

    request = register_request("ada@example.com");
    request.password = "short".to_string();
    assert!(request.validate().is_err());

    request = register_request("ada@example.com");
    request.phone = "555".to_string();
    assert!(request.validate().is_err());

    assert!(register_request("ada@example.com").validate().is_ok());
}

#[tokio::test]
async fn login_matches_patients_before_doctors() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let hash = PasswordService::hash_password("sup3r-secret").unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("email", "eq.ada@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            credential_row(patient_id, "ada@example.com", &hash)
        ])))
        .mount(&server)
        .await;

    let service = auth_service(&server);
    let session = service
        .login(LoginRequest {
            email: "ada@example.com".to_string(),
            password: "sup3r-secret".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(session.user.role, UserRole::Patient);
    let secret = TestConfig::default().jwt_secret;
    assert_eq!(validate_token(&session.token, &secret).unwrap().id, patient_id);
}

#[tokio::test]
async fn login_falls_back_to_the_doctors_table() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let hash = PasswordService::hash_password("sup3r-secret").unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("email", "eq.greta@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            credential_row(doctor_id, "greta@example.com", &hash)
        ])))
        .mount(&server)
        .await;

    let service = auth_service(&server);
    let session = service
        .login(LoginRequest {
            email: "greta@example.com".to_string(),
            password: "sup3r-secret".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(session.user.role, UserRole::Doctor);
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    let server = MockServer::start().await;
    let hash = PasswordService::hash_password("sup3r-secret").unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            credential_row(Uuid::new_v4(), "ada@example.com", &hash)
        ])))
        .mount(&server)
        .await;

    let service = auth_service(&server);
    let result = service
        .login(LoginRequest {
            email: "ada@example.com".to_string(),
            password: "wrong-password".to_string(),
        })
        .await;

    assert_matches!(result, Err(AuthError::InvalidCredentials));
}

#[tokio::test]
async fn unknown_email_is_invalid_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = auth_service(&server);
    let result = service
        .login(LoginRequest {
            email: "nobody@example.com".to_string(),
            password: "whatever-this-is".to_string(),
        })
        .await;

    assert_matches!(result, Err(AuthError::InvalidCredentials));
}

#[tokio::test]
async fn password_reset_requires_the_current_password() {
    let server = MockServer::start().await;
    let user = TestUser::patient("ada@example.com");
    let hash = PasswordService::hash_password("old-password").unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "password": hash }])),
        )
        .mount(&server)
        .await;

    let service = auth_service(&server);
    let result = service
        .reset_password(
            &user.to_auth_user(),
            ResetPasswordRequest {
                old_password: "not-the-old-password".to_string(),
                new_password: "brand-new-secret".to_string(),
            },
            TOKEN,
        )
        .await;

    assert_matches!(result, Err(AuthError::IncorrectPassword));
}

#[tokio::test]
async fn password_reset_patches_the_stored_hash() {
    let server = MockServer::start().await;
    let user = TestUser::patient("ada@example.com");
    let hash = PasswordService::hash_password("old-password").unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "password": hash }])),
        )
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": user.id }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = auth_service(&server);
    let result = service
        .reset_password(
            &user.to_auth_user(),
            ResetPasswordRequest {
                old_password: "old-password".to_string(),
                new_password: "brand-new-secret".to_string(),
            },
            TOKEN,
        )
        .await;

    assert!(result.is_ok());
}
