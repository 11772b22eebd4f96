use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn patient_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_patients))
        .route("/profile", get(handlers::get_own_profile))
        .route("/profile", put(handlers::update_own_profile))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn medical_history_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::get_own_medical_history))
        .route("/", put(handlers::update_own_medical_history))
        .route("/patient/{patient_id}", get(handlers::get_patient_medical_history))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
