use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppState>) -> Router {
    // The directory is public; everything else needs a token. The literal
    // "profile" segment wins over the "{doctor_id}" capture.
    let public_routes = Router::new().route("/", get(handlers::list_doctors));

    let protected_routes = Router::new()
        .route("/profile", get(handlers::get_own_profile))
        .route("/profile", put(handlers::update_own_profile))
        .route("/diagnose/{appointment_id}", post(handlers::submit_diagnosis))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
