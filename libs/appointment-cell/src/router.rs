use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    let auth_state = Arc::new(state.config.clone());

    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_status))
        .route(
            "/{appointment_id}/reprogram",
            patch(handlers::reprogram_appointment),
        )
        .route(
            "/patients/{patient_id}",
            get(handlers::list_patient_appointments),
        )
        .route(
            "/doctors/{doctor_id}",
            get(handlers::list_doctor_appointments),
        )
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(state)
}
