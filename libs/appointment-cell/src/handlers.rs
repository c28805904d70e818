use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{Actor, Role};
use shared_models::error::AppError;

use crate::models::{BookAppointmentRequest, ReprogramRequest, UpdateStatusRequest};
use crate::services::booking::BookingService;
use crate::services::lifecycle::LifecycleService;

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if actor.role != Role::Patient {
        return Err(AppError::Forbidden(
            "only patients can book appointments".to_string(),
        ));
    }

    let service = BookingService::new(&state);
    let appointment = service.book_appointment(actor, request).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let appointment = service.get_appointment(actor, appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = LifecycleService::new(&state);
    let appointment = service.update_status(actor, appointment_id, request).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn reprogram_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReprogramRequest>,
) -> Result<Json<Value>, AppError> {
    let service = LifecycleService::new(&state);
    let appointment = service.reprogram(actor, appointment_id, request).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_patient_appointments(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let appointments = service.appointments_for_patient(actor, patient_id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let appointments = service.appointments_for_doctor(actor, doctor_id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}
