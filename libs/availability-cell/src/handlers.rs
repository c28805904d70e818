use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{Actor, Role};
use shared_models::error::AppError;

use crate::models::{NewAvailabilitySlot, UpdateAvailabilitySlot};
use crate::services::slots::AvailabilityService;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<NaiveDate>,
}

fn require_doctor(actor: Actor) -> Result<(), AppError> {
    if actor.role != Role::Doctor {
        return Err(AppError::Forbidden(
            "only doctors can manage availability".to_string(),
        ));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn submit_availability(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(slots): Json<Vec<NewAvailabilitySlot>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_doctor(actor)?;

    if slots.is_empty() {
        return Err(AppError::Validation("no slots supplied".to_string()));
    }

    let service = AvailabilityService::new(&state);
    let created = service.submit_slots(actor, slots).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "slots": created,
            "total": created.len()
        })),
    ))
}

#[axum::debug_handler]
pub async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<UpdateAvailabilitySlot>,
) -> Result<Json<Value>, AppError> {
    require_doctor(actor)?;

    let service = AvailabilityService::new(&state);
    let updated = service.update_slot(actor, slot_id, request).await?;

    Ok(Json(json!(updated)))
}

#[axum::debug_handler]
pub async fn delete_availability(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    require_doctor(actor)?;

    let service = AvailabilityService::new(&state);
    service.delete_slot(actor, slot_id).await?;

    Ok(Json(json!({ "success": true })))
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let slots = service.query_slots(doctor_id, query.date).await;

    if slots.is_empty() {
        return Err(AppError::NotFound(
            "no availability found for this doctor".to_string(),
        ));
    }

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "slots": slots,
        "total": slots.len()
    })))
}
