use tracing::info;
use uuid::Uuid;

use shared_database::{AppState, ClinicStore, StoreError};
use shared_models::auth::Actor;
use shared_models::records::{Appointment, AppointmentStatus};

use crate::models::{AppointmentError, ReprogramRequest, UpdateStatusRequest};
use crate::services::booking::{booking_window_end, reject_past};
use crate::services::policy;

/// The closed transition table. Terminal statuses have no outgoing edges.
pub fn transition_allowed(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    use AppointmentStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed | Cancelled | Reprogrammed)
            | (Confirmed, Cancelled | Completed | Reprogrammed)
            | (Reprogrammed, Confirmed | Cancelled)
    )
}

pub struct LifecycleService {
    store: ClinicStore,
}

impl LifecycleService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    /// Move an appointment through the state machine. Requesting the current
    /// status again is an informational no-op. The store applies the write
    /// only if the status is still what we validated against; a concurrent
    /// change surfaces as `ConcurrentUpdate`.
    pub async fn update_status(
        &self,
        actor: Actor,
        appointment_id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .store
            .find_appointment(appointment_id)
            .await
            .ok_or(AppointmentError::AppointmentNotFound)?;

        let relationship = policy::relationship(&self.store, actor, &appointment).await;
        if !policy::can_read(actor.role, relationship) {
            return Err(AppointmentError::NotAuthorized);
        }

        let current = appointment.status;
        let requested = request.status;

        if requested == current {
            return Ok(appointment);
        }
        if current.is_terminal() {
            return Err(AppointmentError::TerminalStatus(current));
        }
        if !transition_allowed(current, requested) {
            return Err(AppointmentError::InvalidTransition {
                from: current,
                to: requested,
            });
        }
        if !policy::can_transition(actor.role, relationship, requested) {
            return Err(AppointmentError::NotAuthorized);
        }

        let note = format!("{} by {}", requested, actor.role);
        let updated = self
            .store
            .transition_status(appointment_id, current, requested, Some(&note))
            .await
            .map_err(|err| match err {
                StoreError::StaleStatus => AppointmentError::ConcurrentUpdate,
                other => AppointmentError::Store(other),
            })?;

        info!(
            "Appointment {} moved {} -> {} by {}",
            appointment_id, current, requested, actor.role
        );
        Ok(updated)
    }

    /// Move an appointment to a new date/time. Allowed from any non-terminal
    /// status; the new window passes the same coverage and double-booking
    /// checks as an initial booking, and the appointment comes back as
    /// `pending` for re-confirmation.
    pub async fn reprogram(
        &self,
        actor: Actor,
        appointment_id: Uuid,
        request: ReprogramRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .store
            .find_appointment(appointment_id)
            .await
            .ok_or(AppointmentError::AppointmentNotFound)?;

        let relationship = policy::relationship(&self.store, actor, &appointment).await;
        if !policy::can_transition(actor.role, relationship, AppointmentStatus::Reprogrammed) {
            return Err(AppointmentError::NotAuthorized);
        }

        let current = appointment.status;
        if current.is_terminal() {
            return Err(AppointmentError::TerminalStatus(current));
        }

        reject_past(request.date, request.time)?;
        let end = booking_window_end(request.time)?;

        let note = format!("reprogrammed by {}", actor.role);
        let updated = self
            .store
            .reprogram_checked(appointment_id, current, request.date, request.time, end, &note)
            .await
            .map_err(|err| match err {
                StoreError::StaleStatus => AppointmentError::ConcurrentUpdate,
                other => AppointmentError::Store(other),
            })?;

        info!(
            "Appointment {} reprogrammed to {} {} by {}",
            appointment_id, updated.date, updated.time, actor.role
        );
        Ok(updated)
    }
}
