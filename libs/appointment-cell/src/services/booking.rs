use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use tracing::info;
use uuid::Uuid;

use shared_database::{AppState, ClinicStore};
use shared_models::auth::{Actor, Role};
use shared_models::records::Appointment;
use shared_models::time::BOOKING_DURATION_MINUTES;

use crate::models::{AppointmentError, BookAppointmentRequest};
use crate::services::policy;

const DEFAULT_BOOKING_NOTE: &str = "appointment requested by patient";

/// The only path that creates appointments. The pre-checks here (profiles,
/// past dates, window shape) run outside the lock; the coverage and
/// double-booking checks run inside the store's write guard so racing
/// bookings for the same window resolve to exactly one winner.
pub struct BookingService {
    store: ClinicStore,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub async fn book_appointment(
        &self,
        actor: Actor,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let patient = self
            .store
            .find_patient_by_user(actor.id)
            .await
            .ok_or(AppointmentError::PatientProfileNotFound)?;

        let doctor = self
            .store
            .find_doctor(request.doctor_id)
            .await
            .ok_or(AppointmentError::DoctorNotFound)?;
        if !doctor.is_available {
            return Err(AppointmentError::DoctorUnavailable);
        }

        reject_past(request.date, request.time)?;
        let end = booking_window_end(request.time)?;

        let notes = request
            .notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BOOKING_NOTE.to_string());

        let appointment = self
            .store
            .reserve_appointment(patient.id, doctor.id, request.date, request.time, end, notes)
            .await?;

        info!(
            "Appointment {} booked: patient {} with doctor {} at {} {}",
            appointment.id, patient.id, doctor.id, appointment.date, appointment.time
        );
        Ok(appointment)
    }

    /// Policy-gated fetch by id.
    pub async fn get_appointment(
        &self,
        actor: Actor,
        appointment_id: Uuid,
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

        Ok(appointment)
    }

    /// A patient may list their own appointments; admins may list anyone's.
    pub async fn appointments_for_patient(
        &self,
        actor: Actor,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let permitted = match actor.role {
            Role::Admin => true,
            Role::Patient => self
                .store
                .find_patient_by_user(actor.id)
                .await
                .is_some_and(|p| p.id == patient_id),
            Role::Doctor => false,
        };
        if !permitted {
            return Err(AppointmentError::NotAuthorized);
        }

        Ok(self.store.appointments_for_patient(patient_id).await)
    }

    /// A doctor may list their own schedule; admins may list anyone's.
    pub async fn appointments_for_doctor(
        &self,
        actor: Actor,
        doctor_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let permitted = match actor.role {
            Role::Admin => true,
            Role::Doctor => self
                .store
                .find_doctor_by_user(actor.id)
                .await
                .is_some_and(|d| d.id == doctor_id),
            Role::Patient => false,
        };
        if !permitted {
            return Err(AppointmentError::NotAuthorized);
        }

        Ok(self.store.appointments_for_doctor(doctor_id).await)
    }
}

/// Booking must target a moment strictly after now (UTC clock).
pub fn reject_past(date: NaiveDate, time: NaiveTime) -> Result<(), AppointmentError> {
    let requested = NaiveDateTime::new(date, time);
    if requested <= Utc::now().naive_utc() {
        return Err(AppointmentError::PastBooking);
    }
    Ok(())
}

/// End of the fixed-duration window. The start must fall on a whole minute,
/// and the window must end before midnight: `NaiveTime` has no 24:00, and a
/// wrapped end of 00:00:00 would order before every slot end.
pub fn booking_window_end(start: NaiveTime) -> Result<NaiveTime, AppointmentError> {
    if start.second() != 0 || start.nanosecond() != 0 {
        return Err(AppointmentError::SubMinuteTime);
    }
    let (end, wrapped) = start.overflowing_add_signed(Duration::minutes(BOOKING_DURATION_MINUTES));
    if wrapped != 0 {
        return Err(AppointmentError::InvalidWindow);
    }
    Ok(end)
}
