use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::records::{Appointment, AppointmentStatus, AvailabilitySlot, Doctor, Patient};
use shared_models::time::{day_of_week, ranges_overlap};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("doctor not found")]
    DoctorNotFound,

    #[error("patient profile not found")]
    PatientNotFound,

    #[error("availability slot not found")]
    SlotNotFound,

    #[error("appointment not found")]
    AppointmentNotFound,

    #[error("slot {new_start}-{new_end} on {date} overlaps existing slot {existing_start}-{existing_end}")]
    SlotOverlap {
        date: NaiveDate,
        existing_start: NaiveTime,
        existing_end: NaiveTime,
        new_start: NaiveTime,
        new_end: NaiveTime,
    },

    #[error("no availability for requested window")]
    NoCoveringSlot,

    #[error("slot already booked")]
    AlreadyBooked,

    #[error("appointment status changed concurrently")]
    StaleStatus,
}

/// A slot as submitted by a doctor, before it gets an id.
#[derive(Debug, Clone)]
pub struct SlotCandidate {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Full replacement fields for a slot update; `is_available` keeps its
/// current value when not supplied.
#[derive(Debug, Clone)]
pub struct SlotUpdate {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: Option<bool>,
}

#[derive(Debug, Default)]
struct Tables {
    doctors: HashMap<Uuid, Doctor>,
    patients: HashMap<Uuid, Patient>,
    slots: HashMap<Uuid, AvailabilitySlot>,
    appointments: HashMap<Uuid, Appointment>,
}

/// The two relational tables (slots, appointments) plus the externally owned
/// doctor/patient profiles this core reads.
///
/// Every compound check-then-act operation runs to completion inside a single
/// write guard, so concurrent writers are serialized: at most one booking can
/// claim a (doctor, date, time) tuple, and slot overlap checks always see the
/// latest committed rows. Status mutations carry the expected current status
/// as an optimistic version token.
#[derive(Clone, Default)]
pub struct ClinicStore {
    inner: Arc<RwLock<Tables>>,
}

impl ClinicStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // PROFILES (owned by the external identity/profile service)
    // ==========================================================================

    pub async fn upsert_doctor(&self, doctor: Doctor) {
        let mut tables = self.inner.write().await;
        tables.doctors.insert(doctor.id, doctor);
    }

    pub async fn upsert_patient(&self, patient: Patient) {
        let mut tables = self.inner.write().await;
        tables.patients.insert(patient.id, patient);
    }

    pub async fn find_doctor(&self, doctor_id: Uuid) -> Option<Doctor> {
        self.inner.read().await.doctors.get(&doctor_id).cloned()
    }

    pub async fn find_doctor_by_user(&self, user_id: Uuid) -> Option<Doctor> {
        let tables = self.inner.read().await;
        tables.doctors.values().find(|d| d.user_id == user_id).cloned()
    }

    pub async fn find_patient_by_user(&self, user_id: Uuid) -> Option<Patient> {
        let tables = self.inner.read().await;
        tables.patients.values().find(|p| p.user_id == user_id).cloned()
    }

    // ==========================================================================
    // AVAILABILITY SLOTS
    // ==========================================================================

    /// Insert a validated batch atomically. Every candidate is re-checked
    /// against the rows persisted for the same (doctor, date) under the write
    /// lock; any overlap fails the whole batch and nothing is written.
    pub async fn insert_slots(
        &self,
        doctor_id: Uuid,
        candidates: Vec<SlotCandidate>,
    ) -> Result<Vec<AvailabilitySlot>, StoreError> {
        let mut tables = self.inner.write().await;

        for candidate in &candidates {
            let clash = tables.slots.values().find(|existing| {
                existing.doctor_id == doctor_id
                    && existing.date == candidate.date
                    && ranges_overlap(
                        existing.start_time,
                        existing.end_time,
                        candidate.start_time,
                        candidate.end_time,
                    )
            });
            if let Some(existing) = clash {
                return Err(StoreError::SlotOverlap {
                    date: candidate.date,
                    existing_start: existing.start_time,
                    existing_end: existing.end_time,
                    new_start: candidate.start_time,
                    new_end: candidate.end_time,
                });
            }
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let slot = AvailabilitySlot {
                id: Uuid::new_v4(),
                doctor_id,
                date: candidate.date,
                day_of_week: day_of_week(candidate.date),
                start_time: candidate.start_time,
                end_time: candidate.end_time,
                is_available: true,
                created_at: now,
            };
            tables.slots.insert(slot.id, slot.clone());
            created.push(slot);
        }

        debug!("Persisted {} availability slots for doctor {}", created.len(), doctor_id);
        Ok(created)
    }

    /// Ownership-checked update, re-validated against all *other* slots of
    /// the same (doctor, date) inside the write guard.
    pub async fn update_slot_checked(
        &self,
        slot_id: Uuid,
        doctor_id: Uuid,
        update: SlotUpdate,
    ) -> Result<AvailabilitySlot, StoreError> {
        let mut tables = self.inner.write().await;

        let owned = tables
            .slots
            .get(&slot_id)
            .filter(|slot| slot.doctor_id == doctor_id)
            .is_some();
        if !owned {
            return Err(StoreError::SlotNotFound);
        }

        let clash = tables.slots.values().find(|other| {
            other.id != slot_id
                && other.doctor_id == doctor_id
                && other.date == update.date
                && ranges_overlap(other.start_time, other.end_time, update.start_time, update.end_time)
        });
        if let Some(other) = clash {
            return Err(StoreError::SlotOverlap {
                date: update.date,
                existing_start: other.start_time,
                existing_end: other.end_time,
                new_start: update.start_time,
                new_end: update.end_time,
            });
        }

        let slot = tables.slots.get_mut(&slot_id).ok_or(StoreError::SlotNotFound)?;
        slot.date = update.date;
        slot.day_of_week = day_of_week(update.date);
        slot.start_time = update.start_time;
        slot.end_time = update.end_time;
        if let Some(is_available) = update.is_available {
            slot.is_available = is_available;
        }

        Ok(slot.clone())
    }

    /// Ownership-checked removal. Deleting a slot is independent of any
    /// appointments referencing its date/time.
    pub async fn delete_slot(&self, slot_id: Uuid, doctor_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;

        let owned = tables
            .slots
            .get(&slot_id)
            .filter(|slot| slot.doctor_id == doctor_id)
            .is_some();
        if !owned {
            return Err(StoreError::SlotNotFound);
        }

        tables.slots.remove(&slot_id);
        Ok(())
    }

    /// Slots for a doctor, optionally narrowed to one date, ordered by date
    /// then start time.
    pub async fn slots_for_doctor(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Vec<AvailabilitySlot> {
        let tables = self.inner.read().await;
        let mut slots: Vec<AvailabilitySlot> = tables
            .slots
            .values()
            .filter(|slot| slot.doctor_id == doctor_id)
            .filter(|slot| date.map_or(true, |d| slot.date == d))
            .cloned()
            .collect();
        slots.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
        slots
    }

    // ==========================================================================
    // APPOINTMENTS
    // ==========================================================================

    /// The booking serialization point. Under one write guard: verify an
    /// available slot fully covers `[time, end)`, verify no live appointment
    /// holds the (doctor, date, time) tuple, then insert the pending
    /// appointment. Two racing callers cannot both reach the insert.
    pub async fn reserve_appointment(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        end: NaiveTime,
        notes: String,
    ) -> Result<Appointment, StoreError> {
        let mut tables = self.inner.write().await;

        Self::check_window_bookable(&tables, doctor_id, date, time, end, None)?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            date,
            time,
            status: AppointmentStatus::Pending,
            notes,
            created_at: Utc::now(),
        };
        tables.appointments.insert(appointment.id, appointment.clone());

        debug!(
            "Reserved appointment {} for doctor {} at {} {}",
            appointment.id, doctor_id, date, time
        );
        Ok(appointment)
    }

    /// Move an appointment to a new window, re-running the same coverage and
    /// double-booking checks as the initial reservation (excluding the
    /// appointment itself) and resetting it to pending. `expected_current`
    /// guards against a concurrent status change between read and write.
    pub async fn reprogram_checked(
        &self,
        appointment_id: Uuid,
        expected_current: AppointmentStatus,
        new_date: NaiveDate,
        new_time: NaiveTime,
        new_end: NaiveTime,
        note: &str,
    ) -> Result<Appointment, StoreError> {
        let mut tables = self.inner.write().await;

        let (doctor_id, current_status) = {
            let appointment = tables
                .appointments
                .get(&appointment_id)
                .ok_or(StoreError::AppointmentNotFound)?;
            (appointment.doctor_id, appointment.status)
        };
        if current_status != expected_current {
            return Err(StoreError::StaleStatus);
        }

        Self::check_window_bookable(
            &tables,
            doctor_id,
            new_date,
            new_time,
            new_end,
            Some(appointment_id),
        )?;

        let appointment = tables
            .appointments
            .get_mut(&appointment_id)
            .ok_or(StoreError::AppointmentNotFound)?;
        appointment.date = new_date;
        appointment.time = new_time;
        appointment.status = AppointmentStatus::Pending;
        Self::append_note(appointment, note);

        Ok(appointment.clone())
    }

    /// Apply a status transition with an optimistic version check: fails when
    /// the stored status no longer matches what the caller validated against.
    pub async fn transition_status(
        &self,
        appointment_id: Uuid,
        expected_current: AppointmentStatus,
        new_status: AppointmentStatus,
        note: Option<&str>,
    ) -> Result<Appointment, StoreError> {
        let mut tables = self.inner.write().await;

        let appointment = tables
            .appointments
            .get_mut(&appointment_id)
            .ok_or(StoreError::AppointmentNotFound)?;
        if appointment.status != expected_current {
            return Err(StoreError::StaleStatus);
        }

        appointment.status = new_status;
        if let Some(note) = note {
            Self::append_note(appointment, note);
        }

        Ok(appointment.clone())
    }

    pub async fn find_appointment(&self, appointment_id: Uuid) -> Option<Appointment> {
        self.inner.read().await.appointments.get(&appointment_id).cloned()
    }

    pub async fn appointments_for_patient(&self, patient_id: Uuid) -> Vec<Appointment> {
        let tables = self.inner.read().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        appointments.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));
        appointments
    }

    /// Appointments for a doctor, ordered by date then time ascending.
    pub async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Vec<Appointment> {
        let tables = self.inner.read().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect();
        appointments.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));
        appointments
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    fn check_window_bookable(
        tables: &Tables,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        end: NaiveTime,
        exclude_appointment: Option<Uuid>,
    ) -> Result<(), StoreError> {
        let covered = tables.slots.values().any(|slot| {
            slot.doctor_id == doctor_id
                && slot.date == date
                && slot.is_available
                && slot.start_time <= time
                && slot.end_time >= end
        });
        if !covered {
            return Err(StoreError::NoCoveringSlot);
        }

        let taken = tables.appointments.values().any(|a| {
            exclude_appointment.map_or(true, |id| a.id != id)
                && a.doctor_id == doctor_id
                && a.date == date
                && a.time == time
                && a.status.is_live()
        });
        if taken {
            return Err(StoreError::AlreadyBooked);
        }

        Ok(())
    }

    fn append_note(appointment: &mut Appointment, note: &str) {
        if appointment.notes.is_empty() {
            appointment.notes = note.to_string();
        } else {
            appointment.notes = format!("{}\n{}", appointment.notes, note);
        }
    }
}
