use chrono::NaiveDate;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{AppState, ClinicStore, SlotCandidate, SlotUpdate};
use shared_models::auth::Actor;
use shared_models::records::AvailabilitySlot;

use crate::models::{AvailabilityError, NewAvailabilitySlot, UpdateAvailabilitySlot};
use crate::services::overlap::{check_batch_overlap, validate_candidate, validate_time_range};

/// Slot management for the calling doctor. Validation happens here; the
/// store re-checks overlap against persisted rows under its write lock so a
/// racing submission cannot slip between check and insert.
pub struct AvailabilityService {
    store: ClinicStore,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    /// Validate and persist a batch of slots. All-or-nothing: any invalid
    /// candidate or any overlap (within the batch or against stored slots)
    /// fails the whole submission.
    pub async fn submit_slots(
        &self,
        actor: Actor,
        candidates: Vec<NewAvailabilitySlot>,
    ) -> Result<Vec<AvailabilitySlot>, AvailabilityError> {
        let doctor = self
            .store
            .find_doctor_by_user(actor.id)
            .await
            .ok_or(AvailabilityError::DoctorProfileNotFound)?;

        for candidate in &candidates {
            validate_candidate(candidate)?;
        }
        check_batch_overlap(&candidates)?;

        let slot_candidates = candidates
            .into_iter()
            .map(|c| SlotCandidate {
                date: c.date,
                start_time: c.start_time,
                end_time: c.end_time,
            })
            .collect();

        let created = self.store.insert_slots(doctor.id, slot_candidates).await?;
        info!("Doctor {} published {} availability slots", doctor.id, created.len());
        Ok(created)
    }

    /// Ownership-checked update with the same overlap guarantee as insert.
    pub async fn update_slot(
        &self,
        actor: Actor,
        slot_id: Uuid,
        update: UpdateAvailabilitySlot,
    ) -> Result<AvailabilitySlot, AvailabilityError> {
        let doctor = self
            .store
            .find_doctor_by_user(actor.id)
            .await
            .ok_or(AvailabilityError::DoctorProfileNotFound)?;

        validate_time_range(update.start_time, update.end_time)?;

        let updated = self
            .store
            .update_slot_checked(
                slot_id,
                doctor.id,
                SlotUpdate {
                    date: update.date,
                    start_time: update.start_time,
                    end_time: update.end_time,
                    is_available: update.is_available,
                },
            )
            .await?;

        debug!("Doctor {} updated slot {}", doctor.id, slot_id);
        Ok(updated)
    }

    pub async fn delete_slot(&self, actor: Actor, slot_id: Uuid) -> Result<(), AvailabilityError> {
        let doctor = self
            .store
            .find_doctor_by_user(actor.id)
            .await
            .ok_or(AvailabilityError::DoctorProfileNotFound)?;

        self.store.delete_slot(slot_id, doctor.id).await?;
        debug!("Doctor {} deleted slot {}", doctor.id, slot_id);
        Ok(())
    }

    /// Slots for a doctor ordered by date then start time. An empty result
    /// is not an error here; the handler decides how to present it.
    pub async fn query_slots(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Vec<AvailabilitySlot> {
        self.store.slots_for_doctor(doctor_id, date).await
    }
}
