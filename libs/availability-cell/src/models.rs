use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::AppError;

/// A slot submitted by a doctor. `day_of_week` is derived from `date` when
/// omitted; when supplied it must agree with the 0 (Sunday) to 6 (Saturday)
/// range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAvailabilitySlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub day_of_week: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAvailabilitySlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: Option<bool>,
}

#[derive(Debug, Error)]
pub enum AvailabilityError {
    #[error("doctor profile not found")]
    DoctorProfileNotFound,

    #[error("availability slot not found")]
    SlotNotFound,

    #[error("day_of_week must be between 0 and 6, got {0}")]
    InvalidDayOfWeek(u8),

    #[error("start_time {start} must be before end_time {end}")]
    InvalidTimeRange { start: NaiveTime, end: NaiveTime },

    #[error("times must fall on whole minutes")]
    SubMinuteTime,

    #[error("slots {first} and {second} in the batch overlap on {date}")]
    BatchOverlap {
        date: NaiveDate,
        first: usize,
        second: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::DoctorProfileNotFound => AppError::NotFound(err.to_string()),
            AvailabilityError::SlotNotFound => AppError::NotFound(err.to_string()),
            AvailabilityError::InvalidDayOfWeek(_)
            | AvailabilityError::InvalidTimeRange { .. }
            | AvailabilityError::SubMinuteTime => AppError::Validation(err.to_string()),
            AvailabilityError::BatchOverlap { .. } => AppError::Conflict(err.to_string()),
            AvailabilityError::Store(store_err) => match store_err {
                StoreError::SlotOverlap { .. } => AppError::Conflict(store_err.to_string()),
                StoreError::SlotNotFound | StoreError::DoctorNotFound => {
                    AppError::NotFound(store_err.to_string())
                }
                other => AppError::Database(other.to_string()),
            },
        }
    }
}
