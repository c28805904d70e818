//! Pure validation over candidate slots. The overlap predicate itself lives
//! in `shared_models::time` so the store can run the same check under its
//! write lock.

pub use shared_models::time::{ranges_overlap, time_to_minutes};

use chrono::{NaiveTime, Timelike};

use crate::models::{AvailabilityError, NewAvailabilitySlot};

/// Time ordering plus granularity. Overlap is computed on minute offsets, so
/// sub-minute precision is rejected here rather than silently truncated.
pub fn validate_time_range(start: NaiveTime, end: NaiveTime) -> Result<(), AvailabilityError> {
    if start.second() != 0 || start.nanosecond() != 0 || end.second() != 0 || end.nanosecond() != 0
    {
        return Err(AvailabilityError::SubMinuteTime);
    }
    if start >= end {
        return Err(AvailabilityError::InvalidTimeRange { start, end });
    }
    Ok(())
}

/// Per-candidate field validation: day-of-week range and time ordering.
pub fn validate_candidate(candidate: &NewAvailabilitySlot) -> Result<(), AvailabilityError> {
    if let Some(dow) = candidate.day_of_week {
        if dow > 6 {
            return Err(AvailabilityError::InvalidDayOfWeek(dow));
        }
    }
    validate_time_range(candidate.start_time, candidate.end_time)
}

/// Pairwise scan of the batch itself: two submitted slots on the same date
/// must not overlap, independent of anything already stored.
pub fn check_batch_overlap(candidates: &[NewAvailabilitySlot]) -> Result<(), AvailabilityError> {
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let (a, b) = (&candidates[i], &candidates[j]);
            if a.date == b.date
                && ranges_overlap(a.start_time, a.end_time, b.start_time, b.end_time)
            {
                return Err(AvailabilityError::BatchOverlap {
                    date: a.date,
                    first: i,
                    second: j,
                });
            }
        }
    }
    Ok(())
}
