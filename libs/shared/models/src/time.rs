use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

/// Fixed duration of every booking window.
pub const BOOKING_DURATION_MINUTES: i64 = 30;

/// Minute offset of a time within its day.
pub fn time_to_minutes(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Whether two half-open ranges `[s1, e1)` and `[s2, e2)` on the same date
/// intersect. Touching boundaries (`e1 == s2`) do not overlap.
pub fn ranges_overlap(s1: NaiveTime, e1: NaiveTime, s2: NaiveTime, e2: NaiveTime) -> bool {
    let (s1, e1) = (time_to_minutes(s1), time_to_minutes(e1));
    let (s2, e2) = (time_to_minutes(s2), time_to_minutes(e2));
    !(e1 <= s2 || s1 >= e2)
}

/// Day of week as the 0 (Sunday) to 6 (Saturday) convention the slot table
/// stores.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}
