use chrono::{DateTime, TimeZone};

use crate::errors::Result;
use crate::state::stamps::{DayEntries, DayKey, StampContent, TimeOfDaySlot};
use crate::state::AppState;

pub const DAY_FORMAT: &str = "%Y-%m-%d";
pub const SLOT_FORMAT: &str = "%H:%M";

/// Derive the (day, time-of-day) key for `now`, in whatever zone `now`
/// carries.
pub fn slot_keys<Tz>(now: &DateTime<Tz>) -> (DayKey, TimeOfDaySlot)
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    (
        now.format(DAY_FORMAT).to_string(),
        now.format(SLOT_FORMAT).to_string(),
    )
}

/// Record a begin/finish pair at the current minute of the configured zone.
pub fn stamp_now(state: &AppState, begin: String, finish: String) -> Result<DayEntries> {
    let (day, slot) = slot_keys(&state.now());
    tracing::debug!(%day, %slot, "recording stamp");
    state
        .store
        .record(day, slot, StampContent { begin, finish })
}

/// Entries recorded for `day`, taken verbatim from the caller.
pub fn list_day(state: &AppState, day: &str) -> Result<DayEntries> {
    state.store.list(day)
}
