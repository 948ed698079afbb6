use chrono::{DateTime, FixedOffset, Utc};

use crate::state::stamps::StampStore;

/// Shared state handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub store: StampStore,

    /// Zone in which "today" and "now" are evaluated for new stamps.
    pub zone: FixedOffset,

    pub clock: fn() -> DateTime<Utc>,
}

impl AppState {
    pub fn new(store: StampStore, zone: FixedOffset) -> Self {
        Self {
            store,
            zone,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock, mostly for tests.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        (self.clock)().with_timezone(&self.zone)
    }
}
