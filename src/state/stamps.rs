use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, StampError};

/// Calendar day key, `YYYY-MM-DD` by convention. Opaque to the store.
pub type DayKey = String;

/// Moment within a day, `HH:MM` by convention. Opaque to the store.
pub type TimeOfDaySlot = String;

/// A begin/finish pair recorded for one (day, slot).
///
/// `begin` is persisted under the key `start:` so snapshots written by
/// older deployments keep loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampContent {
    #[serde(rename = "start:")]
    pub begin: String,
    pub finish: String,
}

impl StampContent {
    pub fn new(begin: impl Into<String>, finish: impl Into<String>) -> Self {
        Self {
            begin: begin.into(),
            finish: finish.into(),
        }
    }
}

/// All slots recorded for a single day.
pub type DayEntries = BTreeMap<TimeOfDaySlot, StampContent>;

/// Root aggregate: every recorded day.
pub type StampSet = BTreeMap<DayKey, DayEntries>;

/// Whether the store still accepts mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Serving,
    Draining,
}

#[derive(Debug)]
struct Inner {
    stamps: StampSet,
    phase: Phase,
}

/// Shared handle to the stamp set.
///
/// Cloning is cheap and every clone sees the same data. Writers are
/// exclusive, readers run concurrently.
#[derive(Debug, Clone)]
pub struct StampStore {
    inner: Arc<RwLock<Inner>>,
}

impl Default for StampStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StampStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::from_snapshot(StampSet::new())
    }

    /// Create a store seeded with a previously persisted snapshot.
    pub fn from_snapshot(stamps: StampSet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                stamps,
                phase: Phase::Serving,
            })),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StampError::Unavailable("lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StampError::Unavailable("lock poisoned"))
    }

    /// Store `content` under (`day`, `slot`), replacing whatever was there,
    /// and return the day's full entries after the write.
    pub fn record(
        &self,
        day: DayKey,
        slot: TimeOfDaySlot,
        content: StampContent,
    ) -> Result<DayEntries> {
        if day.is_empty() {
            return Err(StampError::InvalidKey("day must not be empty"));
        }
        if slot.is_empty() {
            return Err(StampError::InvalidKey("time-of-day slot must not be empty"));
        }

        let mut inner = self.write()?;
        if inner.phase == Phase::Draining {
            return Err(StampError::Unavailable("shutting down"));
        }

        let entries = inner.stamps.entry(day).or_default();
        entries.insert(slot, content);
        Ok(entries.clone())
    }

    /// Entries recorded for `day`, or `NotFound`.
    pub fn list(&self, day: &str) -> Result<DayEntries> {
        let inner = self.read()?;
        inner.stamps.get(day).cloned().ok_or(StampError::NotFound)
    }

    /// Copy of the whole stamp set.
    pub fn snapshot(&self) -> Result<StampSet> {
        Ok(self.read()?.stamps.clone())
    }

    pub fn day_count(&self) -> Result<usize> {
        Ok(self.read()?.stamps.len())
    }

    /// Refuse further `record` calls. Reads keep working.
    pub fn stop_accepting(&self) {
        // A poisoned lock already refuses writes.
        if let Ok(mut inner) = self.inner.write() {
            inner.phase = Phase::Draining;
        }
    }

    pub fn phase(&self) -> Phase {
        match self.inner.read() {
            Ok(inner) => inner.phase,
            Err(_) => Phase::Draining,
        }
    }
}
