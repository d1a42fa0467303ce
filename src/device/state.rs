//! Latest fix shared between the acquisition and feedback threads

use crate::core::{Distance, Location};
use crate::processing::FixQuality;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Copy of the shared state taken under the lock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximitySnapshot {
    pub current_location: Option<Location>,
    /// `None` until the first fix
    pub current_distance: Option<Distance>,
    /// When the location last changed
    pub last_update_time: Option<Instant>,
    /// When any valid fix last arrived, changed or not
    pub last_fix_time: Option<Instant>,
    pub quality: Option<FixQuality>,
    /// Number of accepted location changes
    pub update_count: u64,
}

impl ProximitySnapshot {
    /// Nothing received yet
    pub fn no_fix() -> Self {
        Self {
            current_location: None,
            current_distance: None,
            last_update_time: None,
            last_fix_time: None,
            quality: None,
            update_count: 0,
        }
    }

    pub fn has_fix(&self) -> bool {
        self.current_location.is_some()
    }

    /// Time since the last valid fix, if there ever was one
    pub fn fix_age(&self, now: Instant) -> Option<Duration> {
        self.last_fix_time
            .map(|at| now.saturating_duration_since(at))
    }
}

impl Default for ProximitySnapshot {
    fn default() -> Self {
        Self::no_fix()
    }
}

/// Location and distance written by acquisition, read by feedback
///
/// Every write and read holds the lock for the whole record, so a reader
/// never sees a location paired with another fix's distance.
#[derive(Debug, Default)]
pub struct SharedState {
    inner: Mutex<ProximitySnapshot>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ProximitySnapshot::no_fix()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProximitySnapshot> {
        // A panicking writer cannot leave a half-written Copy record behind
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a changed location with its distance
    pub fn update(
        &self,
        location: Location,
        distance: Distance,
        quality: Option<FixQuality>,
        now: Instant,
    ) {
        let mut state = self.lock();
        state.current_location = Some(location);
        state.current_distance = Some(distance);
        state.last_update_time = Some(now);
        state.last_fix_time = Some(now);
        state.quality = quality;
        state.update_count += 1;
    }

    /// Note a valid fix whose location did not change
    pub fn refresh(&self, quality: Option<FixQuality>, now: Instant) {
        let mut state = self.lock();
        state.last_fix_time = Some(now);
        state.quality = quality;
    }

    pub fn snapshot(&self) -> ProximitySnapshot {
        *self.lock()
    }
}
