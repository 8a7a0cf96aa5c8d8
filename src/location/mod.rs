//! Location tracking
//!
//! `LocationTracker` receives provider callbacks from whatever supplies
//! positions (a GNSS receiver, or a fixed station position from the
//! profile) and hands out copies to the sampling tick.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::domain::{LocationState, NumSatellites, Position};

/// Default hold window for a non-zero satellite used-in-fix count
pub const DEFAULT_SATELLITE_HOLD: Duration = Duration::from_secs(30);

struct Inner {
    state: LocationState,
    last_nonzero_used_in_fix: Option<Instant>,
}

pub struct LocationTracker {
    inner: Mutex<Inner>,
    satellite_hold: Duration,
}

impl LocationTracker {
    pub fn new(satellite_hold: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: LocationState::default(),
                last_nonzero_used_in_fix: None,
            }),
            satellite_hold,
        }
    }

    /// A tracker pinned to one known position, as if GNSS had a fix.
    pub fn fixed(position: Position) -> Self {
        let tracker = Self::default();
        tracker.set_gnss_enabled(true);
        tracker.on_location(position);
        tracker
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> LocationState {
        self.lock().state.clone()
    }

    pub fn set_gnss_enabled(&self, enabled: bool) {
        self.lock().state.gnss_enabled = enabled;
    }

    pub fn set_coarse(&self, coarse: bool) {
        self.lock().state.coarse = coarse;
    }

    pub fn on_location(&self, position: Position) {
        log::debug!(
            "Location fix {:.5} {:.5} ±{:?}",
            position.latitude,
            position.longitude,
            position.accuracy_radius
        );
        self.lock().state.position = Some(position);
    }

    pub fn on_satellite_status(&self, used_in_fix: u32, total: u32) {
        self.on_satellite_status_at(used_in_fix, total, Instant::now());
    }

    /// Providers tend to report zero used-in-fix shortly after a fix, so a
    /// non-zero count is held for the hold window.
    pub fn on_satellite_status_at(&self, used_in_fix: u32, total: u32, now: Instant) {
        let hold = self.satellite_hold;
        let mut inner = self.lock();
        if used_in_fix > 0 {
            inner.last_nonzero_used_in_fix = Some(now);
        }

        let holding = used_in_fix == 0
            && inner
                .last_nonzero_used_in_fix
                .is_some_and(|at| now.saturating_duration_since(at) < hold);

        inner.state.num_satellites = if holding {
            NumSatellites {
                total,
                ..inner.state.num_satellites
            }
        } else {
            NumSatellites { used_in_fix, total }
        };
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SATELLITE_HOLD)
    }
}
