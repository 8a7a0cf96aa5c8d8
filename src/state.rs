//! Application state

use std::sync::Arc;
use std::time::Duration;

use crate::domain::Configuration;
use crate::location::LocationTracker;
use crate::radio::RadioSession;
use crate::recording::RecordingService;

/// The long-lived collaborators, built once and shared by `Arc`.
pub struct AppState {
    pub radio: Arc<RadioSession>,
    pub location: Arc<LocationTracker>,
    pub recording: Arc<RecordingService>,
}

impl AppState {
    pub fn new(config: &Configuration) -> Self {
        let radio = Arc::new(RadioSession::new());
        let location = Arc::new(match config.static_position {
            Some(position) => LocationTracker::fixed(position),
            None => LocationTracker::new(Duration::from_secs(config.satellite_hold_secs)),
        });
        let recording = Arc::new(RecordingService::new(
            Arc::clone(&radio),
            Arc::clone(&location),
        ));
        Self {
            radio,
            location,
            recording,
        }
    }
}
