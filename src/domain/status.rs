//! Per-frame status sample

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::location::LocationState;
use super::types::OperatingState;

/// Everything known at one sampling tick: radio state, location and the
/// wall-clock instant the radio state was captured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusData {
    pub radio: OperatingState,
    pub location: LocationState,
    pub timestamp: DateTime<Utc>,
}

impl StatusData {
    pub fn new(radio: OperatingState, location: LocationState) -> Self {
        let timestamp = radio.captured_at.wall;
        Self {
            radio,
            location,
            timestamp,
        }
    }

    /// Copy for the metadata track. Position and GNSS state are blanked unless
    /// the user opted into embedding their location.
    pub fn for_metatrack(&self, include_location: bool) -> StatusData {
        let mut copy = self.clone();
        if !include_location {
            copy.location.gnss_enabled = false;
            copy.location.position = None;
        }
        copy
    }
}
