//! GNSS location snapshot and Maidenhead locator encoding

use serde::{Deserialize, Serialize};

/// Location as published to the overlay and the metadata track.
///
/// `position` stays `None` until the first fix arrives.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationState {
    pub gnss_enabled: bool,
    pub coarse: bool,
    pub position: Option<Position>,
    pub num_satellites: NumSatellites,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_radius: Option<f32>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, accuracy_radius: Option<f32>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_radius,
        }
    }

    /// Maidenhead grid locator: field + square, plus sub-square when requested.
    pub fn to_maidenhead(&self, subsquare: bool) -> String {
        // Shift to 0-180 latitude and 0-360 longitude
        let mut lat = self.latitude + 90.0;
        let mut lon = self.longitude + 180.0;

        let field_lat = (lat / 10.0) as u8;
        let field_lon = (lon / 20.0) as u8;
        lat %= 10.0;
        lon %= 20.0;

        let square_lat = lat as u8;
        let square_lon = (lon / 2.0) as u8;
        lat %= 1.0;
        lon %= 2.0;

        let sub_lat = (lat * 24.0) as u8;
        let sub_lon = (lon * 12.0) as u8;

        // Longitude comes first in every pair
        let mut locator = String::with_capacity(6);
        locator.push((b'A' + field_lon) as char);
        locator.push((b'A' + field_lat) as char);
        locator.push((b'0' + square_lon) as char);
        locator.push((b'0' + square_lat) as char);
        if subsquare {
            locator.push((b'A' + sub_lon) as char);
            locator.push((b'A' + sub_lat) as char);
        }
        locator
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumSatellites {
    pub used_in_fix: u32,
    pub total: u32,
}

/// How much of the position is shown on the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPrecision {
    #[default]
    FullLocation,
    LocatorSubsquare,
    LocatorSquare,
}

impl LocationPrecision {
    pub fn subsquare_enabled(self) -> bool {
        matches!(
            self,
            LocationPrecision::FullLocation | LocationPrecision::LocatorSubsquare
        )
    }

    pub fn coordinates_enabled(self) -> bool {
        self == LocationPrecision::FullLocation
    }
}
