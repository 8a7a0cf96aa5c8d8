//! Text shown on the status overlay.

use chrono::{DateTime, Utc};

use crate::domain::{LocationPrecision, LocationState, Mode, Position};

/// `14250000` → `14.250.000 Hz`
pub fn format_freq(freq: u64) -> String {
    let mhz = freq / 1_000_000;
    let khz = (freq % 1_000_000) / 1_000;
    let hz = freq % 1_000;

    if mhz > 0 {
        format!("{mhz}.{khz:03}.{hz:03} Hz")
    } else if khz > 0 {
        format!("{khz}.{hz:03} Hz")
    } else {
        format!("{hz} Hz")
    }
}

pub fn format_mode(mode: Mode) -> &'static str {
    mode.label()
}

pub fn format_power(power: u32) -> String {
    format!("{power}W")
}

pub fn format_utc(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_lat(position: &Position) -> String {
    let hemisphere = if position.latitude < 0.0 { 'S' } else { 'N' };
    format!("{:.5}{hemisphere}", position.latitude.abs())
}

pub fn format_lon(position: &Position) -> String {
    let hemisphere = if position.longitude < 0.0 { 'W' } else { 'E' };
    format!("{:.5}{hemisphere}", position.longitude.abs())
}

/// Maidenhead locator at the configured precision.
pub fn format_qth(location: &LocationState, precision: LocationPrecision) -> String {
    if !location.gnss_enabled {
        return "N/A".into();
    }
    match &location.position {
        Some(position) => position.to_maidenhead(precision.subsquare_enabled()),
        None => "Acquiring…".into(),
    }
}

/// Satellite counts, plus coordinates and accuracy when the precision
/// setting allows full location.
pub fn format_gnss_detail(location: &LocationState, precision: LocationPrecision) -> String {
    if !location.gnss_enabled {
        return "GNSS location disabled".into();
    }

    let sats = format!(
        "{}/{}",
        location.num_satellites.used_in_fix, location.num_satellites.total
    );
    let Some(position) = location.position.filter(|_| precision.coordinates_enabled()) else {
        return sats;
    };

    let accuracy = position
        .accuracy_radius
        .map(|r| format!(" ±{r:.1}m"))
        .unwrap_or_default();
    format!(
        "{sats} {} {}{accuracy}",
        format_lat(&position),
        format_lon(&position)
    )
}
