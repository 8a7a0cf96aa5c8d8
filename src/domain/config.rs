//! Configuration profiles
//!
//! A Configuration is a saved profile containing all settings for a particular
//! station setup (radio, serial port, audio device, recording parameters).

use serde::{Deserialize, Serialize};

use super::location::{LocationPrecision, Position};
use super::types::RadioType;

/// A saved configuration profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Profile name (e.g., "FT-891 Portable")
    pub name: String,
    pub radio_type: RadioType,
    /// Selected serial port name
    pub serial_port: Option<String>,
    /// Serial baud rate; the radio's default rate when unset
    pub baud_rate: Option<u32>,
    /// Selected audio input device ID; system default when unset
    pub audio_input: Option<String>,
    /// Pause between radio reads on the video thread
    pub radio_poll_interval_ms: u64,
    /// Embed GNSS position in the metadata track
    pub location_in_metatrack: bool,
    pub location_precision: LocationPrecision,
    /// Fixed station position, used in place of a GNSS provider
    pub static_position: Option<Position>,
    pub output_dir: String,
    pub video: VideoSettings,
    pub audio: AudioSettings,
    /// Pending video timestamps kept while waiting for encoder output
    pub pts_queue_capacity: usize,
    /// How long a non-zero satellite used-in-fix count is held
    pub satellite_hold_secs: u64,
    pub max_duration_secs: Option<u64>,
    pub ffmpeg_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub bitrate: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub bitrate: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            radio_type: RadioType::YaesuFt891,
            serial_port: None,
            baud_rate: None,
            audio_input: None,
            radio_poll_interval_ms: 100,
            location_in_metatrack: false,
            location_precision: LocationPrecision::default(),
            static_position: None,
            output_dir: "recordings".to_string(),
            video: VideoSettings::default(),
            audio: AudioSettings::default(),
            pts_queue_capacity: 16,
            satellite_hold_secs: 30,
            max_duration_secs: None,
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frame_rate: 10,
            bitrate: 2_000_000,
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            bitrate: 128_000,
        }
    }
}

impl Configuration {
    pub fn effective_baud_rate(&self) -> u32 {
        self.baud_rate
            .unwrap_or_else(|| self.radio_type.default_baud_rate())
    }
}
