//! Core domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audio sample type as delivered by the capture device (32-bit float, -1.0 to 1.0)
pub type AudioSample = f32;

/// Operating mode as reported by the radio, collapsed to the modes we display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Cw,
    Lsb,
    Usb,
    Am,
    Fm,
    Data,
    Rtty,
    Other,
}

impl Mode {
    /// AM and the sidebands need the monitor on for audio to reach the data jack.
    pub fn is_am_or_ssb(self) -> bool {
        matches!(self, Mode::Lsb | Mode::Usb | Mode::Am)
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Cw => "CW",
            Mode::Lsb => "LSB",
            Mode::Usb => "USB",
            Mode::Am => "AM",
            Mode::Fm => "FM",
            Mode::Data => "DATA",
            Mode::Rtty => "RTTY",
            Mode::Other => "Unknown",
        }
    }
}

/// Wall-clock capture time of a sample, used for PTS and metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timestamp {
    pub wall: DateTime<Utc>,
}

impl Timestamp {
    pub fn now() -> Self {
        Self { wall: Utc::now() }
    }

    pub fn at(wall: DateTime<Utc>) -> Self {
        Self { wall }
    }
}

/// One snapshot of the radio's operating state, produced once per sampling tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatingState {
    /// Name of the device
    pub rig: String,
    /// Frequency in Hz
    pub freq: u64,
    pub mode: Mode,
    pub tx: bool,
    /// Configured PEP in Watts
    pub power: u32,
    #[serde(skip)]
    pub captured_at: Timestamp,
}

impl OperatingState {
    pub fn new(rig: impl Into<String>, freq: u64, mode: Mode, tx: bool, power: u32) -> Self {
        Self {
            rig: rig.into(),
            freq,
            mode,
            tx,
            power,
            captured_at: Timestamp::now(),
        }
    }
}

/// The supported radios. Closed set: each variant selects one CAT dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RadioType {
    #[serde(rename = "YAESU_FT_891")]
    YaesuFt891,
    #[serde(rename = "YAESU_FT_991A")]
    YaesuFt991a,
    #[serde(rename = "MOCKED")]
    Mocked,
}

impl RadioType {
    pub const ALL: [RadioType; 3] = [RadioType::YaesuFt891, RadioType::YaesuFt991a, RadioType::Mocked];

    /// Identifier used in configuration files
    pub fn id(self) -> &'static str {
        match self {
            RadioType::YaesuFt891 => "YAESU_FT_891",
            RadioType::YaesuFt991a => "YAESU_FT_991A",
            RadioType::Mocked => "MOCKED",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RadioType::YaesuFt891 => "Yaesu FT-891",
            RadioType::YaesuFt991a => "Yaesu FT-991A",
            RadioType::Mocked => "Emulated radio",
        }
    }

    /// Supported baud rates; the first one is the default.
    pub fn baud_rates(self) -> &'static [u32] {
        match self {
            RadioType::YaesuFt891 | RadioType::YaesuFt991a => &[4800, 9600, 19200, 38400],
            RadioType::Mocked => &[4800],
        }
    }

    pub fn default_baud_rate(self) -> u32 {
        self.baud_rates()[0]
    }

    /// Shown to the user when the radio does not answer; CAT rate mismatches are common.
    pub fn baud_rate_hint(self) -> Option<&'static str> {
        match self {
            RadioType::YaesuFt891 => {
                Some("The baud rate should match FT-891 configuration item 05-06.")
            }
            RadioType::YaesuFt991a => {
                Some("The baud rate should match FT-991A menu item 031 (CAT RATE).")
            }
            RadioType::Mocked => None,
        }
    }
}

impl std::str::FromStr for RadioType {
    type Err = String;

    /// Accepts the configuration id in any case, e.g. `yaesu_ft_891`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RadioType::ALL
            .into_iter()
            .find(|r| r.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown radio type: {s}"))
    }
}

impl std::fmt::Display for RadioType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Information about an audio device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Information about a serial port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialPortInfo {
    pub name: String,
    pub port_type: String,
}

/// An RGBA video frame, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; Self::byte_len(width, height)],
        }
    }

    /// RGBA buffer size for a `width` x `height` frame.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Set one pixel; coordinates outside the frame are ignored.
    pub fn put(&mut self, x: i32, y: i32, rgba: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}
