//! Emulated radio for development and testing without hardware.
//!
//! Select `"radio_type": "MOCKED"` in the profile. Every phase change is
//! logged at DEBUG level:
//!
//!   RUST_LOG=rigcorder_lib=debug rigcorder record --profile mocked
//!
//! Each call to `read_operating_state` is one tick. A phase lasts
//! `STEP_TICKS` ticks, then Receive picks Transmit, Scan or ChangeBand at
//! random and every other phase returns to Receive.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Mode, OperatingState, RadioType, RigResult};
use crate::ports::RadioIo;

/// Ticks per phase
pub const STEP_TICKS: u32 = 10;

/// Minimum distance between a scan's start and its target
const MIN_SCAN_HZ: u64 = 1_000;

/// Sub-bands the emulated rig wanders over: (low_hz, high_hz, mode)
const BANDS: &[(u64, u64, Mode)] = &[
    (3_600_000, 3_800_000, Mode::Lsb),   // 80m phone
    (7_100_000, 7_200_000, Mode::Lsb),   // 40m phone
    (14_150_000, 14_350_000, Mode::Usb), // 20m phone
    (21_200_000, 21_450_000, Mode::Usb), // 15m phone
    (28_300_000, 29_000_000, Mode::Usb), // 10m phone
];

const POWER_LEVELS: &[u32] = &[5, 10, 20, 40, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Receive,
    Transmit,
    Scan { from: u64, to: u64 },
    ChangeBand,
}

pub struct MockedRadio {
    rng: StdRng,
    band: usize,
    freq: u64,
    power: u32,
    phase: Phase,
    tick: u32,
}

impl MockedRadio {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic sequence for tests
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        let band = 2;
        let freq = 14_250_000;
        log::info!("[MOCK RADIO] Initialized at {:.3} MHz", freq as f64 / 1e6);
        Self {
            rng,
            band,
            freq,
            power: 40,
            phase: Phase::Receive,
            tick: 0,
        }
    }

    fn tick(&mut self) -> OperatingState {
        self.tick += 1;
        if let Phase::Scan { from, to } = self.phase {
            self.freq = interpolate(from, to, self.tick, STEP_TICKS);
        }

        let state = OperatingState::new(
            RadioType::Mocked.name(),
            self.freq,
            BANDS[self.band].2,
            self.phase == Phase::Transmit,
            self.power,
        );

        if self.tick >= STEP_TICKS {
            self.advance();
        }
        state
    }

    fn advance(&mut self) {
        self.tick = 0;
        let next = match self.phase {
            Phase::Receive => match self.rng.gen_range(0..3) {
                0 => Phase::Transmit,
                1 => self.scan_phase(),
                _ => {
                    self.change_band();
                    Phase::ChangeBand
                }
            },
            _ => Phase::Receive,
        };
        log::debug!("[MOCK RADIO] {:?} -> {next:?}", self.phase);
        self.phase = next;
    }

    /// Scan from the current frequency to a fresh target within the band.
    fn scan_phase(&mut self) -> Phase {
        let (lo, hi, _) = BANDS[self.band];
        let from = self.freq;
        let mut to = self.rng.gen_range(lo..=hi) / 100 * 100;
        if to.abs_diff(from) < MIN_SCAN_HZ {
            to = if from + MIN_SCAN_HZ <= hi {
                from + MIN_SCAN_HZ
            } else {
                from - MIN_SCAN_HZ
            };
        }
        Phase::Scan { from, to }
    }

    fn change_band(&mut self) {
        self.band = self.rng.gen_range(0..BANDS.len());
        self.power = POWER_LEVELS[self.rng.gen_range(0..POWER_LEVELS.len())];
        let (lo, hi, _) = BANDS[self.band];
        self.freq = self.rng.gen_range(lo..=hi) / 100 * 100;
        log::debug!(
            "[MOCK RADIO] Band change to {:.3} MHz at {}W",
            self.freq as f64 / 1e6,
            self.power
        );
    }
}

impl Default for MockedRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioIo for MockedRadio {
    fn read_operating_state(&mut self) -> RigResult<OperatingState> {
        Ok(self.tick())
    }

    fn close(&mut self) {
        log::info!("[MOCK RADIO] Closed");
    }
}

/// Linear interpolation that lands exactly on `to` at `step == steps`.
fn interpolate(from: u64, to: u64, step: u32, steps: u32) -> u64 {
    let delta = to as i64 - from as i64;
    (from as i64 + delta * step as i64 / steps as i64) as u64
}
