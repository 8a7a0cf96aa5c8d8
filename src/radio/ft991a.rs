//! Yaesu FT-991A dialect
//!
//! Same ASCII grammar as the FT-891. Power comes straight from `PC;` and
//! the monitor needs no attention.

use crate::cat::{CatEngine, CatQuery};
use crate::domain::{OperatingState, RadioType, RigResult, Timestamp};
use crate::ports::{RadioIo, SerialConnection};

use super::yaesu::{self, matches_template, number_field, Info, Tx};

/// Model code returned by `ID;`
pub const CAT_ID: u16 = 670;

/// `PC;` → `PC###;`, power in Watts.
pub struct Power;

impl CatQuery<String> for Power {
    type Response = u32;

    fn query_data(&self) -> String {
        "PC;".into()
    }

    fn parse_response(&self, frame: &String) -> Option<u32> {
        if !matches_template(frame, "PC###;") {
            return None;
        }
        number_field(frame, 2..5).map(|w| w as u32)
    }
}

pub struct Ft991aRadio {
    engine: CatEngine<String>,
}

impl Ft991aRadio {
    pub fn open(serial: Box<dyn SerialConnection>, baud_rate: u32) -> RigResult<Self> {
        let radio = RadioType::YaesuFt991a;
        let mut engine = yaesu::open_engine(serial, baud_rate, radio.baud_rate_hint())?;
        yaesu::identify(&mut engine, CAT_ID, radio.name())?;
        Ok(Self { engine })
    }
}

impl RadioIo for Ft991aRadio {
    fn read_operating_state(&mut self) -> RigResult<OperatingState> {
        let captured_at = Timestamp::now();
        let info = self.engine.query(&Info)?;
        let tx = self.engine.query(&Tx)?;
        let power = self.engine.query(&Power)?;

        Ok(OperatingState {
            rig: RadioType::YaesuFt991a.name().to_string(),
            freq: info.freq,
            mode: info.mode,
            tx,
            power,
            captured_at,
        })
    }

    fn close(&mut self) {
        self.engine.close();
    }
}
