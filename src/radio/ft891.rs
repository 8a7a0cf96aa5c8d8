//! Yaesu FT-891 dialect
//!
//! On top of the shared Yaesu queries, the FT-891 reports configured power
//! through band- and mode-specific menu items (`EX1601`..`EX1606`), and only
//! routes receive audio to the data jack with the monitor switched on.

use crate::cat::{CatCommand, CatEngine, CatQuery};
use crate::domain::{Mode, OperatingState, RadioType, RigResult, Timestamp};
use crate::ports::{RadioIo, SerialConnection};

use super::yaesu::{self, matches_template, number_field, Info, Tx};

/// Model code returned by `ID;`
pub const CAT_ID: u16 = 650;

/// Menu item holding the power setting for the current band and mode.
pub fn power_menu_item(freq: u64, mode: Mode) -> u16 {
    let hf = freq < 50_000_000;
    match (hf, mode) {
        (true, Mode::Lsb | Mode::Usb) => 1601,
        (true, Mode::Am) => 1602,
        (true, _) => 1603,
        (false, Mode::Lsb | Mode::Usb) => 1604,
        (false, Mode::Am) => 1605,
        (false, _) => 1606,
    }
}

/// `EX{item};` → `EX....###;`, power in Watts.
pub struct ConfigPower(pub u16);

impl CatQuery<String> for ConfigPower {
    type Response = u32;

    fn query_data(&self) -> String {
        format!("EX{:04};", self.0)
    }

    fn parse_response(&self, frame: &String) -> Option<u32> {
        if !matches_template(frame, "EX....###;") {
            return None;
        }
        number_field(frame, 6..9).map(|w| w as u32)
    }
}

/// `ML0;` → `ML0001;` on, `ML0000;` off.
pub struct MonitorSwitchQuery;

impl CatQuery<String> for MonitorSwitchQuery {
    type Response = bool;

    fn query_data(&self) -> String {
        "ML0;".into()
    }

    fn parse_response(&self, frame: &String) -> Option<bool> {
        if !matches_template(frame, "ML0###;") {
            return None;
        }
        match &frame[3..6] {
            "000" => Some(false),
            "001" => Some(true),
            _ => None,
        }
    }
}

pub struct MonitorSwitch(pub bool);

impl CatCommand<String> for MonitorSwitch {
    fn command_data(&self) -> String {
        let wire = if self.0 { "ML0001;" } else { "ML0000;" };
        wire.to_string()
    }
}

pub struct MonitorLevel(pub u8);

impl CatCommand<String> for MonitorLevel {
    fn command_data(&self) -> String {
        format!("ML1{:03};", self.0)
    }
}

pub struct Ft891Radio {
    engine: CatEngine<String>,
}

impl Ft891Radio {
    /// Configure the port, start the engine and verify the radio's identity.
    pub fn open(serial: Box<dyn SerialConnection>, baud_rate: u32) -> RigResult<Self> {
        let radio = RadioType::YaesuFt891;
        let mut engine = yaesu::open_engine(serial, baud_rate, radio.baud_rate_hint())?;
        yaesu::identify(&mut engine, CAT_ID, radio.name())?;
        Ok(Self { engine })
    }

    fn ensure_monitor_on(&mut self) -> RigResult<()> {
        if !self.engine.query(&MonitorSwitchQuery)? {
            log::info!("FT-891 monitor is off, enabling it at level 0");
            self.engine.send_command(&MonitorLevel(0))?;
            self.engine.send_command(&MonitorSwitch(true))?;
        }
        Ok(())
    }
}

impl RadioIo for Ft891Radio {
    fn read_operating_state(&mut self) -> RigResult<OperatingState> {
        let captured_at = Timestamp::now();
        let info = self.engine.query(&Info)?;
        let tx = self.engine.query(&Tx)?;
        let power = self
            .engine
            .query(&ConfigPower(power_menu_item(info.freq, info.mode)))?;

        if info.mode.is_am_or_ssb() {
            self.ensure_monitor_on()?;
        }

        Ok(OperatingState {
            rig: RadioType::YaesuFt891.name().to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_menu_item_by_band_and_mode() {
        assert_eq!(power_menu_item(14_250_000, Mode::Usb), 1601);
        assert_eq!(power_menu_item(3_700_000, Mode::Lsb), 1601);
        assert_eq!(power_menu_item(7_100_000, Mode::Am), 1602);
        assert_eq!(power_menu_item(14_070_000, Mode::Data), 1603);
        assert_eq!(power_menu_item(50_100_000, Mode::Usb), 1604);
        assert_eq!(power_menu_item(50_400_000, Mode::Am), 1605);
        assert_eq!(power_menu_item(51_000_000, Mode::Fm), 1606);
    }

    #[test]
    fn config_power_wire_and_parse() {
        let q = ConfigPower(1601);
        assert_eq!(q.query_data(), "EX1601;");
        assert_eq!(q.parse_response(&"EX1601040;".into()), Some(40));
        assert_eq!(q.parse_response(&"EX160140;".into()), None);
        assert_eq!(q.parse_response(&"EX1601x40;".into()), None);
    }

    #[test]
    fn monitor_switch_parse() {
        assert_eq!(MonitorSwitchQuery.parse_response(&"ML0000;".into()), Some(false));
        assert_eq!(MonitorSwitchQuery.parse_response(&"ML0001;".into()), Some(true));
        assert_eq!(MonitorSwitchQuery.parse_response(&"ML0002;".into()), None);
        assert_eq!(MonitorSwitchQuery.parse_response(&"ML1001;".into()), None);
    }

    #[test]
    fn monitor_commands_wire() {
        assert_eq!(MonitorSwitch(true).command_data(), "ML0001;");
        assert_eq!(MonitorSwitch(false).command_data(), "ML0000;");
        assert_eq!(MonitorLevel(0).command_data(), "ML1000;");
        assert_eq!(MonitorLevel(42).command_data(), "ML1042;");
    }
}
