//! Shared Yaesu ASCII grammar: `;`-terminated commands, fixed-width replies.
//!
//! Responses are checked against fixed-width templates before any field is
//! sliced out, so a frame that does not match yields `None` and never a
//! partially populated value. Template characters:
//! - `#` one ASCII digit
//! - `.` any single byte
//! - `w` one word character (`[A-Za-z0-9_]`)
//! - `+` a sign, `+` or `-`
//! - anything else matches itself

use std::ops::Range;

use crate::cat::{CatEngine, CatQuery};
use crate::domain::{Mode, RigError, RigResult};
use crate::ports::{SerialConnection, SerialParams};

/// Frame delimiter for every Yaesu ASCII command and reply
pub const DELIMITER: u8 = b';';

/// Single source of truth for the Yaesu mode code mapping.
/// Codes not listed here (e.g. `A`, DATA-FM) map to `Mode::Other`.
pub const MODE_TABLE: &[(u8, Mode)] = &[
    (b'1', Mode::Lsb),
    (b'2', Mode::Usb),
    (b'3', Mode::Cw),
    (b'4', Mode::Fm),
    (b'5', Mode::Am),
    (b'6', Mode::Rtty),
    (b'7', Mode::Cw),
    (b'8', Mode::Data),
    (b'9', Mode::Rtty),
    (b'B', Mode::Fm),
    (b'C', Mode::Data),
    (b'D', Mode::Am),
];

pub fn mode_from_code(code: u8) -> Mode {
    MODE_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, mode)| *mode)
        .unwrap_or(Mode::Other)
}

pub fn matches_template(frame: &str, template: &str) -> bool {
    let frame = frame.as_bytes();
    let template = template.as_bytes();
    frame.len() == template.len()
        && frame.iter().zip(template).all(|(&b, &t)| match t {
            b'#' => b.is_ascii_digit(),
            b'.' => true,
            b'w' => b.is_ascii_alphanumeric() || b == b'_',
            b'+' => b == b'+' || b == b'-',
            _ => b == t,
        })
}

/// Parse a digit run of a frame already validated by `matches_template`.
pub fn number_field(frame: &str, range: Range<usize>) -> Option<u64> {
    frame.get(range)?.parse().ok()
}

/// Apply Yaesu line settings and start the CAT engine on `serial`.
pub fn open_engine(
    mut serial: Box<dyn SerialConnection>,
    baud_rate: u32,
    hint: Option<&'static str>,
) -> RigResult<CatEngine<String>> {
    serial.set_parameters(&SerialParams::yaesu(baud_rate))?;
    CatEngine::start(serial, DELIMITER, hint)
}

/// Identification handshake. On mismatch the engine is closed and no
/// further I/O happens.
pub fn identify(engine: &mut CatEngine<String>, expected: u16, radio_name: &str) -> RigResult<()> {
    let id = match engine.query(&Identification) {
        Ok(id) => id,
        Err(e) => {
            engine.close();
            return Err(e);
        }
    };
    if id != expected {
        log::error!("Radio identified as {id:04}, expected {expected:04} ({radio_name})");
        engine.close();
        return Err(RigError::IdentityMismatch(radio_name.to_string()));
    }
    log::info!("Radio identified as {radio_name} (ID{id:04})");
    Ok(())
}

/// `ID;` → `ID####;`, the four-digit model code.
pub struct Identification;

impl CatQuery<String> for Identification {
    type Response = u16;

    fn query_data(&self) -> String {
        "ID;".into()
    }

    fn parse_response(&self, frame: &String) -> Option<u16> {
        if !matches_template(frame, "ID####;") {
            return None;
        }
        number_field(frame, 2..6).map(|id| id as u16)
    }
}

/// Frequency and mode from the `IF;` information reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoResponse {
    pub freq: u64,
    pub mode: Mode,
}

/// `IF;` → `IF...#########+#####0w..00.;`
pub struct Info;

impl CatQuery<String> for Info {
    type Response = InfoResponse;

    fn query_data(&self) -> String {
        "IF;".into()
    }

    fn parse_response(&self, frame: &String) -> Option<InfoResponse> {
        if !matches_template(frame, "IF...#########+#####0w..00.;") {
            return None;
        }
        Some(InfoResponse {
            freq: number_field(frame, 5..14)?,
            mode: mode_from_code(frame.as_bytes()[21]),
        })
    }
}

/// `TX;` → `TX0;` receiving, `TX1;`/`TX2;` transmitting.
pub struct Tx;

impl CatQuery<String> for Tx {
    type Response = bool;

    fn query_data(&self) -> String {
        "TX;".into()
    }

    fn parse_response(&self, frame: &String) -> Option<bool> {
        match frame.as_str() {
            "TX0;" => Some(false),
            "TX1;" | "TX2;" => Some(true),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_requires_exact_width() {
        assert!(matches_template("ID0650;", "ID####;"));
        assert!(!matches_template("ID650;", "ID####;"));
        assert!(!matches_template("ID06500;", "ID####;"));
        assert!(!matches_template("ID06a0;", "ID####;"));
    }

    #[test]
    fn template_sign_and_word_classes() {
        assert!(matches_template("+a", "+w"));
        assert!(matches_template("-_", "+w"));
        assert!(!matches_template("0a", "+w"));
        assert!(!matches_template("+;", "+w"));
    }

    #[test]
    fn identification_parses_model_code() {
        assert_eq!(Identification.parse_response(&"ID0650;".into()), Some(650));
        assert_eq!(Identification.parse_response(&"ID0670;".into()), Some(670));
        assert_eq!(Identification.parse_response(&"?;".into()), None);
    }

    #[test]
    fn info_parses_frequency_and_mode() {
        let frame = "IF001014250000+000000300000;".to_string();
        assert_eq!(
            Info.parse_response(&frame),
            Some(InfoResponse {
                freq: 14_250_000,
                mode: Mode::Cw
            })
        );
    }

    #[test]
    fn info_negative_clarifier_and_word_mode() {
        let frame = "IF001007074000-001200C00000;".to_string();
        assert_eq!(
            Info.parse_response(&frame),
            Some(InfoResponse {
                freq: 7_074_000,
                mode: Mode::Data
            })
        );
    }

    #[test]
    fn info_rejects_malformed_frames() {
        for frame in [
            "IF00114250000+0000000003000 ;", // eight-digit frequency
            "IF001014250000+000001300000;",  // non-zero where 0 is fixed
            "IF001014250000*000000300000;",  // bad sign
            "IF001014250000+000000300010;",  // bad fixed 00
            "FA014250000;",
            "",
        ] {
            assert_eq!(Info.parse_response(&frame.to_string()), None, "{frame}");
        }
    }

    #[test]
    fn tx_parse() {
        assert_eq!(Tx.parse_response(&"TX0;".into()), Some(false));
        assert_eq!(Tx.parse_response(&"TX1;".into()), Some(true));
        assert_eq!(Tx.parse_response(&"TX2;".into()), Some(true));
        assert_eq!(Tx.parse_response(&"TX3;".into()), None);
        assert_eq!(Tx.parse_response(&"TX;".into()), None);
    }

    #[test]
    fn mode_table_lookup() {
        assert_eq!(mode_from_code(b'1'), Mode::Lsb);
        assert_eq!(mode_from_code(b'2'), Mode::Usb);
        assert_eq!(mode_from_code(b'9'), Mode::Rtty);
        assert_eq!(mode_from_code(b'B'), Mode::Fm);
        assert_eq!(mode_from_code(b'D'), Mode::Am);
        assert_eq!(mode_from_code(b'A'), Mode::Other);
        assert_eq!(mode_from_code(b'E'), Mode::Other);
    }
}
