//! Radio dialects and the radio session.
//!
//! The dialect set is closed: `RadioType` selects one of the modules below,
//! and `RadioType::open` is the only way to bind a dialect to a port.

pub mod ft891;
pub mod ft991a;
pub mod mocked;
pub mod session;
pub mod yaesu;

pub use ft891::Ft891Radio;
pub use ft991a::Ft991aRadio;
pub use mocked::MockedRadio;
pub use session::RadioSession;

use crate::domain::{RadioType, RigError, RigResult};
use crate::ports::{RadioIo, SerialConnection};

impl RadioType {
    /// Bind this dialect to an open port at `baud_rate`, including the
    /// identification handshake.
    pub fn open(
        self,
        serial: Box<dyn SerialConnection>,
        baud_rate: u32,
    ) -> RigResult<Box<dyn RadioIo>> {
        if !self.baud_rates().contains(&baud_rate) {
            return Err(RigError::Config(format!(
                "{self} does not support {baud_rate} baud"
            )));
        }
        match self {
            RadioType::YaesuFt891 => Ok(Box::new(Ft891Radio::open(serial, baud_rate)?)),
            RadioType::YaesuFt991a => Ok(Box::new(Ft991aRadio::open(serial, baud_rate)?)),
            RadioType::Mocked => Err(RigError::Config(
                "The emulated radio cannot be opened on a serial port".into(),
            )),
        }
    }
}
