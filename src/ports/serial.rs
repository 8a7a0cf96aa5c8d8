//! Serial port traits
//!
//! Split into two traits:
//! - `SerialFactory`: static methods for listing and opening ports
//! - `SerialConnection`: instance methods for reading/writing data

use crate::domain::{RigResult, SerialPortInfo};

/// Line settings applied before the CAT engine starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialParams {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    /// Hold RTS asserted for the lifetime of the connection
    pub rts: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl SerialParams {
    /// 8 data bits, 2 stop bits, no parity, RTS held. What Yaesu rigs expect.
    pub fn yaesu(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: 8,
            stop_bits: 2,
            parity: Parity::None,
            rts: true,
        }
    }
}

/// Factory for creating serial connections.
pub trait SerialFactory {
    /// List available serial ports on the system
    fn list_ports() -> RigResult<Vec<SerialPortInfo>>;

    /// Open a serial port at the given baud rate, returning a boxed connection
    fn open(port: &str, baud_rate: u32) -> RigResult<Box<dyn SerialConnection>>;
}

/// Trait for an open serial port connection.
/// Only requires `Send` (not `Sync`): the writer half lives behind the engine,
/// the reader half (from `try_clone`) on the reader thread.
pub trait SerialConnection: Send {
    /// Write all bytes to the port
    fn write(&mut self, data: &[u8]) -> RigResult<()>;

    /// Read bytes from the port. `Ok(0)` means the read timed out with no data.
    fn read(&mut self, buffer: &mut [u8]) -> RigResult<usize>;

    fn set_parameters(&mut self, params: &SerialParams) -> RigResult<()>;

    /// A second handle onto the same port for the background reader.
    fn try_clone(&self) -> RigResult<Box<dyn SerialConnection>>;

    /// Close the connection
    fn close(&mut self) -> RigResult<()>;

    /// Check if the port is still connected
    fn is_connected(&self) -> bool;
}
