//! Serial port adapter using the `serialport` crate
//!
//! Implements `SerialFactory` and `SerialConnection` traits.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use crate::domain::{RigError, RigResult, SerialPortInfo};
use crate::ports::{Parity, SerialConnection, SerialFactory, SerialParams};

/// Read timeout; the reader thread re-checks its stop flag this often
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Zero-sized factory for creating serial port connections.
pub struct SerialPortFactory;

impl SerialFactory for SerialPortFactory {
    fn list_ports() -> RigResult<Vec<SerialPortInfo>> {
        let ports = serialport::available_ports()
            .map_err(|e| RigError::Io(format!("Failed to list ports: {e}")))?;

        Ok(ports
            .into_iter()
            .map(|p| {
                let port_type = match &p.port_type {
                    serialport::SerialPortType::UsbPort(info) => {
                        format!("USB ({:04X}:{:04X})", info.vid, info.pid)
                    }
                    serialport::SerialPortType::PciPort => "PCI".to_string(),
                    serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                    serialport::SerialPortType::Unknown => "Native".to_string(),
                };
                SerialPortInfo {
                    name: p.port_name,
                    port_type,
                }
            })
            .collect())
    }

    fn open(port: &str, baud_rate: u32) -> RigResult<Box<dyn SerialConnection>> {
        let serial = serialport::new(port, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| RigError::Io(format!("Failed to open {port}: {e}")))?;

        log::info!("Opened serial port {port} at {baud_rate} baud");
        Ok(Box::new(SerialPortConnection { port: Some(serial) }))
    }
}

/// An open serial port connection wrapping the `serialport` crate.
/// Closing drops the handle, which releases the OS port.
pub struct SerialPortConnection {
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialPortConnection {
    fn port(&mut self) -> RigResult<&mut Box<dyn serialport::SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| RigError::Io("Serial port is closed".into()))
    }
}

impl SerialConnection for SerialPortConnection {
    fn write(&mut self, data: &[u8]) -> RigResult<()> {
        let port = self.port()?;
        port.write_all(data)
            .and_then(|()| port.flush())
            .map_err(|e| RigError::Io(format!("Write failed: {e}")))
    }

    fn read(&mut self, buffer: &mut [u8]) -> RigResult<usize> {
        match self.port()?.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(RigError::Io(format!("Read failed: {e}"))),
        }
    }

    fn set_parameters(&mut self, params: &SerialParams) -> RigResult<()> {
        let data_bits = match params.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            n => return Err(RigError::Config(format!("Unsupported data bits: {n}"))),
        };
        let stop_bits = match params.stop_bits {
            1 => serialport::StopBits::One,
            2 => serialport::StopBits::Two,
            n => return Err(RigError::Config(format!("Unsupported stop bits: {n}"))),
        };
        let parity = match params.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        };

        let port = self.port()?;
        let io_err = |e: serialport::Error| RigError::Io(format!("Failed to configure port: {e}"));
        port.set_baud_rate(params.baud_rate).map_err(io_err)?;
        port.set_data_bits(data_bits).map_err(io_err)?;
        port.set_stop_bits(stop_bits).map_err(io_err)?;
        port.set_parity(parity).map_err(io_err)?;
        port.write_request_to_send(params.rts).map_err(io_err)?;
        log::debug!("Serial parameters applied: {params:?}");
        Ok(())
    }

    fn try_clone(&self) -> RigResult<Box<dyn SerialConnection>> {
        let port = self
            .port
            .as_ref()
            .ok_or_else(|| RigError::Io("Serial port is closed".into()))?;
        let clone = port
            .try_clone()
            .map_err(|e| RigError::Io(format!("Failed to clone port: {e}")))?;
        Ok(Box::new(SerialPortConnection { port: Some(clone) }))
    }

    fn close(&mut self) -> RigResult<()> {
        if self.port.take().is_some() {
            log::info!("Serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}
