//! Device discovery commands: serial ports, audio inputs, supported radios

use serde::Serialize;

use crate::adapters::cpal_audio::CpalAudioInput;
use crate::adapters::serial_port::SerialPortFactory;
use crate::domain::{AudioDeviceInfo, RadioType, RigResult, SerialPortInfo};
use crate::ports::{AudioInput, SerialFactory};

/// A supported radio as offered to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadioTypeInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub baud_rates: &'static [u32],
}

pub fn list_serial_ports() -> RigResult<Vec<SerialPortInfo>> {
    SerialPortFactory::list_ports()
}

pub fn list_audio_devices() -> RigResult<Vec<AudioDeviceInfo>> {
    CpalAudioInput::new().list_devices()
}

pub fn list_radio_types() -> Vec<RadioTypeInfo> {
    RadioType::ALL
        .into_iter()
        .map(|radio| RadioTypeInfo {
            id: radio.id(),
            name: radio.name(),
            baud_rates: radio.baud_rates(),
        })
        .collect()
}
