//! RadioSession: the single point of truth for "is a radio session active".
//!
//! Owned by the top-level controller and shared by `Arc`. Start, stop and
//! read all run under one lock, so UI-triggered stops never race a read in
//! flight on the recording thread.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{OperatingState, RadioType, RigError, RigResult};
use crate::ports::{RadioIo, SerialConnection};

use super::mocked::MockedRadio;

#[derive(Default)]
pub struct RadioSession {
    io: Mutex<Option<Box<dyn RadioIo>>>,
}

impl RadioSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `radio` on an already-open port. Runs the identification
    /// handshake before the session counts as running.
    pub fn start(
        &self,
        serial: Box<dyn SerialConnection>,
        radio: RadioType,
        baud_rate: u32,
    ) -> RigResult<()> {
        let mut io = self.lock();
        if io.is_some() {
            return Err(RigError::AlreadyRunning);
        }
        *io = Some(radio.open(serial, baud_rate)?);
        log::info!("Radio session started: {radio} at {baud_rate} baud");
        Ok(())
    }

    /// Start the emulated radio. No transport, no handshake.
    pub fn start_mocked(&self) -> RigResult<()> {
        self.start_with(Box::new(MockedRadio::new()))
    }

    /// Start with a radio that is already open.
    pub fn start_with(&self, radio: Box<dyn RadioIo>) -> RigResult<()> {
        let mut io = self.lock();
        if io.is_some() {
            return Err(RigError::AlreadyRunning);
        }
        *io = Some(radio);
        log::info!("Radio session started");
        Ok(())
    }

    /// Latest operating state, or `None` once the session has ended.
    ///
    /// A failed read closes the radio and ends the session before the error
    /// is returned.
    pub fn read_operating_state(&self) -> RigResult<Option<OperatingState>> {
        let mut io = self.lock();
        let Some(radio) = io.as_mut() else {
            return Ok(None);
        };
        match radio.read_operating_state() {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                log::error!("Radio read failed, ending session: {e}");
                radio.close();
                *io = None;
                Err(e)
            }
        }
    }

    /// Close the radio. Does nothing when no session is running.
    pub fn stop(&self) {
        if let Some(mut radio) = self.lock().take() {
            radio.close();
            log::info!("Radio session stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn RadioIo>>> {
        self.io.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
