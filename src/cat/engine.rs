//! CatEngine: request/response state machine over a half-duplex serial line.
//!
//! Responses carry no request ID, so they are matched positionally: one query
//! in flight at a time, and `&mut self` on every operation enforces that.

use std::time::Duration;

use super::{frame_channel, CatCommand, CatFrame, CatQuery, FrameQueue, SerialReader};
use crate::domain::{RigError, RigResult};
use crate::ports::SerialConnection;

/// How long a query waits for its response
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(2000);

pub struct CatEngine<F: CatFrame> {
    serial: Box<dyn SerialConnection>,
    queue: FrameQueue<F>,
    reader: SerialReader,
    timeout: Duration,
    hint: Option<&'static str>,
    closed: bool,
}

impl<F: CatFrame> CatEngine<F> {
    /// Start the background reader on a clone of `serial` and take ownership
    /// of the writer half. `hint` is attached to timeout errors.
    pub fn start(
        serial: Box<dyn SerialConnection>,
        delimiter: u8,
        hint: Option<&'static str>,
    ) -> RigResult<Self> {
        let reader_half = serial.try_clone()?;
        let (listener, queue) = frame_channel(delimiter);
        let reader = SerialReader::spawn(reader_half, listener)?;
        Ok(Self {
            serial,
            queue,
            reader,
            timeout: RESPONSE_TIMEOUT,
            hint,
            closed: false,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn send_command<C: CatCommand<F>>(&mut self, cmd: &C) -> RigResult<()> {
        let frame = cmd.command_data();
        log::debug!("CAT TX: {frame:?}");
        self.write(&frame)
    }

    /// Write the query and block for its response.
    pub fn query<Q: CatQuery<F>>(&mut self, query: &Q) -> RigResult<Q::Response> {
        self.drain_stale()?;

        let frame = query.query_data();
        log::debug!("CAT TX: {frame:?}");
        self.write(&frame)?;

        let hint = self.hint;
        let response = self.queue.next_frame(self.timeout).map_err(|e| match e {
            RigError::Timeout { .. } => RigError::Timeout {
                what: format!("response to {frame:?}"),
                hint: None,
            }
            .with_hint(hint),
            other => other,
        })?;
        log::debug!("CAT RX: {response:?}");

        query.parse_response(&response).ok_or_else(|| {
            RigError::Parse(format!("Unexpected response {response:?} to {frame:?}"))
        })
    }

    /// Stop the reader and release the port. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.reader.stop();
        if let Err(e) = self.serial.close() {
            log::warn!("Closing serial port failed: {e}");
        }
        log::debug!("CAT engine closed");
    }

    fn write(&mut self, frame: &F) -> RigResult<()> {
        if self.closed {
            return Err(RigError::Io("CAT engine is closed".into()));
        }
        self.serial.write(&frame.to_wire()).map_err(|e| match e {
            RigError::Io(_) => e,
            other => RigError::Io(other.to_string()),
        })
    }

    /// Frames that arrived with no query waiting (unsolicited output, late
    /// replies after a timeout) would shift every following response by one.
    fn drain_stale(&mut self) -> RigResult<()> {
        while let Some(item) = self.queue.try_next_frame() {
            match item {
                Ok(frame) => log::warn!("CAT discarding stale frame {frame:?}"),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<F: CatFrame> Drop for CatEngine<F> {
    fn drop(&mut self) {
        self.close();
    }
}
