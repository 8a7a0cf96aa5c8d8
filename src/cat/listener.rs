//! Frame reassembly and the bounded response queue.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

use super::CatFrame;
use crate::domain::{RigError, RigResult};

/// Response queue capacity.
pub const QUEUE_CAP: usize = 16;

/// Create a listener and the queue it feeds.
pub fn frame_channel<F: CatFrame>(delimiter: u8) -> (FrameListener<F>, FrameQueue<F>) {
    let (tx, rx) = crossbeam_channel::bounded(QUEUE_CAP);
    (
        FrameListener {
            delimiter,
            buffer: Vec::new(),
            tx,
        },
        FrameQueue { rx },
    )
}

/// Accumulates serial chunks until the buffer ends with the delimiter, then
/// publishes the whole buffer as one frame.
pub struct FrameListener<F> {
    delimiter: u8,
    buffer: Vec<u8>,
    tx: Sender<RigResult<F>>,
}

impl<F: CatFrame> FrameListener<F> {
    pub fn on_new_data(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.last() == Some(&self.delimiter) {
            let bytes = std::mem::take(&mut self.buffer);
            self.enqueue(F::from_wire(bytes));
        }
    }

    /// Transport failure while reading.
    pub fn on_run_error(&mut self, error: RigError) {
        self.enqueue(Err(error));
    }

    /// Bytes received so far for the frame in progress.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    fn enqueue(&self, item: RigResult<F>) {
        // The last free slot is reserved for the overflow marker
        let remaining = QUEUE_CAP.saturating_sub(self.tx.len());
        let item = if remaining <= 1 {
            Err(RigError::QueueOverflow)
        } else {
            item
        };
        match self.tx.try_send(item) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::error!("CAT response queue full, frame dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("CAT response queue closed, frame dropped");
            }
        }
    }
}

/// Consumer side of the response queue, owned by the engine.
pub struct FrameQueue<F> {
    rx: Receiver<RigResult<F>>,
}

impl<F> FrameQueue<F> {
    /// Block up to `timeout` for the next frame or error.
    pub fn next_frame(&self, timeout: Duration) -> RigResult<F> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => item,
            Err(RecvTimeoutError::Timeout) => Err(RigError::Timeout {
                what: "CAT response".into(),
                hint: None,
            }),
            Err(RecvTimeoutError::Disconnected) => {
                Err(RigError::Io("CAT reader stopped".into()))
            }
        }
    }

    /// Next queued item without waiting.
    pub fn try_next_frame(&self) -> Option<RigResult<F>> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
