//! Background serial reader feeding a FrameListener.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::{CatFrame, FrameListener};
use crate::domain::{RigError, RigResult};
use crate::ports::SerialConnection;

/// Chunk size for each serial read call
const READ_CHUNK_SIZE: usize = 64;

/// Owns the reader half of the serial port on a dedicated thread.
///
/// The thread exits after the first transport error (which it forwards to
/// the listener) or when stopped. Reads time out every ~100ms, so `stop`
/// returns promptly.
pub struct SerialReader {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SerialReader {
    pub fn spawn<F: CatFrame>(
        mut serial: Box<dyn SerialConnection>,
        mut listener: FrameListener<F>,
    ) -> RigResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("cat-reader".into())
            .spawn(move || {
                let mut chunk = [0u8; READ_CHUNK_SIZE];
                while flag.load(Ordering::SeqCst) {
                    match serial.read(&mut chunk) {
                        Ok(0) => {} // read timed out, poll the flag again
                        Ok(n) => {
                            log::trace!("CAT RX chunk: {:?}", String::from_utf8_lossy(&chunk[..n]));
                            listener.on_new_data(&chunk[..n]);
                        }
                        Err(e) => {
                            if flag.load(Ordering::SeqCst) {
                                log::error!("CAT serial read failed: {e}");
                                listener.on_run_error(e);
                            }
                            break;
                        }
                    }
                }
                flag.store(false, Ordering::SeqCst);
                log::debug!("CAT reader thread exiting");
            })
            .map_err(|e| RigError::Io(format!("Failed to spawn CAT reader: {e}")))?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal the thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("CAT reader thread panicked");
            }
        }
    }
}

impl Drop for SerialReader {
    fn drop(&mut self) {
        self.stop();
    }
}
