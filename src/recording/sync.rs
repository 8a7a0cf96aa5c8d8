//! Coordination shared by the track threads and the orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::domain::{RigError, RigResult};

/// Outcome of waiting for every track to register its format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationWait {
    Complete,
    /// Stop was requested before every track registered.
    Stopped,
    TimedOut,
}

/// Gates the muxer start on every track having declared its format, and
/// carries the cooperative stop flag.
///
/// Registration is a countdown barrier: each track registers once under its
/// own id, and `await_all_registered` returns once all ids are in. The muxer
/// start is a test-and-set so exactly one caller performs it.
pub struct MuxSyncGate {
    registered: Mutex<Vec<bool>>,
    all_registered: Condvar,
    muxer_started: AtomicBool,
    stop: AtomicBool,
}

impl MuxSyncGate {
    pub fn new(expected_tracks: usize) -> Self {
        Self {
            registered: Mutex::new(vec![false; expected_tracks]),
            all_registered: Condvar::new(),
            muxer_started: AtomicBool::new(false),
            stop: AtomicBool::new(false),
        }
    }

    pub fn expected_tracks(&self) -> usize {
        self.lock().len()
    }

    pub fn registered_tracks(&self) -> usize {
        self.lock().iter().filter(|r| **r).count()
    }

    /// Mark track `id` as registered. Returns false if it already was.
    pub fn register_track(&self, id: usize) -> RigResult<bool> {
        let mut registered = self.lock();
        let expected = registered.len();
        let slot = registered.get_mut(id).ok_or_else(|| {
            RigError::Muxer(format!("Track id {id} out of range, expecting {expected} tracks"))
        })?;
        if *slot {
            return Ok(false);
        }
        *slot = true;
        if registered.iter().all(|r| *r) {
            self.all_registered.notify_all();
        }
        Ok(true)
    }

    /// Block until every track has registered, stop is requested, or
    /// `timeout` elapses. A complete registration wins over a stop request.
    pub fn await_all_registered(&self, timeout: Duration) -> RegistrationWait {
        let deadline = Instant::now() + timeout;
        let mut registered = self.lock();
        loop {
            if registered.iter().all(|r| *r) {
                return RegistrationWait::Complete;
            }
            if self.is_stopped() {
                return RegistrationWait::Stopped;
            }
            let now = Instant::now();
            if now >= deadline {
                return RegistrationWait::TimedOut;
            }
            registered = self
                .all_registered
                .wait_timeout(registered, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// True for exactly one caller: the one that must start the muxer.
    pub fn try_start_muxer(&self) -> bool {
        self.muxer_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_muxer_started(&self) -> bool {
        self.muxer_started.load(Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        // Take the lock so a waiter between its checks and its wait sees the flag
        let _registered = self.lock();
        self.all_registered.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<bool>> {
        self.registered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the first error reported by any track; later ones are logged and dropped.
#[derive(Default)]
pub struct ErrorSlot {
    first: Mutex<Option<RigError>>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this was the first error.
    pub fn record(&self, error: RigError) -> bool {
        let mut first = self.first.lock().unwrap_or_else(PoisonError::into_inner);
        if first.is_some() {
            log::warn!("Discarding subsequent recording error: {error}");
            return false;
        }
        *first = Some(error);
        true
    }

    pub fn take(&self) -> Option<RigError> {
        self.first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
