//! State shared by both track threads: the muxer handle, track
//! registration and sample writes.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::sync::{ErrorSlot, MuxSyncGate, RegistrationWait};
use crate::domain::{RigError, RigResult};
use crate::ports::{EncodedBuffer, MediaFormat, Muxer};

/// Track ids as registered with the gate
pub const VIDEO_TRACK: usize = 0;
pub const AUDIO_TRACK: usize = 1;
pub const TRACK_COUNT: usize = 2;

/// How long a track with output waits for its sibling's format
pub const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Encoder poll timeout inside a drain loop
pub const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);

/// How long finalization waits for the end-of-stream buffer
pub const FINALIZE_TIMEOUT: Duration = Duration::from_secs(2);

/// The muxer behind a lock; every access goes through `with`.
#[derive(Clone)]
pub struct SharedMuxer {
    inner: Arc<Mutex<Box<dyn Muxer>>>,
}

impl SharedMuxer {
    pub fn new(muxer: Box<dyn Muxer>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(muxer)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Muxer) -> RigResult<R>) -> RigResult<R> {
        let mut muxer = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **muxer)
    }
}

/// One track's view of the shared recording state.
pub struct TrackContext {
    id: usize,
    name: &'static str,
    gate: Arc<MuxSyncGate>,
    muxer: SharedMuxer,
    errors: Arc<ErrorSlot>,
    format: Option<MediaFormat>,
    track_index: Option<usize>,
    /// Declared alongside this track (video carries the status metadata)
    meta_format: Option<MediaFormat>,
    meta_index: Option<usize>,
    registration_timeout: Duration,
}

impl TrackContext {
    pub fn new(
        id: usize,
        name: &'static str,
        gate: Arc<MuxSyncGate>,
        muxer: SharedMuxer,
        errors: Arc<ErrorSlot>,
    ) -> Self {
        Self {
            id,
            name,
            gate,
            muxer,
            errors,
            format: None,
            track_index: None,
            meta_format: None,
            meta_index: None,
            registration_timeout: REGISTRATION_TIMEOUT,
        }
    }

    pub fn with_metadata_track(mut self, format: MediaFormat) -> Self {
        self.meta_format = Some(format);
        self
    }

    pub fn with_registration_timeout(mut self, timeout: Duration) -> Self {
        self.registration_timeout = timeout;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn gate(&self) -> &MuxSyncGate {
        &self.gate
    }

    /// Encoder reported its output format.
    pub fn on_format_changed(&mut self, format: MediaFormat) -> RigResult<()> {
        if self.format.is_some() {
            log::warn!("{} encoder changed format again, ignoring", self.name);
            return Ok(());
        }
        log::debug!("{} output format: {format:?}", self.name);
        self.format = Some(format);
        self.ensure_track_added()
    }

    /// Record a failure and tell the sibling track to wind down.
    pub fn fail(&self, error: RigError) {
        log::error!("Error in {} track: {error}", self.name);
        self.errors.record(error);
        self.gate.request_stop();
    }

    /// Add this track (and its metadata track, if any) to the muxer and
    /// register with the gate. Runs once.
    fn ensure_track_added(&mut self) -> RigResult<()> {
        if self.track_index.is_some() {
            return Ok(());
        }
        let format = self.format.clone().ok_or_else(|| {
            RigError::Encoder(format!("{} encoder produced output before its format", self.name))
        })?;
        let meta_format = self.meta_format.clone();

        let (track, meta) = self.muxer.with(|muxer| {
            let track = muxer.add_track(&format)?;
            let meta = match &meta_format {
                Some(f) => Some(muxer.add_track(f)?),
                None => None,
            };
            Ok((track, meta))
        })?;

        self.track_index = Some(track);
        self.meta_index = meta;
        self.gate.register_track(self.id)?;
        log::info!("{} track added to muxer as #{track}", self.name);
        Ok(())
    }

    /// Wait for every track, then start the muxer if nobody has yet.
    /// Returns false if the recording stopped before all tracks registered.
    fn ensure_muxer_started(&self) -> RigResult<bool> {
        match self.gate.await_all_registered(self.registration_timeout) {
            RegistrationWait::Complete => {}
            RegistrationWait::Stopped => return Ok(false),
            RegistrationWait::TimedOut => {
                return Err(RigError::Muxer(format!(
                    "{} track timed out waiting for the other tracks to register",
                    self.name
                )))
            }
        }

        // Test-and-set under the muxer lock: once the flag reads true, start() has run
        let gate = &self.gate;
        self.muxer.with(|muxer| {
            if gate.try_start_muxer() {
                log::info!("Starting muxer");
                muxer.start()?;
            }
            Ok(())
        })?;
        Ok(true)
    }

    /// Write one encoded sample. Returns false if it was dropped because
    /// the recording stopped before the muxer could start.
    pub fn write_sample(&mut self, sample: &EncodedBuffer) -> RigResult<bool> {
        self.ensure_track_added()?;
        if !self.ensure_muxer_started()? {
            log::debug!("{} sample dropped, muxer never started", self.name);
            return Ok(false);
        }
        let track = self.track_index.ok_or_else(|| {
            RigError::Muxer(format!("{} track has no muxer index", self.name))
        })?;
        self.muxer.with(|muxer| muxer.write_sample(track, sample))?;
        Ok(true)
    }

    /// Write a metadata record. Skipped until the muxer has started.
    pub fn write_metadata(&self, data: Vec<u8>, pts_us: u64) -> RigResult<bool> {
        let Some(meta) = self.meta_index else {
            return Ok(false);
        };
        if !self.gate.is_muxer_started() {
            return Ok(false);
        }
        let sample = EncodedBuffer {
            data,
            pts_us,
            key_frame: true,
            end_of_stream: false,
        };
        self.muxer.with(|muxer| muxer.write_sample(meta, &sample))?;
        Ok(true)
    }
}
