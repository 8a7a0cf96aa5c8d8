//! Recording session controller
//!
//! Owns the single-recording guard and wires the radio session and location
//! tracker into the orchestrator's sample function.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::encoder::{RecordingEncoder, RecordingMedia, RecordingReport, RecordingSettings};
use crate::domain::{Configuration, RigError, RigResult, StatusData};
use crate::location::LocationTracker;
use crate::radio::RadioSession;

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceState {
    Stopped,
    StartingUp,
    /// Recording, with the most recent status sample
    Running(Box<StatusData>),
    /// Stop requested; the tracks are still draining and the muxer finalizing
    Stopping,
    Error(RigError),
}

impl ServiceState {
    /// A recording job exists and holds the radio session and media.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ServiceState::StartingUp | ServiceState::Running(_) | ServiceState::Stopping
        )
    }

    fn is_accepting_samples(&self) -> bool {
        matches!(self, ServiceState::StartingUp | ServiceState::Running(_))
    }
}

pub struct RecordingService {
    radio: Arc<RadioSession>,
    location: Arc<LocationTracker>,
    state: Mutex<ServiceState>,
}

impl RecordingService {
    pub fn new(radio: Arc<RadioSession>, location: Arc<LocationTracker>) -> Self {
        Self {
            radio,
            location,
            state: Mutex::new(ServiceState::Stopped),
        }
    }

    pub fn state(&self) -> ServiceState {
        self.lock().clone()
    }

    pub fn latest_status(&self) -> Option<StatusData> {
        match &*self.lock() {
            ServiceState::Running(status) => Some((**status).clone()),
            _ => None,
        }
    }

    /// Record one session into `config.output_dir`. Blocks until the radio
    /// session ends, `stop` is called or the recording fails.
    ///
    /// `open_media` receives the output file path and builds the encoders
    /// and muxer; it is only called once the radio session is confirmed.
    pub fn run<F>(&self, config: &Configuration, open_media: F) -> RigResult<RecordingReport>
    where
        F: FnOnce(&Path) -> RigResult<RecordingMedia>,
    {
        self.begin()?;
        let result = self.record(config, open_media);

        // The radio session ends with the recording, whichever side finished first
        self.radio.stop();

        let mut state = self.lock();
        match &result {
            Ok(_) => *state = ServiceState::Stopped,
            Err(e) => *state = ServiceState::Error(e.clone()),
        }
        result
    }

    /// Ask the recording to end. The video thread sees the radio session
    /// close on its next sample and winds both tracks down; the state stays
    /// `Stopping` until `run` has released the media.
    pub fn stop(&self) {
        log::info!("Recording stop requested");
        let mut state = self.lock();
        if state.is_accepting_samples() {
            *state = ServiceState::Stopping;
        }
        drop(state);
        self.radio.stop();
    }

    /// Acknowledge a failed recording, returning the service to Stopped.
    pub fn take_error(&self) -> Option<RigError> {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, ServiceState::Stopped) {
            ServiceState::Error(e) => Some(e),
            other => {
                *state = other;
                None
            }
        }
    }

    fn begin(&self) -> RigResult<()> {
        let mut state = self.lock();
        match *state {
            ServiceState::Stopped | ServiceState::Error(_) => {
                *state = ServiceState::StartingUp;
                Ok(())
            }
            _ => Err(RigError::AlreadyRunning),
        }
    }

    fn record<F>(&self, config: &Configuration, open_media: F) -> RigResult<RecordingReport>
    where
        F: FnOnce(&Path) -> RigResult<RecordingMedia>,
    {
        if !self.radio.is_running() {
            return Err(RigError::NotRunning);
        }

        let path = output_path(&config.output_dir, Utc::now())?;
        log::info!("Recording to {}", path.display());
        let media = open_media(&path)?;

        let encoder = RecordingEncoder::new(RecordingSettings::from_config(config));
        encoder.record(media, || self.sample())
    }

    fn sample(&self) -> RigResult<Option<StatusData>> {
        let Some(radio) = self.radio.read_operating_state()? else {
            return Ok(None);
        };
        let status = StatusData::new(radio, self.location.snapshot());

        let mut state = self.lock();
        if state.is_accepting_samples() {
            *state = ServiceState::Running(Box::new(status.clone()));
        }
        Ok(Some(status))
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `yyyy-MM-dd_HH-mm-ss.mp4`
pub fn recording_filename(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d_%H-%M-%S.mp4").to_string()
}

fn output_path(dir: &str, now: DateTime<Utc>) -> RigResult<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| RigError::Config(format!("Failed to create output directory {dir}: {e}")))?;
    let path = Path::new(dir).join(recording_filename(now));
    std::path::absolute(&path)
        .map_err(|e| RigError::Config(format!("Failed to resolve {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn service() -> RecordingService {
        RecordingService::new(
            Arc::new(RadioSession::new()),
            Arc::new(LocationTracker::default()),
        )
    }

    #[test]
    fn filename_uses_utc_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(recording_filename(now), "2024-03-09_07-05-01.mp4");
    }

    #[test]
    fn run_without_radio_session_fails_before_opening_media() {
        let dir = tempfile::tempdir().unwrap();
        let config = Configuration {
            output_dir: dir.path().to_string_lossy().into_owned(),
            ..Configuration::default()
        };
        let svc = service();
        let mut opened = false;
        let result = svc.run(&config, |_| {
            opened = true;
            Err(RigError::Muxer("unreachable".into()))
        });
        assert_eq!(result, Err(RigError::NotRunning));
        assert!(!opened);
        assert_eq!(svc.state(), ServiceState::Error(RigError::NotRunning));
    }

    #[test]
    fn take_error_returns_to_stopped() {
        let svc = service();
        *svc.lock() = ServiceState::Error(RigError::NotRunning);
        assert_eq!(svc.take_error(), Some(RigError::NotRunning));
        assert_eq!(svc.state(), ServiceState::Stopped);
        assert_eq!(svc.take_error(), None);
    }

    #[test]
    fn second_start_is_rejected_until_run_finishes() {
        let svc = service();
        svc.begin().unwrap();
        assert_eq!(svc.begin(), Err(RigError::AlreadyRunning));
        svc.stop();
        assert_eq!(svc.state(), ServiceState::Stopping);
        assert_eq!(svc.begin(), Err(RigError::AlreadyRunning));

        // Only the job itself moves the state on
        *svc.lock() = ServiceState::Stopped;
        assert!(svc.begin().is_ok());
    }

    #[test]
    fn stop_when_idle_leaves_state_alone() {
        let svc = service();
        svc.stop();
        assert_eq!(svc.state(), ServiceState::Stopped);
        *svc.lock() = ServiceState::Error(RigError::NotRunning);
        svc.stop();
        assert_eq!(svc.state(), ServiceState::Error(RigError::NotRunning));
    }

    #[test]
    fn sample_reports_end_when_radio_idle() {
        let svc = service();
        assert_eq!(svc.sample(), Ok(None));
        assert!(svc.latest_status().is_none());
    }
}
