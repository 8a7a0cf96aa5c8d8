//! Recording commands: open the radio session and record until stopped

use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::adapters::serial_port::SerialPortFactory;
use crate::adapters::software_media;
use crate::domain::{Configuration, RadioType, RigError, RigResult};
use crate::ports::SerialFactory;
use crate::recording::{RecordingReport, RecordingService};
use crate::state::AppState;

/// Start the radio session described by `config`: the emulated radio, or the
/// configured serial port with the identification handshake.
pub fn start_radio(state: &AppState, config: &Configuration) -> RigResult<()> {
    match config.radio_type {
        RadioType::Mocked => state.radio.start_mocked(),
        radio => {
            let port = config
                .serial_port
                .as_deref()
                .ok_or_else(|| RigError::Config("No serial port configured".into()))?;
            let baud_rate = config.effective_baud_rate();
            let serial = SerialPortFactory::open(port, baud_rate)?;
            state.radio.start(serial, radio, baud_rate)
        }
    }
}

/// Record one session. Stops when Enter is pressed on stdin, when the
/// configured maximum duration elapses, or when the radio session ends.
pub fn record_session(state: &AppState, config: &Configuration) -> RigResult<RecordingReport> {
    start_radio(state, config)?;

    spawn_stdin_stop(Arc::clone(&state.recording));
    if let Some(secs) = config.max_duration_secs {
        spawn_timed_stop(Arc::clone(&state.recording), Duration::from_secs(secs));
    }

    state
        .recording
        .run(config, |path| software_media(config, path))
}

fn spawn_stdin_stop(recording: Arc<RecordingService>) {
    let spawned = thread::Builder::new()
        .name("stdin-stop".into())
        .spawn(move || {
            let mut line = String::new();
            if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
                log::warn!("Reading stdin failed: {e}");
            }
            recording.stop();
        });
    if let Err(e) = spawned {
        log::warn!("Failed to spawn stdin watcher: {e}");
    }
}

fn spawn_timed_stop(recording: Arc<RecordingService>, after: Duration) {
    let spawned = thread::Builder::new()
        .name("timed-stop".into())
        .spawn(move || {
            thread::sleep(after);
            log::info!("Maximum duration of {}s reached", after.as_secs());
            recording.stop();
        });
    if let Err(e) = spawned {
        log::warn!("Failed to spawn duration timer: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_radio_without_port_is_config_error() {
        let config = Configuration::default();
        let state = AppState::new(&config);
        assert!(matches!(start_radio(&state, &config), Err(RigError::Config(_))));
        assert!(!state.radio.is_running());
    }

    #[test]
    fn mocked_radio_starts_once() {
        let config = Configuration {
            radio_type: RadioType::Mocked,
            ..Configuration::default()
        };
        let state = AppState::new(&config);
        start_radio(&state, &config).unwrap();
        assert!(state.radio.is_running());
        assert_eq!(start_radio(&state, &config), Err(RigError::AlreadyRunning));
        state.radio.stop();
    }
}
