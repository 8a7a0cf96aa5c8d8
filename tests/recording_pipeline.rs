//! Recording pipeline integration tests
//!
//! Both track threads run for real against the software encoders. The muxer
//! and audio input are local mocks: the muxer logs every call it receives,
//! the audio input feeds blocks of samples from its own thread like a sound
//! card callback would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rigcorder_lib::adapters::soft_encoder::{PcmAudioEncoder, RawVideoEncoder};
use rigcorder_lib::domain::{
    AudioDeviceInfo, AudioSample, Configuration, LocationState, Mode, OperatingState, RadioType,
    RigError, RigResult, StatusData, VideoSettings,
};
use rigcorder_lib::location::LocationTracker;
use rigcorder_lib::ports::{AudioInput, AudioInputFactory, EncodedBuffer, MediaFormat, Muxer};
use rigcorder_lib::radio::RadioSession;
use rigcorder_lib::recording::{
    RecordingEncoder, RecordingMedia, RecordingService, RecordingSettings, ServiceState,
};

// ---------------------------------------------------------------------------
// MockMuxer: logs add_track / start / write / release
// ---------------------------------------------------------------------------

struct MockMuxer {
    log: Arc<Mutex<Vec<String>>>,
    tracks: usize,
    fail_start: bool,
    /// Simulate a slow container finalize
    release_delay: Duration,
}

impl Muxer for MockMuxer {
    fn add_track(&mut self, format: &MediaFormat) -> RigResult<usize> {
        self.log
            .lock()
            .unwrap()
            .push(format!("add_track {}", format.mime()));
        self.tracks += 1;
        Ok(self.tracks - 1)
    }

    fn start(&mut self) -> RigResult<()> {
        self.log.lock().unwrap().push("start".into());
        if self.fail_start {
            return Err(RigError::Muxer("disk full".into()));
        }
        Ok(())
    }

    fn write_sample(&mut self, track: usize, sample: &EncodedBuffer) -> RigResult<()> {
        assert!(!sample.data.is_empty(), "empty sample written");
        self.log.lock().unwrap().push(format!("write {track}"));
        Ok(())
    }

    fn release(&mut self) -> RigResult<()> {
        thread::sleep(self.release_delay);
        self.log.lock().unwrap().push("release".into());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockAudioInput: 10ms blocks from a worker thread
// ---------------------------------------------------------------------------

struct MockAudioInput {
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    /// Simulate the device disappearing after this many blocks
    lose_after: Option<u32>,
}

impl AudioInput for MockAudioInput {
    fn list_devices(&self) -> RigResult<Vec<AudioDeviceInfo>> {
        Ok(Vec::new())
    }

    fn start(
        &mut self,
        _device_id: Option<&str>,
        sample_rate: u32,
        mut callback: Box<dyn FnMut(&[AudioSample]) + Send + 'static>,
    ) -> RigResult<()> {
        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let lose_after = self.lose_after;
        self.worker = Some(thread::spawn(move || {
            let block = vec![0.25; (sample_rate / 100) as usize];
            let mut blocks = 0;
            while running.load(Ordering::SeqCst) {
                callback(&block);
                blocks += 1;
                if lose_after == Some(blocks) {
                    running.store(false, Ordering::SeqCst);
                }
                thread::sleep(Duration::from_millis(10));
            }
        }));
        Ok(())
    }

    fn stop(&mut self) -> RigResult<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            worker.join().unwrap();
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

fn audio_input(lose_after: Option<u32>) -> AudioInputFactory {
    Box::new(move || {
        Box::new(MockAudioInput {
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            lose_after,
        }) as Box<dyn AudioInput>
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn settings() -> RecordingSettings {
    RecordingSettings {
        video: VideoSettings {
            width: 64,
            height: 48,
            ..VideoSettings::default()
        },
        poll_interval: Duration::from_millis(10),
        ..RecordingSettings::default()
    }
}

fn media(log: &Arc<Mutex<Vec<String>>>, fail_start: bool, lose_audio: Option<u32>) -> RecordingMedia {
    media_with_release_delay(log, fail_start, lose_audio, Duration::ZERO)
}

fn media_with_release_delay(
    log: &Arc<Mutex<Vec<String>>>,
    fail_start: bool,
    lose_audio: Option<u32>,
    release_delay: Duration,
) -> RecordingMedia {
    let s = settings();
    RecordingMedia {
        video_encoder: Box::new(RawVideoEncoder::new(s.video.width, s.video.height, s.video.frame_rate)),
        audio_encoder: Box::new(PcmAudioEncoder::new(s.audio.sample_rate)),
        audio_input: audio_input(lose_audio),
        muxer: Box::new(MockMuxer {
            log: Arc::clone(log),
            tracks: 0,
            fail_start,
            release_delay,
        }),
    }
}

fn status() -> StatusData {
    StatusData::new(
        OperatingState::new("Test rig", 14_200_000, Mode::Usb, false, 100),
        LocationState::default(),
    )
}

/// Returns `ticks` samples, then reports the end of the session.
fn counted_samples(ticks: u32) -> impl FnMut() -> RigResult<Option<StatusData>> + Send {
    let mut remaining = ticks;
    move || {
        if remaining == 0 {
            return Ok(None);
        }
        remaining -= 1;
        thread::sleep(Duration::from_millis(5));
        Ok(Some(status()))
    }
}

fn count(log: &[String], entry: &str) -> usize {
    log.iter().filter(|l| *l == entry).count()
}

fn mocked_config(output_dir: &Path) -> Configuration {
    Configuration {
        radio_type: RadioType::Mocked,
        output_dir: output_dir.to_string_lossy().into_owned(),
        radio_poll_interval_ms: 10,
        video: settings().video,
        ..Configuration::default()
    }
}

fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(5));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn records_until_status_source_ends() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let report = RecordingEncoder::new(settings())
        .record(media(&log, false, None), counted_samples(8))
        .unwrap();

    let log = log.lock().unwrap().clone();
    assert_eq!(count(&log, "start"), 1);
    assert_eq!(count(&log, "release"), 1);
    assert_eq!(log.last().map(String::as_str), Some("release"));

    // Every track is declared before the muxer starts, nothing is written before it
    let start = log.iter().position(|l| l == "start").unwrap();
    let adds: Vec<&String> = log.iter().filter(|l| l.starts_with("add_track")).collect();
    assert_eq!(adds.len(), 3);
    assert!(log[..start].iter().all(|l| l.starts_with("add_track")));
    assert!(log.contains(&"add_track video/raw".to_string()));
    assert!(log.contains(&"add_track application/json".to_string()));
    assert!(log.contains(&"add_track audio/raw".to_string()));

    assert!(report.video_frames >= 1);
    assert!(report.metadata_records >= 1);
    assert!(report.audio_buffers >= 1);
    assert!(report.audio_samples > 0);
    assert_eq!(report.dropped_audio_samples, 0);
    assert_eq!(report.dropped_video_frames, 0);
}

#[test]
fn sample_error_stops_both_tracks_and_is_returned() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut calls = 0;
    let result = RecordingEncoder::new(settings()).record(media(&log, false, None), move || {
        calls += 1;
        if calls == 4 {
            return Err(RigError::Io("radio unplugged".into()));
        }
        Ok(Some(status()))
    });

    assert_eq!(result, Err(RigError::Io("radio unplugged".into())));
    let log = log.lock().unwrap();
    assert_eq!(count(&log, "release"), 1);
    assert!(count(&log, "start") <= 1);
}

#[test]
fn stop_request_ends_recording_cleanly() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let encoder = RecordingEncoder::new(settings());
    let stop = encoder.stop_handle();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        stop.request_stop();
    });
    let report = encoder
        .record(media(&log, false, None), || Ok(Some(status())))
        .unwrap();
    stopper.join().unwrap();

    assert!(report.video_frames >= 1);
    assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("release"));
}

#[test]
fn lost_audio_device_fails_recording() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let result = RecordingEncoder::new(settings())
        .record(media(&log, false, Some(3)), || Ok(Some(status())));

    assert!(matches!(result, Err(RigError::Audio(_))));
    assert_eq!(count(&log.lock().unwrap(), "release"), 1);
}

#[test]
fn muxer_start_failure_is_reported() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let result = RecordingEncoder::new(settings())
        .record(media(&log, true, None), || Ok(Some(status())));

    assert_eq!(result, Err(RigError::Muxer("disk full".into())));
    let log = log.lock().unwrap();
    assert_eq!(count(&log, "start"), 1);
    assert_eq!(count(&log, "release"), 1);
}

#[test]
fn service_records_mocked_radio_until_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let config = mocked_config(dir.path());
    let radio = Arc::new(RadioSession::new());
    let service = Arc::new(RecordingService::new(
        Arc::clone(&radio),
        Arc::new(LocationTracker::default()),
    ));
    radio.start_mocked().unwrap();

    let stopper = {
        let service = Arc::clone(&service);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            assert!(matches!(service.state(), ServiceState::Running(_)));
            assert!(service.latest_status().is_some());
            service.stop();
        })
    };

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut output = None;
    let report = service
        .run(&config, |path| {
            output = Some(path.to_path_buf());
            Ok(media(&log, false, None))
        })
        .unwrap();
    stopper.join().unwrap();

    assert!(report.video_frames >= 1);
    assert_eq!(service.state(), ServiceState::Stopped);
    assert!(!radio.is_running());

    let output = output.unwrap();
    assert_eq!(output.parent(), Some(dir.path()));
    assert!(output.to_string_lossy().ends_with(".mp4"));

    // A second run needs a new radio session
    assert_eq!(service.run(&config, |_| Ok(media(&log, false, None))), Err(RigError::NotRunning));
    assert_eq!(service.take_error(), Some(RigError::NotRunning));
}

#[test]
fn service_stays_busy_until_stopped_recording_is_released() {
    let dir = tempfile::tempdir().unwrap();
    let config = mocked_config(dir.path());
    let radio = Arc::new(RadioSession::new());
    let service = Arc::new(RecordingService::new(
        Arc::clone(&radio),
        Arc::new(LocationTracker::default()),
    ));
    radio.start_mocked().unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    let first = {
        let service = Arc::clone(&service);
        let config = config.clone();
        let log = Arc::clone(&log);
        thread::spawn(move || {
            service.run(&config, |_| {
                Ok(media_with_release_delay(&log, false, None, Duration::from_millis(400)))
            })
        })
    };

    wait_for(|| matches!(service.state(), ServiceState::Running(_)));
    service.stop();
    assert_eq!(service.state(), ServiceState::Stopping);

    // The first recording still owns the radio session and its media
    let mut opened = false;
    let second = service.run(&config, |_| {
        opened = true;
        Ok(media(&log, false, None))
    });
    assert_eq!(second, Err(RigError::AlreadyRunning));
    assert!(!opened);
    assert_eq!(count(&log.lock().unwrap(), "release"), 0);

    let report = first.join().unwrap().unwrap();
    assert!(report.video_frames >= 1);
    assert_eq!(service.state(), ServiceState::Stopped);
    assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("release"));

    // Once released, a new radio session can be recorded again
    radio.start_mocked().unwrap();
    let restart = {
        let service = Arc::clone(&service);
        thread::spawn(move || {
            wait_for(|| matches!(service.state(), ServiceState::Running(_)));
            service.stop();
        })
    };
    let log2 = Arc::new(Mutex::new(Vec::new()));
    service.run(&config, |_| Ok(media(&log2, false, None))).unwrap();
    restart.join().unwrap();
    assert_eq!(service.state(), ServiceState::Stopped);
    assert_eq!(count(&log2.lock().unwrap(), "release"), 1);
}

/// Stand-in for ffmpeg that creates the file named by its last argument.
#[cfg(unix)]
fn fake_ffmpeg(dir: &Path) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg.sh");
    std::fs::write(&path, "#!/bin/sh\nfor last; do :; done\n: > \"$last\"\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

#[cfg(unix)]
#[test]
fn ffmpeg_muxer_writes_relative_output_next_to_caller() {
    use rigcorder_lib::adapters::ffmpeg_muxer::{FfmpegMuxer, FfmpegOptions};
    use rigcorder_lib::domain::VideoFrame;
    use rigcorder_lib::ports::{MIME_RAW_AUDIO, MIME_RAW_VIDEO};

    let cwd = std::env::current_dir().unwrap();
    let dir = tempfile::tempdir_in(&cwd).unwrap();
    let relative = dir.path().strip_prefix(&cwd).unwrap().join("rec.mp4");
    assert!(relative.is_relative());

    let options = FfmpegOptions {
        ffmpeg_path: fake_ffmpeg(dir.path()),
        video_bitrate: 1_000_000,
        audio_bitrate: 64_000,
    };
    let mut muxer = FfmpegMuxer::new(&relative, options).unwrap();
    let video = muxer
        .add_track(&MediaFormat::Video {
            mime: MIME_RAW_VIDEO.into(),
            width: 2,
            height: 2,
            frame_rate: 10,
            bitrate: 0,
        })
        .unwrap();
    muxer
        .add_track(&MediaFormat::Audio {
            mime: MIME_RAW_AUDIO.into(),
            sample_rate: 8000,
            channels: 1,
            bitrate: 0,
        })
        .unwrap();
    muxer.start().unwrap();
    let frame = EncodedBuffer {
        data: vec![0; VideoFrame::byte_len(2, 2)],
        key_frame: true,
        ..EncodedBuffer::default()
    };
    muxer.write_sample(video, &frame).unwrap();
    muxer.release().unwrap();

    assert!(dir.path().join("rec.mp4").exists());
    assert!(!dir.path().join("rec.mp4.parts").exists());
}
