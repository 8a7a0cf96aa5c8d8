//! Recording orchestrator: runs the audio and video track threads against
//! one shared muxer and reports the first failure.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::audio::{AudioStats, AudioTrack};
use super::sync::{ErrorSlot, MuxSyncGate};
use super::track::{SharedMuxer, TrackContext, AUDIO_TRACK, TRACK_COUNT, VIDEO_TRACK};
use super::video::{VideoStats, VideoTrack};
use crate::domain::{
    AudioSettings, Configuration, LocationPrecision, RigError, RigResult, StatusData,
    VideoSettings,
};
use crate::ports::{AudioEncoder, AudioInputFactory, MediaFormat, Muxer, VideoEncoder, MIME_JSON};

/// Per-recording parameters taken from the active configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSettings {
    pub video: VideoSettings,
    pub audio: AudioSettings,
    pub audio_device: Option<String>,
    pub poll_interval: Duration,
    pub include_location: bool,
    pub location_precision: LocationPrecision,
    pub pts_queue_capacity: usize,
}

impl RecordingSettings {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            video: config.video,
            audio: config.audio,
            audio_device: config.audio_input.clone(),
            poll_interval: Duration::from_millis(config.radio_poll_interval_ms),
            include_location: config.location_in_metatrack,
            location_precision: config.location_precision,
            pts_queue_capacity: config.pts_queue_capacity,
        }
    }
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self::from_config(&Configuration::default())
    }
}

/// The codec and container instances one recording consumes.
pub struct RecordingMedia {
    pub video_encoder: Box<dyn VideoEncoder>,
    pub audio_encoder: Box<dyn AudioEncoder>,
    pub audio_input: AudioInputFactory,
    pub muxer: Box<dyn Muxer>,
}

/// Summary of a finished recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordingReport {
    pub video_frames: u64,
    pub metadata_records: u64,
    pub pts_underruns: u64,
    pub dropped_video_frames: u64,
    pub audio_buffers: u64,
    pub audio_samples: u64,
    pub dropped_audio_samples: u64,
}

impl RecordingReport {
    fn new(video: VideoStats, audio: AudioStats) -> Self {
        Self {
            video_frames: video.frames,
            metadata_records: video.metadata_records,
            pts_underruns: video.pts_underruns,
            dropped_video_frames: video.dropped_frames,
            audio_buffers: audio.buffers,
            audio_samples: audio.samples,
            dropped_audio_samples: audio.dropped_samples,
        }
    }
}

/// Drives one recording end to end.
///
/// The gate is created up front so another thread can stop the recording
/// through [`RecordingEncoder::stop_handle`] while `record` blocks.
pub struct RecordingEncoder {
    settings: RecordingSettings,
    gate: Arc<MuxSyncGate>,
}

impl RecordingEncoder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            gate: Arc::new(MuxSyncGate::new(TRACK_COUNT)),
        }
    }

    pub fn stop_handle(&self) -> Arc<MuxSyncGate> {
        Arc::clone(&self.gate)
    }

    /// Record until `sample_fn` returns `Ok(None)`, either track fails or a
    /// stop is requested. Blocks until both tracks have finished and the
    /// muxer is released; returns the first error any of them hit.
    pub fn record<S>(self, media: RecordingMedia, sample_fn: S) -> RigResult<RecordingReport>
    where
        S: FnMut() -> RigResult<Option<StatusData>> + Send,
    {
        let settings = self.settings;
        let gate = self.gate;
        let errors = Arc::new(ErrorSlot::new());
        let muxer = SharedMuxer::new(media.muxer);

        let video_ctx = TrackContext::new(
            VIDEO_TRACK,
            "Video",
            Arc::clone(&gate),
            muxer.clone(),
            Arc::clone(&errors),
        )
        .with_metadata_track(MediaFormat::Metadata {
            mime: MIME_JSON.to_string(),
        });
        let audio_ctx = TrackContext::new(
            AUDIO_TRACK,
            "Audio",
            Arc::clone(&gate),
            muxer.clone(),
            Arc::clone(&errors),
        );

        let video = VideoTrack::new(
            video_ctx,
            media.video_encoder,
            settings.video.width,
            settings.video.height,
            settings.location_precision,
            settings.pts_queue_capacity,
            sample_fn,
            settings.poll_interval,
            settings.include_location,
        );
        let audio = AudioTrack::new(
            audio_ctx,
            media.audio_encoder,
            media.audio_input,
            settings.audio_device.clone(),
            settings.audio.sample_rate,
        );

        log::info!(
            "Recording started: {}x{} video, {} Hz audio",
            settings.video.width,
            settings.video.height,
            settings.audio.sample_rate
        );

        let (video_stats, audio_stats) = thread::scope(|scope| {
            let video_handle = thread::Builder::new()
                .name("video-track".into())
                .spawn_scoped(scope, move || video.run());
            let audio_handle = thread::Builder::new()
                .name("audio-track".into())
                .spawn_scoped(scope, move || audio.run());

            let video_stats = join_track(video_handle, "Video", &gate, &errors);
            let audio_stats = join_track(audio_handle, "Audio", &gate, &errors);
            (video_stats, audio_stats)
        });

        log::info!("Releasing muxer");
        if let Err(e) = muxer.with(|m| m.release()) {
            errors.record(e);
        }

        match errors.take() {
            Some(e) => {
                log::error!("Recording failed: {e}");
                Err(e)
            }
            None => {
                let report = RecordingReport::new(video_stats, audio_stats);
                log::info!("Recording finished: {report:?}");
                Ok(report)
            }
        }
    }
}

fn join_track<T: Default>(
    spawned: std::io::Result<thread::ScopedJoinHandle<'_, T>>,
    name: &str,
    gate: &MuxSyncGate,
    errors: &ErrorSlot,
) -> T {
    let failure = match spawned {
        Ok(handle) => match handle.join() {
            Ok(stats) => return stats,
            Err(_) => format!("{name} track thread panicked"),
        },
        Err(e) => format!("Failed to spawn {name} track thread: {e}"),
    };
    errors.record(RigError::Encoder(failure));
    gate.request_stop();
    T::default()
}
