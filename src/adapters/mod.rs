//! Port implementations: serial hardware, audio capture, encoders and the
//! container writer.

pub mod cpal_audio;
pub mod ffmpeg_muxer;
pub mod serial_port;
pub mod soft_encoder;

use std::path::Path;

use crate::domain::{Configuration, RigResult};
use crate::recording::RecordingMedia;

use cpal_audio::CpalAudioInput;
use ffmpeg_muxer::{FfmpegMuxer, FfmpegOptions};
use soft_encoder::{PcmAudioEncoder, RawVideoEncoder};

/// Software encoders, cpal capture and the FFmpeg muxer writing to `output`.
pub fn software_media(config: &Configuration, output: &Path) -> RigResult<RecordingMedia> {
    Ok(RecordingMedia {
        video_encoder: Box::new(RawVideoEncoder::new(
            config.video.width,
            config.video.height,
            config.video.frame_rate,
        )),
        audio_encoder: Box::new(PcmAudioEncoder::new(config.audio.sample_rate)),
        audio_input: CpalAudioInput::factory(),
        muxer: Box::new(FfmpegMuxer::new(output, FfmpegOptions::from_config(config))?),
    })
}
