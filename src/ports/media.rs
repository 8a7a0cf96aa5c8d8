//! Encoder and multiplexer port traits
//!
//! The recording pipeline drives codecs through these narrow interfaces; the
//! platform codec or container writer behind them is opaque.

use std::time::Duration;

use crate::domain::{RigResult, VideoFrame};

pub const MIME_RAW_VIDEO: &str = "video/raw";
pub const MIME_RAW_AUDIO: &str = "audio/raw";
pub const MIME_JSON: &str = "application/json";

/// Format of one track as declared to the muxer.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaFormat {
    Video {
        mime: String,
        width: u32,
        height: u32,
        frame_rate: u32,
        bitrate: u32,
    },
    Audio {
        mime: String,
        sample_rate: u32,
        channels: u16,
        bitrate: u32,
    },
    Metadata {
        mime: String,
    },
}

impl MediaFormat {
    pub fn mime(&self) -> &str {
        match self {
            MediaFormat::Video { mime, .. }
            | MediaFormat::Audio { mime, .. }
            | MediaFormat::Metadata { mime } => mime,
        }
    }
}

/// One encoded access unit, or the end-of-stream marker.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncodedBuffer {
    pub data: Vec<u8>,
    /// Presentation timestamp in microseconds
    pub pts_us: u64,
    pub key_frame: bool,
    pub end_of_stream: bool,
}

/// Result of polling an encoder for output.
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderOutput {
    Buffer(EncodedBuffer),
    /// The output format is now known. Reported once, before the first buffer.
    FormatChanged(MediaFormat),
    TryAgainLater,
}

/// Output side shared by audio and video encoders.
pub trait TrackEncoder: Send {
    /// Wait up to `timeout` for the next output event.
    fn dequeue_output(&mut self, timeout: Duration) -> RigResult<EncoderOutput>;

    /// No more input follows. Remaining output ends with an `end_of_stream` buffer.
    fn signal_end_of_stream(&mut self) -> RigResult<()>;

    fn release(&mut self);
}

pub trait VideoEncoder: TrackEncoder {
    /// Submit one rendered frame. Output timestamps are assigned by the caller.
    /// Returns false if the frame was dropped and will produce no output.
    fn encode_frame(&mut self, frame: &VideoFrame) -> RigResult<bool>;
}

pub trait AudioEncoder: TrackEncoder {
    /// Submit 16-bit mono PCM. Returns how many samples were accepted; the rest
    /// must be offered again later.
    fn queue_input(&mut self, samples: &[i16], pts_us: u64) -> RigResult<usize>;
}

/// Container writer. Tracks must all be added before `start`, and samples may
/// only be written after it.
pub trait Muxer: Send {
    /// Declare a track, returning its index.
    fn add_track(&mut self, format: &MediaFormat) -> RigResult<usize>;

    fn start(&mut self) -> RigResult<()>;

    fn write_sample(&mut self, track: usize, sample: &EncodedBuffer) -> RigResult<()>;

    /// Finish the file. Called once, after every writer is done.
    fn release(&mut self) -> RigResult<()>;
}
