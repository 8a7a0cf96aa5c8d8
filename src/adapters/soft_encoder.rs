//! Software passthrough encoders
//!
//! These hand frames and PCM straight through as "encoded" buffers so the
//! pipeline can run without a platform codec; compression happens when the
//! muxer finalizes the file.

use std::collections::VecDeque;
use std::time::Duration;

use crate::domain::{RigError, RigResult, VideoFrame};
use crate::ports::{
    AudioEncoder, EncodedBuffer, EncoderOutput, MediaFormat, TrackEncoder, VideoEncoder,
    MIME_RAW_AUDIO, MIME_RAW_VIDEO,
};

/// Output events held before the caller drains them
const MAX_PENDING: usize = 8;

/// PCM samples per output buffer
pub const PCM_BUFFER_SAMPLES: usize = 1024;

/// Output queue shared by both encoders.
#[derive(Default)]
struct OutputQueue {
    events: VecDeque<EncoderOutput>,
    format_reported: bool,
    end_of_stream: bool,
    released: bool,
}

impl OutputQueue {
    fn check_input(&self, name: &str) -> RigResult<()> {
        if self.released {
            return Err(RigError::Encoder(format!("{name} encoder already released")));
        }
        if self.end_of_stream {
            return Err(RigError::Encoder(format!("{name} encoder input after end of stream")));
        }
        Ok(())
    }

    fn report_format(&mut self, format: impl FnOnce() -> MediaFormat) {
        if !self.format_reported {
            self.format_reported = true;
            self.events.push_back(EncoderOutput::FormatChanged(format()));
        }
    }

    fn pending_buffers(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, EncoderOutput::Buffer(_)))
            .count()
    }

    // Never blocks: an empty queue reports TryAgainLater straight away
    fn dequeue(&mut self) -> RigResult<EncoderOutput> {
        if self.released {
            return Err(RigError::Encoder("Encoder already released".into()));
        }
        Ok(self.events.pop_front().unwrap_or(EncoderOutput::TryAgainLater))
    }

    fn signal_end_of_stream(&mut self) {
        if !self.end_of_stream {
            self.end_of_stream = true;
            self.events.push_back(EncoderOutput::Buffer(EncodedBuffer {
                end_of_stream: true,
                ..EncodedBuffer::default()
            }));
        }
    }
}

/// Emits each RGBA frame as one key-frame buffer.
pub struct RawVideoEncoder {
    width: u32,
    height: u32,
    frame_rate: u32,
    queue: OutputQueue,
}

impl RawVideoEncoder {
    pub fn new(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            width,
            height,
            frame_rate,
            queue: OutputQueue::default(),
        }
    }
}

impl TrackEncoder for RawVideoEncoder {
    fn dequeue_output(&mut self, _timeout: Duration) -> RigResult<EncoderOutput> {
        self.queue.dequeue()
    }

    fn signal_end_of_stream(&mut self) -> RigResult<()> {
        self.queue.signal_end_of_stream();
        Ok(())
    }

    fn release(&mut self) {
        self.queue.events.clear();
        self.queue.released = true;
    }
}

impl VideoEncoder for RawVideoEncoder {
    fn encode_frame(&mut self, frame: &VideoFrame) -> RigResult<bool> {
        self.queue.check_input("Video")?;
        if frame.width != self.width || frame.height != self.height {
            return Err(RigError::Encoder(format!(
                "Frame is {}x{}, encoder expects {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        if self.queue.pending_buffers() >= MAX_PENDING {
            log::warn!("Video encoder output backed up, dropping frame");
            return Ok(false);
        }

        let (width, height, frame_rate) = (self.width, self.height, self.frame_rate);
        self.queue.report_format(|| MediaFormat::Video {
            mime: MIME_RAW_VIDEO.to_string(),
            width,
            height,
            frame_rate,
            bitrate: raw_video_bitrate(width, height, frame_rate),
        });
        self.queue.events.push_back(EncoderOutput::Buffer(EncodedBuffer {
            data: frame.pixels.clone(),
            pts_us: 0,
            key_frame: true,
            end_of_stream: false,
        }));
        Ok(true)
    }
}

/// 32 bits per RGBA pixel, saturating at `u32::MAX`
fn raw_video_bitrate(width: u32, height: u32, frame_rate: u32) -> u32 {
    let bits = u64::from(width) * u64::from(height) * 32 * u64::from(frame_rate);
    u32::try_from(bits).unwrap_or(u32::MAX)
}

/// Packs 16-bit mono PCM into little-endian buffers of up to
/// [`PCM_BUFFER_SAMPLES`] samples.
pub struct PcmAudioEncoder {
    sample_rate: u32,
    queue: OutputQueue,
}

impl PcmAudioEncoder {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            queue: OutputQueue::default(),
        }
    }
}

impl TrackEncoder for PcmAudioEncoder {
    fn dequeue_output(&mut self, _timeout: Duration) -> RigResult<EncoderOutput> {
        self.queue.dequeue()
    }

    fn signal_end_of_stream(&mut self) -> RigResult<()> {
        self.queue.signal_end_of_stream();
        Ok(())
    }

    fn release(&mut self) {
        self.queue.events.clear();
        self.queue.released = true;
    }
}

impl AudioEncoder for PcmAudioEncoder {
    fn queue_input(&mut self, samples: &[i16], pts_us: u64) -> RigResult<usize> {
        self.queue.check_input("Audio")?;
        let sample_rate = self.sample_rate;
        self.queue.report_format(|| MediaFormat::Audio {
            mime: MIME_RAW_AUDIO.to_string(),
            sample_rate,
            channels: 1,
            bitrate: sample_rate * 16,
        });

        let mut accepted = 0;
        for chunk in samples.chunks(PCM_BUFFER_SAMPLES) {
            if self.queue.pending_buffers() >= MAX_PENDING {
                break;
            }
            let offset_us = accepted as u64 * 1_000_000 / u64::from(sample_rate.max(1));
            self.queue.events.push_back(EncoderOutput::Buffer(EncodedBuffer {
                data: chunk.iter().flat_map(|s| s.to_le_bytes()).collect(),
                pts_us: pts_us + offset_us,
                key_frame: true,
                end_of_stream: false,
            }));
            accepted += chunk.len();
        }
        Ok(accepted)
    }
}
