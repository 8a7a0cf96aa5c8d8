//! Audio track thread: captures PCM into a ring buffer, feeds the encoder
//! and writes its output.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapRb};

use super::pts::audio_pts_us;
use super::track::{TrackContext, DRAIN_TIMEOUT, FINALIZE_TIMEOUT};
use crate::domain::{AudioSample, RigError, RigResult};
use crate::ports::{AudioEncoder, AudioInput, AudioInputFactory, EncoderOutput};

/// About 370ms at 44.1 kHz
const RING_CAPACITY: usize = 16_384;

/// Samples moved out of the ring per read
const READ_CHUNK: usize = 2_048;

/// What the audio track wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioStats {
    pub buffers: u64,
    pub samples: u64,
    pub dropped_samples: u64,
}

pub struct AudioTrack {
    ctx: TrackContext,
    encoder: Box<dyn AudioEncoder>,
    input_factory: Option<AudioInputFactory>,
    device: Option<String>,
    sample_rate: u32,
    /// Captured but not yet accepted by the encoder
    pending: Vec<i16>,
    samples_read: u64,
    stats: AudioStats,
}

impl AudioTrack {
    pub fn new(
        ctx: TrackContext,
        encoder: Box<dyn AudioEncoder>,
        input_factory: AudioInputFactory,
        device: Option<String>,
        sample_rate: u32,
    ) -> Self {
        Self {
            ctx,
            encoder,
            input_factory: Some(input_factory),
            device,
            sample_rate,
            pending: Vec::with_capacity(READ_CHUNK),
            samples_read: 0,
            stats: AudioStats::default(),
        }
    }

    pub fn run(mut self) -> AudioStats {
        // cpal streams are !Send: build the input here, on the thread that owns it
        let mut input = match self.input_factory.take() {
            Some(factory) => factory(),
            None => {
                self.ctx.fail(RigError::Audio("Audio input already consumed".into()));
                self.encoder.release();
                return self.stats;
            }
        };

        let rb = HeapRb::<AudioSample>::new(RING_CAPACITY);
        let (mut producer, mut consumer) = rb.split();
        let dropped = Arc::new(AtomicU64::new(0));
        let dropped_in_callback = Arc::clone(&dropped);

        let started = input.start(
            self.device.as_deref(),
            self.sample_rate,
            Box::new(move |samples: &[AudioSample]| {
                let pushed = producer.push_slice(samples);
                if pushed < samples.len() {
                    dropped_in_callback.fetch_add((samples.len() - pushed) as u64, Ordering::Relaxed);
                }
            }),
        );

        let result = started.and_then(|()| self.track_loop(input.as_ref(), &mut consumer));
        if let Err(e) = result {
            self.ctx.fail(e);
        }
        if let Err(e) = input.stop() {
            log::warn!("Stopping audio capture failed: {e}");
        }
        if let Err(e) = self.finalize(&mut consumer) {
            self.ctx.fail(e);
        }
        log::info!("Audio thread wrapping up");
        self.encoder.release();

        self.stats.samples = self.samples_read;
        self.stats.dropped_samples = dropped.load(Ordering::Relaxed);
        if self.stats.dropped_samples > 0 {
            log::warn!(
                "Audio ring buffer overflowed, {} samples dropped",
                self.stats.dropped_samples
            );
        }
        self.stats
    }

    fn track_loop(
        &mut self,
        input: &dyn AudioInput,
        consumer: &mut HeapCons<AudioSample>,
    ) -> RigResult<()> {
        while !self.ctx.gate().is_stopped() {
            // cpal can silently kill the stream (e.g. USB device removed)
            if !input.is_running() {
                return Err(RigError::Audio("Audio device lost".into()));
            }
            let fed = self.read_audio(consumer)?;
            self.drain_buffers()?;
            if !fed {
                thread::sleep(Duration::from_millis(5));
            }
        }
        Ok(())
    }

    /// Move captured samples into the encoder. Returns false if there was
    /// nothing to feed.
    fn read_audio(&mut self, consumer: &mut HeapCons<AudioSample>) -> RigResult<bool> {
        let mut chunk = [0.0 as AudioSample; READ_CHUNK];
        loop {
            let n = consumer.pop_slice(&mut chunk);
            self.pending.extend(chunk[..n].iter().map(|&s| to_pcm16(s)));
            if n < READ_CHUNK {
                break;
            }
        }
        if self.pending.is_empty() {
            return Ok(false);
        }

        while !self.pending.is_empty() {
            let pts = audio_pts_us(self.samples_read, self.sample_rate);
            let accepted = self.encoder.queue_input(&self.pending, pts)?;
            if accepted == 0 {
                // No input buffer free, keep the rest for the next round
                break;
            }
            self.samples_read += accepted as u64;
            self.pending.drain(..accepted.min(self.pending.len()));
        }
        Ok(true)
    }

    fn drain_buffers(&mut self) -> RigResult<bool> {
        loop {
            match self.encoder.dequeue_output(DRAIN_TIMEOUT)? {
                EncoderOutput::FormatChanged(format) => self.ctx.on_format_changed(format)?,
                EncoderOutput::Buffer(buffer) => {
                    if !buffer.data.is_empty() && self.ctx.write_sample(&buffer)? {
                        self.stats.buffers += 1;
                    }
                    if buffer.end_of_stream {
                        log::debug!("Audio end of stream received");
                        return Ok(true);
                    }
                }
                EncoderOutput::TryAgainLater => return Ok(false),
            }
        }
    }

    /// Flush what capture already delivered, then end the stream.
    fn finalize(&mut self, consumer: &mut HeapCons<AudioSample>) -> RigResult<()> {
        self.read_audio(consumer)?;
        self.drain_buffers()?;
        if !self.pending.is_empty() {
            log::warn!("Discarding {} unencoded audio samples", self.pending.len());
            self.pending.clear();
        }

        self.encoder.signal_end_of_stream()?;
        let deadline = Instant::now() + FINALIZE_TIMEOUT;
        while !self.drain_buffers()? {
            if Instant::now() >= deadline {
                log::warn!("Audio encoder did not report end of stream");
                break;
            }
        }
        Ok(())
    }
}

fn to_pcm16(sample: AudioSample) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
