//! Video track thread: samples status, renders the overlay, encodes it and
//! writes the metadata record for each frame.

use std::thread;
use std::time::{Duration, Instant};

use super::pts::PtsQueue;
use super::track::{TrackContext, DRAIN_TIMEOUT, FINALIZE_TIMEOUT};
use crate::domain::{LocationPrecision, RigError, RigResult, StatusData, VideoFrame};
use crate::ports::{EncoderOutput, VideoEncoder};
use crate::render::StatusRenderer;

/// Upper bound for one JSON metadata record, newline included
pub const META_BUFFER_SIZE: usize = 4096;

/// What the video track wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoStats {
    pub frames: u64,
    pub metadata_records: u64,
    pub pts_underruns: u64,
    /// Frames the encoder refused
    pub dropped_frames: u64,
}

pub struct VideoTrack<S> {
    ctx: TrackContext,
    encoder: Box<dyn VideoEncoder>,
    renderer: StatusRenderer,
    frame: VideoFrame,
    pts: PtsQueue,
    sample_fn: S,
    poll_interval: Duration,
    include_location: bool,
    stats: VideoStats,
}

impl<S> VideoTrack<S>
where
    S: FnMut() -> RigResult<Option<StatusData>>,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: TrackContext,
        encoder: Box<dyn VideoEncoder>,
        width: u32,
        height: u32,
        precision: LocationPrecision,
        pts_queue_capacity: usize,
        sample_fn: S,
        poll_interval: Duration,
        include_location: bool,
    ) -> Self {
        Self {
            ctx,
            encoder,
            renderer: StatusRenderer::new(precision),
            frame: VideoFrame::new(width, height),
            pts: PtsQueue::new(pts_queue_capacity),
            sample_fn,
            poll_interval,
            include_location,
            stats: VideoStats::default(),
        }
    }

    /// Run until the status source ends, stop is requested or an error
    /// occurs. Finalization and encoder release always happen.
    pub fn run(mut self) -> VideoStats {
        if let Err(e) = self.track_loop() {
            self.ctx.fail(e);
        }
        if let Err(e) = self.finalize() {
            self.ctx.fail(e);
        }
        log::info!("Video thread wrapping up");
        self.encoder.release();

        self.stats.pts_underruns = self.pts.underruns();
        self.stats
    }

    fn track_loop(&mut self) -> RigResult<()> {
        while !self.ctx.gate().is_stopped() {
            self.drain_buffers()?;

            let Some(status) = (self.sample_fn)()? else {
                log::info!("Status source ended, stopping recording");
                self.ctx.gate().request_stop();
                break;
            };

            self.renderer.render(&status, &mut self.frame);
            if self.encoder.encode_frame(&self.frame)? {
                // Stamps only for frames that will come back out of the encoder
                let pts = self.pts.enqueue(status.timestamp);
                self.write_metadata(&status, pts)?;
            } else {
                self.stats.dropped_frames += 1;
            }

            thread::sleep(self.poll_interval);
        }
        Ok(())
    }

    /// Drain whatever output is ready. Returns true on end of stream.
    fn drain_buffers(&mut self) -> RigResult<bool> {
        loop {
            match self.encoder.dequeue_output(DRAIN_TIMEOUT)? {
                EncoderOutput::FormatChanged(format) => self.ctx.on_format_changed(format)?,
                EncoderOutput::Buffer(mut buffer) => {
                    if !buffer.data.is_empty() {
                        buffer.pts_us = self.pts.next_for_output();
                        if self.ctx.write_sample(&buffer)? {
                            self.stats.frames += 1;
                        }
                    }
                    if buffer.end_of_stream {
                        log::debug!("Video end of stream received");
                        return Ok(true);
                    }
                }
                EncoderOutput::TryAgainLater => return Ok(false),
            }
        }
    }

    fn finalize(&mut self) -> RigResult<()> {
        self.encoder.signal_end_of_stream()?;
        let deadline = Instant::now() + FINALIZE_TIMEOUT;
        while !self.drain_buffers()? {
            if Instant::now() >= deadline {
                log::warn!("Video encoder did not report end of stream");
                break;
            }
        }
        Ok(())
    }

    fn write_metadata(&mut self, status: &StatusData, pts: u64) -> RigResult<()> {
        if !self.ctx.gate().is_muxer_started() {
            return Ok(());
        }
        let record = status.for_metatrack(self.include_location);
        let mut data = serde_json::to_vec(&record)
            .map_err(|e| RigError::Encoder(format!("Failed to serialize status: {e}")))?;
        data.push(b'\n');
        if data.len() > META_BUFFER_SIZE {
            return Err(RigError::Encoder(format!(
                "Metadata record of {} bytes exceeds {META_BUFFER_SIZE}",
                data.len()
            )));
        }
        if self.ctx.write_metadata(data, pts)? {
            self.stats.metadata_records += 1;
        }
        Ok(())
    }
}
