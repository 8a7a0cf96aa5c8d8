//! Presentation timestamps.
//!
//! Video timestamps come from the wall-clock gap since the first sampled
//! tick, so render and encode jitter does not distort real-time pacing.
//! Encoder output does not arrive in lockstep with submission, so stamps
//! wait in a FIFO until the matching output buffer is drained.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

pub struct PtsQueue {
    origin: Option<DateTime<Utc>>,
    pending: VecDeque<u64>,
    capacity: usize,
    last: u64,
    underruns: u64,
}

impl PtsQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            origin: None,
            pending: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            last: 0,
            underruns: 0,
        }
    }

    /// Stamp a submitted frame captured at `timestamp`, in microseconds.
    ///
    /// The first tick is 0. A timestamp earlier than the origin resets the
    /// origin to it instead of going negative.
    pub fn enqueue(&mut self, timestamp: DateTime<Utc>) -> u64 {
        let pts = match self.origin {
            None => {
                self.origin = Some(timestamp);
                0
            }
            Some(origin) => {
                let gap = timestamp - origin;
                if gap < chrono::Duration::zero() {
                    log::error!("Non-monotonic timestamps passed to encoder, resetting origin");
                    self.origin = Some(timestamp);
                    0
                } else {
                    gap.num_microseconds().unwrap_or(i64::MAX) as u64
                }
            }
        };

        if self.pending.len() >= self.capacity {
            if let Some(dropped) = self.pending.pop_front() {
                log::warn!("PTS queue full, dropping pending timestamp {dropped}");
            }
        }
        self.pending.push_back(pts);
        pts
    }

    /// Timestamp for the next drained output buffer. On underrun the last
    /// assigned timestamp is reused and the underrun counted.
    pub fn next_for_output(&mut self) -> u64 {
        match self.pending.pop_front() {
            Some(pts) => {
                self.last = pts;
                pts
            }
            None => {
                self.underruns += 1;
                log::warn!("PTS queue under-run, falling back to last PTS seen: {}", self.last);
                self.last
            }
        }
    }

    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Audio timestamps follow the sample count; capture is assumed gapless.
pub fn audio_pts_us(samples: u64, sample_rate: u32) -> u64 {
    (samples as u128 * 1_000_000 / sample_rate.max(1) as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::milliseconds(ms)
    }

    #[test]
    fn wall_clock_gap_becomes_pts() {
        let mut q = PtsQueue::new(16);
        assert_eq!(q.enqueue(t(0)), 0);
        assert_eq!(q.enqueue(t(100)), 100_000);
        assert_eq!(q.enqueue(t(237)), 237_000);
        assert_eq!(q.next_for_output(), 0);
        assert_eq!(q.next_for_output(), 100_000);
        assert_eq!(q.next_for_output(), 237_000);
        assert_eq!(q.underruns(), 0);
    }

    #[test]
    fn backwards_timestamp_resets_origin() {
        let mut q = PtsQueue::new(16);
        q.enqueue(t(1_000));
        assert_eq!(q.enqueue(t(500)), 0);
        assert_eq!(q.enqueue(t(600)), 100_000);
    }

    #[test]
    fn underrun_reuses_last_pts() {
        let mut q = PtsQueue::new(16);
        q.enqueue(t(0));
        q.enqueue(t(100));
        q.next_for_output();
        assert_eq!(q.next_for_output(), 100_000);
        assert_eq!(q.next_for_output(), 100_000);
        assert_eq!(q.underruns(), 1);
    }

    #[test]
    fn underrun_before_any_output_is_zero() {
        let mut q = PtsQueue::new(4);
        assert_eq!(q.next_for_output(), 0);
        assert_eq!(q.underruns(), 1);
    }

    #[test]
    fn full_queue_drops_oldest() {
        let mut q = PtsQueue::new(2);
        q.enqueue(t(0));
        q.enqueue(t(100));
        q.enqueue(t(200));
        assert_eq!(q.pending(), 2);
        assert_eq!(q.next_for_output(), 100_000);
        assert_eq!(q.next_for_output(), 200_000);
    }

    #[test]
    fn audio_pts_from_sample_count() {
        assert_eq!(audio_pts_us(0, 44_100), 0);
        assert_eq!(audio_pts_us(44_100, 44_100), 1_000_000);
        assert_eq!(audio_pts_us(22_050, 44_100), 500_000);
        assert_eq!(audio_pts_us(1, 44_100), 22);
    }
}
