//! Block scheduler: places submitted buffers on the endpoint's frame clock
//!
//! Producer side: [`ScheduleSender`] pushes [`ScheduledBuffer`]s into a bounded
//! lock-free ring and never blocks; a full ring drops the buffer.
//!
//! Render side: [`Scheduler::render`] runs on the audio thread. It drains the
//! ring, converts start times to absolute frames, sums every buffer that is
//! due into the output, and advances the shared [`FrameClock`] by the number
//! of frames rendered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};
use tracing::{trace, warn};

use super::types::StereoBuffer;

/// A buffer waiting to start at `start_time` seconds on the endpoint clock
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledBuffer {
    pub buffer: StereoBuffer,
    pub start_time: f64,
}

/// Frames rendered so far by an endpoint.
///
/// Written only by the render side; readable from any thread.
#[derive(Debug)]
pub struct FrameClock {
    frames: AtomicU64,
    sample_rate: f64,
}

impl FrameClock {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            frames: AtomicU64::new(0),
            sample_rate,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Clock position in seconds
    pub fn seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate
    }

    /// Absolute frame index for a time in seconds.
    ///
    /// Non-positive and NaN map to 0; times past the end of the frame range
    /// (including +inf) saturate to `u64::MAX`.
    pub fn frame_at(&self, seconds: f64) -> u64 {
        if seconds.is_nan() || seconds <= 0.0 {
            return 0;
        }
        (seconds * self.sample_rate).round() as u64
    }

    fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }
}

/// Producer end of the schedule ring
pub struct ScheduleSender {
    producer: Mutex<HeapProd<ScheduledBuffer>>,
}

impl ScheduleSender {
    /// Queue a buffer. Returns false (and drops the buffer) if the ring is full.
    pub fn send(&self, scheduled: ScheduledBuffer) -> bool {
        let mut producer = self.producer.lock().unwrap_or_else(PoisonError::into_inner);
        match producer.try_push(scheduled) {
            Ok(()) => true,
            Err(dropped) => {
                warn!(
                    frames = dropped.buffer.frames(),
                    start_time = dropped.start_time,
                    capacity = producer.capacity().get(),
                    "Schedule queue full, dropping block"
                );
                false
            }
        }
    }

    /// Buffers queued and not yet picked up by the render side
    pub fn pending(&self) -> usize {
        self.producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .occupied_len()
    }
}

struct Voice {
    buffer: StereoBuffer,
    start_frame: u64,
    cursor: usize,
}

impl Voice {
    fn remaining(&self) -> usize {
        self.buffer.frames() - self.cursor
    }
}

/// Render side of the schedule ring
pub struct Scheduler {
    incoming: HeapCons<ScheduledBuffer>,
    voices: Vec<Voice>,
    clock: Arc<FrameClock>,
}

/// Create a connected sender/scheduler pair with room for `capacity` queued buffers
pub fn schedule_queue(capacity: usize, clock: Arc<FrameClock>) -> (ScheduleSender, Scheduler) {
    let rb = HeapRb::<ScheduledBuffer>::new(capacity.max(1));
    let (producer, consumer) = rb.split();

    let sender = ScheduleSender {
        producer: Mutex::new(producer),
    };
    let scheduler = Scheduler {
        incoming: consumer,
        voices: Vec::with_capacity(capacity.max(1)),
        clock,
    };
    (sender, scheduler)
}

impl Scheduler {
    pub fn clock(&self) -> &Arc<FrameClock> {
        &self.clock
    }

    /// Buffers currently playing or waiting for their start frame
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Render into interleaved `out` with `channels` channels and advance the clock.
    ///
    /// Left goes to channel 0 and right to channel 1; further channels stay
    /// silent. A mono device receives the average of both channels.
    /// Output is not clipped.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        out.fill(0.0);
        if channels == 0 {
            return;
        }
        let frames = out.len() / channels;
        let now = self.clock.frames();

        while let Some(scheduled) = self.incoming.try_pop() {
            let requested = self.clock.frame_at(scheduled.start_time);
            if requested == u64::MAX {
                warn!(
                    start_time = scheduled.start_time,
                    frames = scheduled.buffer.frames(),
                    "Block start time is unreachable, dropping block"
                );
                continue;
            }
            if requested < now {
                trace!(
                    start_time = scheduled.start_time,
                    late_frames = now - requested,
                    "Block scheduled in the past, starting now"
                );
            }
            self.voices.push(Voice {
                buffer: scheduled.buffer,
                start_frame: requested.max(now),
                cursor: 0,
            });
        }

        for voice in self.voices.iter_mut() {
            let offset = voice.start_frame.saturating_sub(now);
            if offset >= frames as u64 {
                continue;
            }
            let offset = offset as usize;
            let count = (frames - offset).min(voice.remaining());

            for i in 0..count {
                let (left, right) = match voice.buffer.frame(voice.cursor + i) {
                    Some(pair) => pair,
                    None => break,
                };
                let base = (offset + i) * channels;
                if channels == 1 {
                    out[base] += (left + right) * 0.5;
                } else {
                    out[base] += left;
                    out[base + 1] += right;
                }
            }
            voice.cursor += count;
        }

        self.voices.retain(|voice| voice.remaining() > 0);
        self.clock.advance(frames as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduled(left: &[f32], right: &[f32], start_time: f64) -> ScheduledBuffer {
        let interleaved: Vec<f32> = left
            .iter()
            .zip(right)
            .flat_map(|(l, r)| [*l, *r])
            .collect();
        ScheduledBuffer {
            buffer: StereoBuffer::from_interleaved(interleaved, left.len(), 10.0),
            start_time,
        }
    }

    #[test]
    fn test_frame_at_rounds_and_clamps() {
        let clock = FrameClock::new(10.0);
        assert_eq!(clock.frame_at(0.0), 0);
        assert_eq!(clock.frame_at(-5.0), 0);
        assert_eq!(clock.frame_at(f64::NAN), 0);
        assert_eq!(clock.frame_at(0.34), 3);
        assert_eq!(clock.frame_at(0.36), 4);
    }

    #[test]
    fn test_render_advances_clock() {
        let clock = Arc::new(FrameClock::new(10.0));
        let (_sender, mut scheduler) = schedule_queue(4, Arc::clone(&clock));
        let mut out = vec![1.0; 8];
        scheduler.render(&mut out, 2);
        assert_eq!(clock.frames(), 4);
        assert!((clock.seconds() - 0.4).abs() < 1e-12);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_mono_output_averages_channels() {
        let clock = Arc::new(FrameClock::new(10.0));
        let (sender, mut scheduler) = schedule_queue(4, Arc::clone(&clock));
        assert!(sender.send(scheduled(&[1.0, 0.5], &[0.0, 0.5], 0.0)));

        let mut out = vec![0.0; 3];
        scheduler.render(&mut out, 1);
        assert_eq!(out, vec![0.5, 0.5, 0.0]);
        assert_eq!(scheduler.active_voices(), 0);
    }

    #[test]
    fn test_extra_channels_stay_silent() {
        let clock = Arc::new(FrameClock::new(10.0));
        let (sender, mut scheduler) = schedule_queue(4, Arc::clone(&clock));
        assert!(sender.send(scheduled(&[0.25], &[-0.25], 0.0)));

        let mut out = vec![9.0; 4];
        scheduler.render(&mut out, 4);
        assert_eq!(out, vec![0.25, -0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_unreachable_start_time_dropped() {
        let clock = Arc::new(FrameClock::new(10.0));
        let (sender, mut scheduler) = schedule_queue(4, Arc::clone(&clock));
        assert!(sender.send(scheduled(&[0.5], &[0.5], f64::INFINITY)));
        assert!(sender.send(scheduled(&[0.5], &[0.5], 1e300)));
        assert!(sender.send(scheduled(&[0.25], &[0.25], 0.1)));

        let mut out = vec![0.0; 4];
        scheduler.render(&mut out, 2);
        assert_eq!(out, vec![0.0, 0.0, 0.25, 0.25]);
        assert_eq!(scheduler.active_voices(), 0);
        assert_eq!(clock.frame_at(f64::INFINITY), u64::MAX);
    }

    #[test]
    fn test_full_queue_drops_block() {
        let clock = Arc::new(FrameClock::new(10.0));
        let (sender, _scheduler) = schedule_queue(1, clock);
        assert!(sender.send(scheduled(&[0.1], &[0.1], 0.0)));
        assert!(!sender.send(scheduled(&[0.2], &[0.2], 0.0)));
        assert_eq!(sender.pending(), 1);
    }
}
