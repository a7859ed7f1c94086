//! Null output: no device, samples are discarded
//!
//! Useful on machines without audio hardware. The clock follows wall time so a
//! producer pacing itself against `current_time` behaves as it would with a
//! real device.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{info, trace};
use wab_common::time::MonotonicClock;

use super::endpoint::{AudioEndpoint, OutputPlatform};
use super::types::StereoBuffer;
use crate::error::{Error, Result};

pub struct NullEndpoint {
    sample_rate: f64,
    clock: MonotonicClock,
    blocks: AtomicU64,
    frames: AtomicU64,
}

impl NullEndpoint {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            clock: MonotonicClock::new(),
            blocks: AtomicU64::new(0),
            frames: AtomicU64::new(0),
        }
    }

    /// Blocks scheduled (and discarded) so far
    pub fn blocks_discarded(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    /// Frames scheduled (and discarded) so far
    pub fn frames_discarded(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl AudioEndpoint for NullEndpoint {
    fn name(&self) -> &str {
        "null"
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.clock.now_secs()
    }

    fn schedule(&self, buffer: StereoBuffer, start_time: f64) {
        self.blocks.fetch_add(1, Ordering::Relaxed);
        self.frames.fetch_add(buffer.frames() as u64, Ordering::Relaxed);
        trace!(frames = buffer.frames(), start_time, "Discarding block");
    }
}

pub struct NullPlatform {
    sample_rate: f64,
}

impl NullPlatform {
    pub fn new(sample_rate: f64) -> Self {
        Self { sample_rate }
    }
}

impl OutputPlatform for NullPlatform {
    fn name(&self) -> &str {
        "null"
    }

    fn open_endpoint(&self) -> Result<Arc<dyn AudioEndpoint>> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(Error::UnknownStreamFormat(format!(
                "invalid sample rate {}",
                self.sample_rate
            )));
        }
        info!("Using null audio output at {} Hz", self.sample_rate);
        Ok(Arc::new(NullEndpoint::new(self.sample_rate)))
    }
}
