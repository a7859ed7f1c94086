//! Endpoint with a caller-driven clock
//!
//! [`ManualEndpoint`] has no device: its clock only moves when the owner calls
//! [`ManualEndpoint::render`], which mixes every due block exactly the way the
//! cpal endpoint does on its audio thread. This makes it usable for offline
//! rendering (faster than real time) and for deterministic tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::endpoint::{AudioEndpoint, OutputPlatform};
use super::scheduler::{schedule_queue, FrameClock, ScheduleSender, ScheduledBuffer, Scheduler};
use super::types::StereoBuffer;
use crate::error::{Error, Result};

/// Stereo endpoint whose clock advances only through [`ManualEndpoint::render`]
pub struct ManualEndpoint {
    name: String,
    clock: Arc<FrameClock>,
    sender: ScheduleSender,
    scheduler: Mutex<Scheduler>,
    history: Mutex<Vec<ScheduledBuffer>>,
    unlocks: AtomicUsize,
}

impl ManualEndpoint {
    pub fn new(sample_rate: f64, capacity: usize) -> Self {
        let clock = Arc::new(FrameClock::new(sample_rate));
        let (sender, scheduler) = schedule_queue(capacity, Arc::clone(&clock));
        Self {
            name: "manual".to_string(),
            clock,
            sender,
            scheduler: Mutex::new(scheduler),
            history: Mutex::new(Vec::new()),
            unlocks: AtomicUsize::new(0),
        }
    }

    /// Render `frames` stereo frames, returned interleaved, and advance the clock
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * 2];
        self.scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .render(&mut out, 2);
        out
    }

    /// Every buffer scheduled so far, in submission order
    pub fn scheduled(&self) -> Vec<ScheduledBuffer> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the submission history
    pub fn take_scheduled(&self) -> Vec<ScheduledBuffer> {
        std::mem::take(&mut *self.history.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of times the endpoint was unlocked
    pub fn unlock_count(&self) -> usize {
        self.unlocks.load(Ordering::SeqCst)
    }

    /// Frames rendered so far
    pub fn frames_rendered(&self) -> u64 {
        self.clock.frames()
    }
}

impl AudioEndpoint for ManualEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> f64 {
        self.clock.sample_rate()
    }

    fn current_time(&self) -> f64 {
        self.clock.seconds()
    }

    fn schedule(&self, buffer: StereoBuffer, start_time: f64) {
        let scheduled = ScheduledBuffer { buffer, start_time };
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(scheduled.clone());
        self.sender.send(scheduled);
    }

    fn unlock(&self) {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
        debug!("Manual endpoint unlocked");
        self.sender.send(ScheduledBuffer {
            buffer: StereoBuffer::silence(1, self.sample_rate()),
            start_time: 0.0,
        });
    }
}

struct ManualPlatformInner {
    sample_rate: f64,
    capacity: usize,
    fail: bool,
    opened: Mutex<Vec<Arc<ManualEndpoint>>>,
}

/// Creates [`ManualEndpoint`]s and keeps a handle to each one.
///
/// Clones share the same endpoint list, so a caller can hand one clone to the
/// bridge and keep another to drive the endpoints it opened.
#[derive(Clone)]
pub struct ManualPlatform {
    inner: Arc<ManualPlatformInner>,
}

impl ManualPlatform {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_capacity(sample_rate, 64)
    }

    pub fn with_capacity(sample_rate: f64, capacity: usize) -> Self {
        Self {
            inner: Arc::new(ManualPlatformInner {
                sample_rate,
                capacity,
                fail: false,
                opened: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Platform whose endpoint construction always fails with [`Error::NoDevice`]
    pub fn failing() -> Self {
        Self {
            inner: Arc::new(ManualPlatformInner {
                sample_rate: 44100.0,
                capacity: 1,
                fail: true,
                opened: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Number of endpoints opened so far
    pub fn open_count(&self) -> usize {
        self.inner
            .opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Most recently opened endpoint
    pub fn last_endpoint(&self) -> Option<Arc<ManualEndpoint>> {
        self.inner
            .opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl OutputPlatform for ManualPlatform {
    fn name(&self) -> &str {
        "manual"
    }

    fn open_endpoint(&self) -> Result<Arc<dyn AudioEndpoint>> {
        if self.inner.fail {
            return Err(Error::NoDevice);
        }
        let endpoint = Arc::new(ManualEndpoint::new(self.inner.sample_rate, self.inner.capacity));
        self.inner
            .opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&endpoint));
        Ok(endpoint)
    }
}
