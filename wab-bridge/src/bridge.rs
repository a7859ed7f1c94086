//! The audio bridge
//!
//! [`AudioBridge`] owns one output endpoint and hands sample blocks from the
//! producer's linear memory to it. Lifecycle: `Uninitialized` until the first
//! successful [`AudioBridge::init`], then `Active` for the rest of its life.
//!
//! Policies:
//! - a second `init` logs a warning and changes nothing
//! - a failed endpoint construction is reported only through `init`'s return value
//! - every other operation fails with [`Error::NotInitialized`] before `init`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, error, info, trace, warn};
use wab_common::events::{GestureKind, HandlerAction, HostEvents, SubscriptionId, VisibilityState};

use crate::audio::{AudioEndpoint, OutputPlatform, StereoBuffer};
use crate::error::{Error, Result};
use crate::memory::{MemoryView, SAMPLE_BYTES};
use crate::pause::PauseTracker;

struct ActiveBridge {
    endpoint: Arc<dyn AudioEndpoint>,
    /// Frames per submitted block
    block_size: usize,
    pause: Arc<Mutex<PauseTracker>>,
    subscriptions: Vec<SubscriptionId>,
}

enum BridgeState {
    Uninitialized,
    Active(ActiveBridge),
}

/// Bridge between a sample producer and one stereo output endpoint.
pub struct AudioBridge {
    platform: Box<dyn OutputPlatform>,
    events: Arc<dyn HostEvents>,
    state: BridgeState,
}

impl AudioBridge {
    pub fn new(platform: Box<dyn OutputPlatform>, events: Arc<dyn HostEvents>) -> Self {
        Self {
            platform,
            events,
            state: BridgeState::Uninitialized,
        }
    }

    /// Create the endpoint and start listening for host events.
    ///
    /// Returns true if an endpoint is live afterwards. Never fails loudly:
    /// construction errors are logged and reported as `false`, after which a
    /// later call may try again.
    pub fn init(&mut self, block_size: usize) -> bool {
        if let BridgeState::Active(active) = &self.state {
            warn!(
                requested_block_size = block_size,
                block_size = active.block_size,
                "Audio already initialized, ignoring init"
            );
            return true;
        }

        if block_bytes(block_size).is_none() {
            error!(
                "Audio init rejected: {}",
                Error::InvalidBlockSize(i64::try_from(block_size).unwrap_or(i64::MAX))
            );
            return false;
        }

        let endpoint = match self.platform.open_endpoint() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                error!(
                    "Failed to create audio endpoint on {} platform: {}",
                    self.platform.name(),
                    e
                );
                return false;
            }
        };

        let pause = Arc::new(Mutex::new(PauseTracker::new()));
        let mut subscriptions = vec![subscribe_visibility(self.events.as_ref(), &pause)];
        subscriptions.extend(subscribe_unlock(&self.events, &endpoint));

        info!(
            endpoint = endpoint.name(),
            sample_rate = endpoint.sample_rate(),
            block_size,
            "Audio initialized"
        );

        self.state = BridgeState::Active(ActiveBridge {
            endpoint,
            block_size,
            pause,
            subscriptions,
        });
        true
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, BridgeState::Active(_))
    }

    /// Frames per block, once initialized
    pub fn block_size(&self) -> Option<usize> {
        match &self.state {
            BridgeState::Active(active) => Some(active.block_size),
            BridgeState::Uninitialized => None,
        }
    }

    /// The live endpoint, once initialized
    pub fn endpoint(&self) -> Option<&Arc<dyn AudioEndpoint>> {
        match &self.state {
            BridgeState::Active(active) => Some(&active.endpoint),
            BridgeState::Uninitialized => None,
        }
    }

    fn active(&self) -> Result<&ActiveBridge> {
        match &self.state {
            BridgeState::Active(active) => Ok(active),
            BridgeState::Uninitialized => Err(Error::NotInitialized),
        }
    }

    /// Endpoint playback clock in seconds
    pub fn current_time(&self) -> Result<f64> {
        Ok(self.active()?.endpoint.current_time())
    }

    /// Endpoint sample rate in Hz
    pub fn sample_rate(&self) -> Result<f64> {
        Ok(self.active()?.endpoint.sample_rate())
    }

    /// Copy one interleaved block out of `memory` at byte offset `pointer` and
    /// schedule it at `start_time` on the endpoint clock.
    ///
    /// `memory` must be the producer's memory as of this call. Returns the
    /// block's duration in seconds (`block_size / sample_rate`), so the
    /// producer's next block starts at `start_time + duration`.
    pub fn submit_samples(&self, memory: &[u8], pointer: usize, start_time: f64) -> Result<f64> {
        let active = self.active()?;
        let view = MemoryView::new(memory, pointer, active.block_size * 2)?;
        let sample_rate = active.endpoint.sample_rate();

        let buffer = StereoBuffer::from_interleaved(view.samples(), active.block_size, sample_rate);
        active.endpoint.schedule(buffer, start_time);

        trace!(pointer, start_time, frames = active.block_size, "Block scheduled");
        Ok(active.block_size as f64 / sample_rate)
    }

    /// Consume the last host suspension.
    ///
    /// Seconds the host was hidden (once), -1 while it is still hidden, 0 otherwise.
    pub fn pause_duration(&self) -> Result<f64> {
        let active = self.active()?;
        let duration = active
            .pause
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take_duration();
        if duration > 0.0 {
            debug!(duration, "Pause duration consumed");
        }
        Ok(duration)
    }
}

impl Drop for AudioBridge {
    fn drop(&mut self) {
        if let BridgeState::Active(active) = &self.state {
            for id in &active.subscriptions {
                self.events.unsubscribe(*id);
            }
        }
    }
}

/// Bytes in one interleaved stereo block of `block_size` frames.
///
/// None for an empty block or one too large to address.
fn block_bytes(block_size: usize) -> Option<usize> {
    if block_size == 0 {
        return None;
    }
    block_size.checked_mul(2)?.checked_mul(SAMPLE_BYTES)
}

/// Track visibility transitions in `pause`
fn subscribe_visibility(events: &dyn HostEvents, pause: &Arc<Mutex<PauseTracker>>) -> SubscriptionId {
    let pause = Arc::clone(pause);
    events.on_visibility(Box::new(move |event| {
        let mut tracker = pause.lock().unwrap_or_else(PoisonError::into_inner);
        match event.state {
            VisibilityState::Hidden => tracker.suspend(event.timestamp),
            VisibilityState::Visible => tracker.resume(event.timestamp),
        }
        HandlerAction::Keep
    }))
}

/// One-shot gesture listeners: the first gesture of any kind unlocks the
/// endpoint and removes all of them.
fn subscribe_unlock(
    events: &Arc<dyn HostEvents>,
    endpoint: &Arc<dyn AudioEndpoint>,
) -> Vec<SubscriptionId> {
    let unlocked = Arc::new(AtomicBool::new(false));
    let siblings: Arc<Mutex<Vec<SubscriptionId>>> = Arc::new(Mutex::new(Vec::new()));
    // Weak: the hub owns these handlers, a strong reference back would leak both
    let hub: Weak<dyn HostEvents> = Arc::downgrade(events);

    let ids: Vec<SubscriptionId> = GestureKind::ALL
        .iter()
        .map(|&kind| {
            let endpoint = Arc::clone(endpoint);
            let unlocked = Arc::clone(&unlocked);
            let siblings = Arc::clone(&siblings);
            let hub = Weak::clone(&hub);

            events.on_gesture(
                kind,
                Box::new(move |gesture| {
                    if !unlocked.swap(true, Ordering::SeqCst) {
                        info!(%gesture, "User gesture, unlocking audio output");
                        endpoint.unlock();
                    }
                    if let Some(hub) = hub.upgrade() {
                        let ids = std::mem::take(
                            &mut *siblings.lock().unwrap_or_else(PoisonError::into_inner),
                        );
                        for id in ids {
                            hub.unsubscribe(id);
                        }
                    }
                    HandlerAction::Remove
                }),
            )
        })
        .collect();

    *siblings.lock().unwrap_or_else(PoisonError::into_inner) = ids.clone();
    ids
}
