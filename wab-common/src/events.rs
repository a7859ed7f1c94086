//! Host event types and the event hub
//!
//! The host environment (a browser page, a desktop window, or the stdin control
//! channel of `wab-host`) produces two kinds of signals the audio bridge cares
//! about:
//! - page/window visibility transitions, used for pause accounting
//! - user gestures, used to unlock audio output under autoplay policies
//!
//! Consumers subscribe through the [`HostEvents`] capability. A handler decides
//! after every delivery whether it stays registered by returning a
//! [`HandlerAction`]; returning [`HandlerAction::Remove`] is how one-shot
//! listeners deregister themselves.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::time::MonotonicClock;

/// Visibility of the host page or window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    Visible,
    Hidden,
}

/// User input events that count as an audio-unlocking gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    TouchStart,
    TouchEnd,
    MouseDown,
}

impl GestureKind {
    /// Every gesture kind, in registration order
    pub const ALL: [GestureKind; 3] = [
        GestureKind::TouchStart,
        GestureKind::TouchEnd,
        GestureKind::MouseDown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GestureKind::TouchStart => "touchstart",
            GestureKind::TouchEnd => "touchend",
            GestureKind::MouseDown => "mousedown",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A visibility transition with the host timestamp (seconds) it occurred at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEvent {
    pub state: VisibilityState,
    pub timestamp: f64,
}

/// Handle identifying one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// What a handler wants after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerAction {
    /// Stay subscribed
    Keep,
    /// Deregister this handler
    Remove,
}

pub type VisibilityHandler = Box<dyn FnMut(VisibilityEvent) -> HandlerAction + Send>;
pub type GestureHandler = Box<dyn FnMut(GestureKind) -> HandlerAction + Send>;

/// Subscription capability exposed by the host environment.
pub trait HostEvents: Send + Sync {
    /// Subscribe to every visibility transition.
    fn on_visibility(&self, handler: VisibilityHandler) -> SubscriptionId;

    /// Subscribe to one kind of user gesture.
    fn on_gesture(&self, kind: GestureKind, handler: GestureHandler) -> SubscriptionId;

    /// Remove a subscription. Returns false if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Current host timestamp in seconds.
    fn now(&self) -> f64;
}

#[derive(Default)]
struct HubInner {
    visibility: Vec<(SubscriptionId, VisibilityHandler)>,
    gestures: Vec<(SubscriptionId, GestureKind, GestureHandler)>,
    /// Ids whose handlers are currently taken out for dispatch
    dispatching: HashSet<SubscriptionId>,
    /// Ids unsubscribed while their handler was being dispatched
    cancelled: HashSet<SubscriptionId>,
}

/// In-process [`HostEvents`] implementation.
///
/// Handlers run with the hub unlocked, so a handler may subscribe or
/// unsubscribe (itself or others) while an event is being delivered.
/// Events are expected to come from a single event loop; two threads emitting
/// the same event type at once would each see only part of the listener list.
pub struct EventHub {
    inner: Mutex<HubInner>,
    next_id: AtomicU64,
    clock: MonotonicClock,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HubInner::default()),
            next_id: AtomicU64::new(1),
            clock: MonotonicClock::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Deliver a visibility transition stamped with the hub clock.
    ///
    /// Returns the number of handlers the event was delivered to.
    pub fn emit_visibility(&self, state: VisibilityState) -> usize {
        self.emit_visibility_at(state, self.now())
    }

    /// Deliver a visibility transition with an explicit timestamp.
    pub fn emit_visibility_at(&self, state: VisibilityState, timestamp: f64) -> usize {
        let event = VisibilityEvent { state, timestamp };
        debug!(?state, timestamp, "Visibility changed");

        let mut taken = {
            let mut inner = self.lock();
            let taken = std::mem::take(&mut inner.visibility);
            inner.dispatching.extend(taken.iter().map(|(id, _)| *id));
            taken
        };

        let mut delivered = 0;
        let mut finished = HashSet::new();
        for (id, handler) in taken.iter_mut() {
            if self.lock().cancelled.contains(id) {
                continue;
            }
            delivered += 1;
            if handler(event) == HandlerAction::Remove {
                finished.insert(*id);
            }
        }

        let mut inner = self.lock();
        for (id, _) in &taken {
            inner.dispatching.remove(id);
            if inner.cancelled.remove(id) {
                finished.insert(*id);
            }
        }
        taken.retain(|(id, _)| !finished.contains(id));
        // Handlers subscribed during dispatch go after the existing ones
        taken.append(&mut inner.visibility);
        inner.visibility = taken;

        delivered
    }

    /// Deliver a user gesture to the handlers subscribed to its kind.
    ///
    /// Returns the number of handlers the gesture was delivered to.
    pub fn emit_gesture(&self, kind: GestureKind) -> usize {
        trace!(%kind, "Gesture");

        let mut taken = {
            let mut inner = self.lock();
            let all = std::mem::take(&mut inner.gestures);
            let (taken, rest): (Vec<_>, Vec<_>) =
                all.into_iter().partition(|(_, k, _)| *k == kind);
            inner.gestures = rest;
            inner.dispatching.extend(taken.iter().map(|(id, _, _)| *id));
            taken
        };

        let mut delivered = 0;
        let mut finished = HashSet::new();
        for (id, _, handler) in taken.iter_mut() {
            if self.lock().cancelled.contains(id) {
                continue;
            }
            delivered += 1;
            if handler(kind) == HandlerAction::Remove {
                finished.insert(*id);
            }
        }

        let mut inner = self.lock();
        for (id, _, _) in &taken {
            inner.dispatching.remove(id);
            if inner.cancelled.remove(id) {
                finished.insert(*id);
            }
        }
        taken.retain(|(id, _, _)| !finished.contains(id));
        // Keep subscription order stable: older ids first
        taken.append(&mut inner.gestures);
        taken.sort_by_key(|(id, _, _)| *id);
        inner.gestures = taken;

        delivered
    }

    /// Number of registered visibility listeners
    pub fn visibility_listener_count(&self) -> usize {
        let inner = self.lock();
        inner.visibility.len()
    }

    /// Number of registered listeners for one gesture kind
    pub fn gesture_listener_count(&self, kind: GestureKind) -> usize {
        self.lock()
            .gestures
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEvents for EventHub {
    fn on_visibility(&self, handler: VisibilityHandler) -> SubscriptionId {
        let id = self.allocate_id();
        self.lock().visibility.push((id, handler));
        debug!(%id, "Visibility listener registered");
        id
    }

    fn on_gesture(&self, kind: GestureKind, handler: GestureHandler) -> SubscriptionId {
        let id = self.allocate_id();
        self.lock().gestures.push((id, kind, handler));
        debug!(%id, %kind, "Gesture listener registered");
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();

        if let Some(pos) = inner.visibility.iter().position(|(sid, _)| *sid == id) {
            inner.visibility.remove(pos);
            return true;
        }
        if let Some(pos) = inner.gestures.iter().position(|(sid, _, _)| *sid == id) {
            inner.gestures.remove(pos);
            return true;
        }
        if inner.dispatching.contains(&id) {
            return inner.cancelled.insert(id);
        }
        false
    }

    fn now(&self) -> f64 {
        self.clock.now_secs()
    }
}
