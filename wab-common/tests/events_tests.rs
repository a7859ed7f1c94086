//! Tests for the host event hub: delivery, one-shot handlers, re-entrancy

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use wab_common::events::{
    EventHub, GestureKind, HandlerAction, HostEvents, SubscriptionId, VisibilityEvent,
    VisibilityState,
};

#[test]
fn test_visibility_delivered_with_timestamp() {
    let hub = EventHub::new();
    let seen: Arc<Mutex<Vec<VisibilityEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    hub.on_visibility(Box::new(move |event| {
        sink.lock().unwrap().push(event);
        HandlerAction::Keep
    }));

    assert_eq!(hub.emit_visibility_at(VisibilityState::Hidden, 1.5), 1);
    assert_eq!(hub.emit_visibility_at(VisibilityState::Visible, 2.0), 1);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].state, VisibilityState::Hidden);
    assert_eq!(seen[0].timestamp, 1.5);
    assert_eq!(seen[1].state, VisibilityState::Visible);
    assert_eq!(seen[1].timestamp, 2.0);
}

#[test]
fn test_handlers_run_in_subscription_order() {
    let hub = EventHub::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for n in 0..3 {
        let order = Arc::clone(&order);
        hub.on_visibility(Box::new(move |_| {
            order.lock().unwrap().push(n);
            HandlerAction::Keep
        }));
    }

    hub.emit_visibility(VisibilityState::Hidden);
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_remove_action_deregisters_handler() {
    let hub = EventHub::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    hub.on_gesture(
        GestureKind::MouseDown,
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            HandlerAction::Remove
        }),
    );

    assert_eq!(hub.gesture_listener_count(GestureKind::MouseDown), 1);
    assert_eq!(hub.emit_gesture(GestureKind::MouseDown), 1);
    assert_eq!(hub.emit_gesture(GestureKind::MouseDown), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(hub.gesture_listener_count(GestureKind::MouseDown), 0);
}

#[test]
fn test_gestures_only_reach_matching_kind() {
    let hub = EventHub::new();
    let touches = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&touches);
    hub.on_gesture(
        GestureKind::TouchStart,
        Box::new(move |kind| {
            assert_eq!(kind, GestureKind::TouchStart);
            counter.fetch_add(1, Ordering::SeqCst);
            HandlerAction::Keep
        }),
    );

    assert_eq!(hub.emit_gesture(GestureKind::MouseDown), 0);
    assert_eq!(hub.emit_gesture(GestureKind::TouchEnd), 0);
    assert_eq!(hub.emit_gesture(GestureKind::TouchStart), 1);
    assert_eq!(touches.load(Ordering::SeqCst), 1);
    assert_eq!(hub.gesture_listener_count(GestureKind::TouchStart), 1);
}

#[test]
fn test_handler_can_unsubscribe_sibling_during_dispatch() {
    let hub = Arc::new(EventHub::new());
    let second_calls = Arc::new(AtomicUsize::new(0));
    let sibling: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

    {
        let hub_ref = Arc::clone(&hub);
        let sibling = Arc::clone(&sibling);
        hub.on_visibility(Box::new(move |_| {
            if let Some(id) = *sibling.lock().unwrap() {
                assert!(hub_ref.unsubscribe(id));
            }
            HandlerAction::Keep
        }));
    }
    let counter = Arc::clone(&second_calls);
    let second = hub.on_visibility(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        HandlerAction::Keep
    }));
    *sibling.lock().unwrap() = Some(second);

    assert_eq!(hub.emit_visibility(VisibilityState::Hidden), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    assert_eq!(hub.visibility_listener_count(), 1);
}

#[test]
fn test_handler_can_subscribe_during_dispatch() {
    let hub = Arc::new(EventHub::new());
    let late_calls = Arc::new(AtomicUsize::new(0));

    {
        let hub_ref = Arc::clone(&hub);
        let late_calls = Arc::clone(&late_calls);
        hub.on_gesture(
            GestureKind::TouchEnd,
            Box::new(move |_| {
                let counter = Arc::clone(&late_calls);
                hub_ref.on_gesture(
                    GestureKind::TouchEnd,
                    Box::new(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        HandlerAction::Keep
                    }),
                );
                HandlerAction::Remove
            }),
        );
    }

    // The new handler is not called for the event that registered it
    assert_eq!(hub.emit_gesture(GestureKind::TouchEnd), 1);
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);

    assert_eq!(hub.emit_gesture(GestureKind::TouchEnd), 1);
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_self_unsubscribe_during_dispatch() {
    let hub = Arc::new(EventHub::new());
    let own_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

    let hub_ref = Arc::clone(&hub);
    let id_slot = Arc::clone(&own_id);
    let id = hub.on_visibility(Box::new(move |_| {
        if let Some(id) = *id_slot.lock().unwrap() {
            assert!(hub_ref.unsubscribe(id));
        }
        HandlerAction::Keep
    }));
    *own_id.lock().unwrap() = Some(id);

    assert_eq!(hub.emit_visibility(VisibilityState::Visible), 1);
    assert_eq!(hub.visibility_listener_count(), 0);
    assert!(!hub.unsubscribe(id));
}
