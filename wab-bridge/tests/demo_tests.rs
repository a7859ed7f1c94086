//! The bundled square-wave producer, run against a manual-clock endpoint

use std::path::PathBuf;
use std::sync::Arc;

use wab_bridge::audio::{AudioEndpoint, ManualPlatform};
use wab_bridge::host::{ControlCommand, Runner};
use wab_bridge::AudioBridge;
use wab_common::config::HostConfig;
use wab_common::EventHub;

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos/square.wat")
}

fn square_runner(platform: &ManualPlatform) -> Runner {
    let hub = Arc::new(EventHub::new());
    let bridge = AudioBridge::new(Box::new(platform.clone()), hub.clone());
    Runner::from_file(&demo_path(), bridge, hub, HostConfig::default()).unwrap()
}

#[test]
fn test_square_schedules_ahead_of_clock() {
    let platform = ManualPlatform::new(44100.0);
    let mut runner = square_runner(&platform);
    runner.start().unwrap();
    assert_eq!(runner.bridge().block_size(), Some(1024));

    runner.tick().unwrap();
    let endpoint = platform.last_endpoint().unwrap();
    // 1024 frames at 44.1 kHz: five blocks cover the first 100 ms
    let first = endpoint.take_scheduled();
    assert_eq!(first.len(), 5);
    for pair in first.windows(2) {
        let gap = pair[1].start_time - pair[0].start_time;
        assert!((gap - 1024.0 / 44100.0).abs() < 1e-9);
    }
    assert!(first[0].buffer.left().iter().all(|s| s.abs() == 0.25));

    // Clock has not moved: nothing new to schedule
    runner.tick().unwrap();
    assert!(endpoint.take_scheduled().is_empty());

    endpoint.render(4410);
    runner.tick().unwrap();
    assert!(!endpoint.take_scheduled().is_empty());
}

#[test]
fn test_square_stops_while_hidden() {
    let platform = ManualPlatform::new(44100.0);
    let mut runner = square_runner(&platform);
    runner.start().unwrap();
    let endpoint = platform.last_endpoint().unwrap();
    runner.tick().unwrap();
    endpoint.take_scheduled();

    runner.handle_command(ControlCommand::Hide);
    endpoint.render(44100);
    runner.tick().unwrap();
    assert!(endpoint.take_scheduled().is_empty());

    runner.handle_command(ControlCommand::Show);
    runner.tick().unwrap();
    let resumed = endpoint.take_scheduled();
    assert!(!resumed.is_empty());
    // Re-anchored to the playback clock rather than the stale schedule
    assert!((resumed[0].start_time - endpoint.current_time()).abs() < 1e-9);
}
