//! Playback scheduling through the bridge on a manual-clock endpoint
//!
//! Sample rate 100 Hz with 4-frame blocks keeps every start time on an exact
//! frame boundary (one block = 0.04 s).

mod helpers;

use helpers::{write_block, TestBridge};

const RATE: f64 = 100.0;
const FRAMES: usize = 4;
const BLOCK_BYTES: usize = FRAMES * 2 * 4;

fn constant_block(left: f32, right: f32) -> Vec<f32> {
    (0..FRAMES).flat_map(|_| [left, right]).collect()
}

/// Split interleaved output into (left, right)
fn channels(out: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let left = out.iter().step_by(2).copied().collect();
    let right = out.iter().skip(1).step_by(2).copied().collect();
    (left, right)
}

fn memory_with(blocks: &[Vec<f32>]) -> Vec<u8> {
    let mut memory = vec![0u8; BLOCK_BYTES * blocks.len()];
    for (i, block) in blocks.iter().enumerate() {
        write_block(&mut memory, i * BLOCK_BYTES, block);
    }
    memory
}

#[test]
fn test_clock_advances_with_rendering() {
    let mut t = TestBridge::new(RATE);
    let endpoint = t.init(FRAMES);

    assert_eq!(t.bridge.current_time().unwrap(), 0.0);
    endpoint.render(25);
    assert!((t.bridge.current_time().unwrap() - 0.25).abs() < 1e-12);
    assert_eq!(endpoint.frames_rendered(), 25);
}

#[test]
fn test_back_to_back_blocks_play_gapless() {
    let mut t = TestBridge::new(RATE);
    let endpoint = t.init(FRAMES);
    let memory = memory_with(&[constant_block(1.0, 0.5), constant_block(0.25, -0.25)]);

    let mut start = t.bridge.current_time().unwrap();
    start += t.bridge.submit_samples(&memory, 0, start).unwrap();
    t.bridge.submit_samples(&memory, BLOCK_BYTES, start).unwrap();

    let (left, right) = channels(&endpoint.render(FRAMES * 2 + 2));
    assert_eq!(left, vec![1.0, 1.0, 1.0, 1.0, 0.25, 0.25, 0.25, 0.25, 0.0, 0.0]);
    assert_eq!(right, vec![0.5, 0.5, 0.5, 0.5, -0.25, -0.25, -0.25, -0.25, 0.0, 0.0]);
}

#[test]
fn test_future_block_waits_for_start_time() {
    let mut t = TestBridge::new(RATE);
    let endpoint = t.init(FRAMES);
    let memory = memory_with(&[constant_block(0.5, 0.5)]);

    t.bridge.submit_samples(&memory, 0, 0.06).unwrap();

    let (left, _) = channels(&endpoint.render(10));
    assert_eq!(left, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.5, 0.5]);
}

#[test]
fn test_late_block_starts_immediately() {
    let mut t = TestBridge::new(RATE);
    let endpoint = t.init(FRAMES);
    let memory = memory_with(&[constant_block(0.5, -0.5)]);

    endpoint.render(8);
    t.bridge.submit_samples(&memory, 0, 0.0).unwrap();

    let (left, right) = channels(&endpoint.render(FRAMES));
    assert_eq!(left, vec![0.5; FRAMES]);
    assert_eq!(right, vec![-0.5; FRAMES]);
}

#[test]
fn test_overlapping_blocks_are_summed() {
    let mut t = TestBridge::new(RATE);
    let endpoint = t.init(FRAMES);
    let memory = memory_with(&[constant_block(0.5, 0.25), constant_block(0.25, 0.25)]);

    t.bridge.submit_samples(&memory, 0, 0.0).unwrap();
    t.bridge.submit_samples(&memory, BLOCK_BYTES, 0.02).unwrap();

    let (left, right) = channels(&endpoint.render(6));
    assert_eq!(left, vec![0.5, 0.5, 0.75, 0.75, 0.25, 0.25]);
    assert_eq!(right, vec![0.25, 0.25, 0.5, 0.5, 0.25, 0.25]);
}

#[test]
fn test_unlock_silence_is_inaudible() {
    let mut t = TestBridge::new(RATE);
    let endpoint = t.init(FRAMES);
    t.hub.emit_gesture(wab_common::GestureKind::TouchStart);

    let out = endpoint.render(FRAMES);
    assert!(out.iter().all(|s| *s == 0.0));
}

#[test]
fn test_submitted_block_is_a_copy() {
    let mut t = TestBridge::new(RATE);
    let endpoint = t.init(FRAMES);
    let mut memory = memory_with(&[constant_block(0.5, 0.5)]);

    t.bridge.submit_samples(&memory, 0, 0.0).unwrap();
    // Producer reuses its buffer right away
    write_block(&mut memory, 0, &constant_block(-1.0, -1.0));

    let (left, _) = channels(&endpoint.render(FRAMES));
    assert_eq!(left, vec![0.5; FRAMES]);
}
