//! Test helpers for wab-bridge integration tests
//!
//! - Bridges wired to a manual-clock platform and an in-process event hub
//! - Interleaved sample block generation and byte layout

#![allow(dead_code)]

pub mod blocks;

pub use blocks::{interleaved_bytes, ramp_block, write_block};

use std::sync::Arc;

use wab_bridge::audio::{ManualEndpoint, ManualPlatform};
use wab_bridge::AudioBridge;
use wab_common::EventHub;

/// A bridge on a manual platform, plus handles to drive it
pub struct TestBridge {
    pub bridge: AudioBridge,
    pub platform: ManualPlatform,
    pub hub: Arc<EventHub>,
}

impl TestBridge {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_platform(ManualPlatform::new(sample_rate))
    }

    pub fn with_platform(platform: ManualPlatform) -> Self {
        let hub = Arc::new(EventHub::new());
        let bridge = AudioBridge::new(Box::new(platform.clone()), hub.clone());
        Self {
            bridge,
            platform,
            hub,
        }
    }

    /// Initialize with `block_size` frames and return the opened endpoint
    pub fn init(&mut self, block_size: usize) -> Arc<ManualEndpoint> {
        assert!(self.bridge.init(block_size), "bridge init failed");
        self.platform.last_endpoint().expect("no endpoint opened")
    }
}
