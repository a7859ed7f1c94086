//! Audio output endpoints
//!
//! The bridge talks to output hardware only through [`AudioEndpoint`], created
//! on demand by an [`OutputPlatform`]. Implementations:
//! - [`output::CpalPlatform`]: system output device through cpal
//! - [`null::NullPlatform`]: no device, wall-clock timing, samples discarded
//! - [`manual::ManualPlatform`]: caller-driven clock and offline rendering

pub mod endpoint;
pub mod manual;
pub mod null;
pub mod output;
pub mod scheduler;
pub mod types;

pub use endpoint::{AudioEndpoint, OutputPlatform};
pub use manual::{ManualEndpoint, ManualPlatform};
pub use null::{NullEndpoint, NullPlatform};
pub use output::{CpalEndpoint, CpalPlatform};
pub use scheduler::{schedule_queue, FrameClock, ScheduleSender, ScheduledBuffer, Scheduler};
pub use types::StereoBuffer;

use wab_common::config::{AudioBackend, AudioConfig, UnlockConfig};

/// Build the output platform selected by configuration
pub fn platform_for(audio: &AudioConfig, unlock: &UnlockConfig) -> Box<dyn OutputPlatform> {
    match audio.backend {
        AudioBackend::Cpal => Box::new(CpalPlatform::from_config(audio, unlock)),
        AudioBackend::Null => Box::new(NullPlatform::new(audio.null_sample_rate as f64)),
    }
}
