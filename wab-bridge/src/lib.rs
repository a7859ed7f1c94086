//! # WAB Audio Bridge Library (wab-bridge)
//!
//! Exposes a host audio output device to a WebAssembly sample producer.
//!
//! **Purpose:** Own a single stereo output endpoint, copy interleaved sample
//! blocks out of the producer's linear memory into it on demand, and report
//! playback clock, sample rate and host suspension time back to the producer.
//!
//! **Architecture:** [`AudioBridge`] sits between the producer (WASM module
//! calling the `env.audio_*` imports registered by [`host::add_to_linker`]),
//! the host environment (visibility and gesture events through
//! [`wab_common::HostEvents`]) and an output endpoint created by an
//! [`audio::OutputPlatform`] (cpal device, null device, or manual clock).

pub mod audio;
pub mod bridge;
pub mod error;
pub mod host;
pub mod memory;
pub mod pause;

pub use bridge::AudioBridge;
pub use error::{Error, Result};
pub use memory::MemoryView;
pub use pause::{PauseTracker, PauseWindow};
