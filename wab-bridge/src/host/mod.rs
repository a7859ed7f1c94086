//! WebAssembly host integration
//!
//! - [`imports`]: registers the `env.audio_*` functions on a wasmtime linker
//! - [`runner`]: loads a producer module and drives it from a timer and the
//!   stdin control channel

pub mod imports;
pub mod runner;

pub use imports::{add_to_linker, IMPORT_MODULE, MEMORY_EXPORT};
pub use runner::{ControlCommand, HostState, Runner};
