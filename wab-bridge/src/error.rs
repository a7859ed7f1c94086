//! Error types for wab-bridge
//!
//! Defines crate-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the audio bridge
#[derive(Error, Debug)]
pub enum Error {
    /// No output device found
    #[error("No audio output device available")]
    NoDevice,

    /// Device offers no usable stream format
    #[error("Unsupported output stream format: {0}")]
    UnknownStreamFormat(String),

    /// Output stream could not be built or started
    #[error("Output stream error: {0}")]
    OutputStream(String),

    /// Other audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Operation requires a successful init first
    #[error("Audio bridge used before successful init")]
    NotInitialized,

    /// Block size passed to init is not a positive frame count
    #[error("Invalid block size: {0}")]
    InvalidBlockSize(i64),

    /// Sample block lies outside the producer's linear memory
    #[error("Memory access out of bounds: offset {offset} + {len} bytes exceeds {memory_len} bytes")]
    MemoryAccess {
        offset: usize,
        len: usize,
        memory_len: usize,
    },
}

/// Convenience Result type using wab-bridge Error
pub type Result<T> = std::result::Result<T, Error>;
