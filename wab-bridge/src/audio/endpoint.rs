//! Output endpoint seams

use std::sync::Arc;

use super::types::StereoBuffer;
use crate::error::Result;

/// A live two-channel output context.
///
/// Endpoints are shared between the bridge and host event handlers, so every
/// method takes `&self`.
pub trait AudioEndpoint: Send + Sync {
    /// Human readable endpoint name (device name for hardware endpoints)
    fn name(&self) -> &str;

    /// Native sample rate in Hz, fixed for the lifetime of the endpoint
    fn sample_rate(&self) -> f64;

    /// Playback clock in seconds; never decreases
    fn current_time(&self) -> f64;

    /// Queue `buffer` to start at `start_time` on the playback clock.
    ///
    /// A start time in the past plays immediately. Must not block.
    fn schedule(&self, buffer: StereoBuffer, start_time: f64);

    /// Unlock output after a user gesture by playing a one-frame silent buffer.
    fn unlock(&self) {
        self.schedule(StereoBuffer::silence(1, self.sample_rate()), 0.0);
    }
}

/// Creates output endpoints.
pub trait OutputPlatform: Send + Sync {
    /// Platform name for logging
    fn name(&self) -> &str;

    /// Construct a new endpoint
    fn open_endpoint(&self) -> Result<Arc<dyn AudioEndpoint>>;
}
