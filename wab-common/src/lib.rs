//! # WAB Common Library
//!
//! Shared code for the WebAssembly audio bridge crates:
//! - Error types
//! - TOML bootstrap configuration and config file resolution
//! - Host event hub (page visibility and user gesture subscriptions)
//! - Monotonic host clock

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventHub, GestureKind, HandlerAction, HostEvents, SubscriptionId, VisibilityState};
