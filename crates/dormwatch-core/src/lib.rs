//! # Dormwatch Core
//!
//! Shared types, traits, configuration, and errors for the Dormwatch pipeline.

pub mod config;
pub mod error;
pub mod retry;
pub mod traits;
pub mod types;

pub use config::{ChannelsConfig, Config, Credential, FirstObservation, RetryPolicy};
pub use error::{Error, Result};
