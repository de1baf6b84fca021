//! Unified error types for Dormwatch.

use thiserror::Error;

/// Result type alias using the Dormwatch error.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Portal errors
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Portal error: {0}")]
    Portal(String),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    // Channel errors
    #[error("Channel error: {0}")]
    Channel(String),

    // Persistence errors
    #[error("State store error: {0}")]
    State(String),

    #[error("History error: {0}")]
    History(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn portal(msg: impl Into<String>) -> Self {
        Self::Portal(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    /// Whether a retry has a chance of succeeding.
    ///
    /// Auth, config and remote-rejection errors are permanent for this run.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Whether the error comes from a rejected credential.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}
