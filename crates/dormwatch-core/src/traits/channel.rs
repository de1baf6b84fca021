//! Notification channel trait — one implementation per delivery back-end.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChannelKind, Notice};

/// A configured, ready-to-use notification back-end.
///
/// Implementations render the [`Notice`] in their own format and perform a
/// single delivery attempt; retries and timeouts are applied by the caller.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Which family this channel belongs to.
    fn kind(&self) -> ChannelKind;

    /// Display name used in logs and reports (e.g. `serverchan#2`).
    fn name(&self) -> &str;

    /// Deliver one notice.
    async fn deliver(&self, notice: &Notice) -> Result<()>;
}

/// A channel as configured for this run: ready to deliver, or disabled
/// because part of its credential set is missing.
pub enum ChannelSlot {
    Enabled(Box<dyn NotificationChannel>),
    Disabled {
        name: String,
        kind: ChannelKind,
        reason: String,
    },
}

impl ChannelSlot {
    pub fn enabled(channel: impl NotificationChannel + 'static) -> Self {
        Self::Enabled(Box::new(channel))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Enabled(channel) => channel.name(),
            Self::Disabled { name, .. } => name,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Enabled(channel) => channel.kind(),
            Self::Disabled { kind, .. } => *kind,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }
}
