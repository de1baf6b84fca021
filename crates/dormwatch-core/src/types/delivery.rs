//! Notices and per-channel delivery results.

/// Which kind of channel a delivery went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Telegram bot (`sendMessage`).
    Telegram,
    /// ServerChan push service.
    ServerChan,
    /// SMTP email.
    Email,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::ServerChan => "serverchan",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel-neutral message. Each channel renders it in its own format.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

/// What happened when delivering to one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Failed { attempts: u32, error: String },
    /// Channel not configured; never attempted.
    Disabled { reason: String },
}

/// Result of one channel's delivery attempt within a run.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryResult {
    pub channel: String,
    pub kind: ChannelKind,
    pub outcome: DeliveryOutcome,
}

impl DeliveryResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Delivered { .. })
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Disabled { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Failed { .. })
    }
}
