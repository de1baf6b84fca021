//! # Dormwatch Channels
//! Notification channel implementations.

pub mod email;
pub mod serverchan;
pub mod telegram;

use dormwatch_core::config::{ChannelSetting, Config};
use dormwatch_core::traits::ChannelSlot;
use dormwatch_core::types::ChannelKind;

pub use email::EmailChannel;
pub use serverchan::ServerChanChannel;
pub use telegram::TelegramChannel;

/// Build every channel slot from config, in a fixed order: Telegram, each
/// ServerChan key, email. Incomplete credential sets become disabled slots.
pub fn slots_from_config(config: &Config) -> Vec<ChannelSlot> {
    let timeout = config.retry.timeout;
    let mut slots = Vec::new();

    match &config.channels.telegram {
        ChannelSetting::Enabled(tg) => {
            slots.push(ChannelSlot::enabled(TelegramChannel::new(tg.clone(), timeout)));
        }
        disabled => slots.push(disabled_slot("telegram", ChannelKind::Telegram, disabled)),
    }

    match &config.channels.serverchan {
        ChannelSetting::Enabled(sc) => {
            let many = sc.keys.len() > 1;
            for (i, key) in sc.keys.iter().enumerate() {
                let name = if many {
                    format!("serverchan#{}", i + 1)
                } else {
                    "serverchan".to_string()
                };
                slots.push(ChannelSlot::enabled(ServerChanChannel::new(
                    name,
                    key,
                    &sc.api_url,
                    timeout,
                )));
            }
        }
        disabled => slots.push(disabled_slot("serverchan", ChannelKind::ServerChan, disabled)),
    }

    match &config.channels.email {
        ChannelSetting::Enabled(email) => {
            slots.push(ChannelSlot::enabled(EmailChannel::new(email.clone(), timeout)));
        }
        disabled => slots.push(disabled_slot("email", ChannelKind::Email, disabled)),
    }

    let enabled = slots.iter().filter(|s| s.is_enabled()).count();
    tracing::info!("📡 {} of {} notification channel(s) enabled", enabled, slots.len());
    slots
}

fn disabled_slot<T>(name: &str, kind: ChannelKind, setting: &ChannelSetting<T>) -> ChannelSlot {
    let reason = setting
        .disabled_reason()
        .unwrap_or_else(|| "not configured".to_string());
    tracing::info!("⏸️ Channel {} disabled: {}", name, reason);
    ChannelSlot::Disabled {
        name: name.to_string(),
        kind,
        reason,
    }
}
