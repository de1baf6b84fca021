//! Telegram Bot channel — `sendMessage` with MarkdownV2 formatting.

use std::time::Duration;

use async_trait::async_trait;
use dormwatch_core::config::TelegramChannelConfig;
use dormwatch_core::error::{Error, Result};
use dormwatch_core::traits::NotificationChannel;
use dormwatch_core::types::{ChannelKind, Notice};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TelegramApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramChannel {
    config: TelegramChannelConfig,
    timeout: Duration,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramChannelConfig, timeout: Duration) -> Self {
        Self {
            config,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    /// Bold title, blank line, body. Everything is escaped for MarkdownV2.
    pub fn render(notice: &Notice) -> String {
        format!(
            "*{}*\n\n{}",
            escape_markdown_v2(&notice.title),
            escape_markdown_v2(&notice.body)
        )
    }
}

/// Escape every character MarkdownV2 treats as markup.
pub fn escape_markdown_v2(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '=' | '|'
                | '{' | '}' | '.' | '!' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, notice: &Notice) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": Self::render(notice),
            "parse_mode": "MarkdownV2",
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                // the request URL carries the bot token
                let e = e.without_url();
                if e.is_timeout() {
                    Error::Timeout(format!("Telegram sendMessage: {e}"))
                } else {
                    Error::transport(format!("Telegram sendMessage: {e}"))
                }
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        if status >= 500 || status == 429 {
            return Err(Error::HttpStatus { status, body: text });
        }

        let result: TelegramApiResponse = serde_json::from_str(&text)
            .map_err(|e| Error::channel(format!("Invalid Telegram response ({status}): {e}")))?;
        if !result.ok {
            let description = result.description.unwrap_or_default();
            return Err(if status == 401 {
                Error::auth(format!("Telegram rejected the bot token: {description}"))
            } else {
                Error::channel(format!("Telegram send failed: {description}"))
            });
        }

        tracing::info!("✅ Telegram notification sent: {}", notice.title);
        Ok(())
    }
}
