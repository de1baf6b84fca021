//! ServerChan push channel — one instance per send key.

use std::time::Duration;

use async_trait::async_trait;
use dormwatch_core::error::{Error, Result};
use dormwatch_core::traits::NotificationChannel;
use dormwatch_core::types::{ChannelKind, Notice};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ServerChanResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
}

pub struct ServerChanChannel {
    name: String,
    key: String,
    api_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl ServerChanChannel {
    pub fn new(name: impl Into<String>, key: &str, api_url: &str, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            key: key.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Key with everything but its last four characters hidden.
    pub fn masked_key(&self) -> String {
        let visible: String = self
            .key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("…{visible}")
    }
}

#[async_trait]
impl NotificationChannel for ServerChanChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::ServerChan
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, notice: &Notice) -> Result<()> {
        let url = format!("{}/{}.send", self.api_url, self.key);
        let response = self
            .client
            .post(&url)
            .form(&[("title", notice.title.as_str()), ("desp", notice.body.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                // reqwest errors embed the URL, which embeds the key
                let e = e.without_url();
                if e.is_timeout() {
                    Error::Timeout(format!("ServerChan send: {e}"))
                } else {
                    Error::transport(format!("ServerChan send: {e}"))
                }
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        if status >= 500 || status == 429 {
            return Err(Error::HttpStatus { status, body: text });
        }

        let result: ServerChanResponse = serde_json::from_str(&text)
            .map_err(|e| Error::channel(format!("Invalid ServerChan response ({status}): {e}")))?;
        if result.code != 0 {
            return Err(Error::channel(format!(
                "ServerChan rejected key {}: {}",
                self.masked_key(),
                result.message.unwrap_or_else(|| format!("code {}", result.code))
            )));
        }

        tracing::info!("✅ ServerChan notification sent with key {}", self.masked_key());
        Ok(())
    }
}
