//! Campus e-card portal client.
//!
//! Two calls are involved:
//! - `POST {auth_url}` with form `username` / `password`, answered by
//!   `{ "code": 0, "message": "...", "data": { "access_token": "..." } }`
//! - `GET {ecard_url}/remaining-power?room=<id>` with a bearer token, answered by
//!   `{ "code": 0, "data": { "remaining": 42.5 } }` (number or numeric string)
//!
//! Any non-zero `code` on login is a rejected credential.

use std::time::Duration;

use async_trait::async_trait;
use dormwatch_core::config::{Config, Credential, PortalConfig};
use dormwatch_core::error::{Error, Result};
use dormwatch_core::traits::{PowerSource, Session};
use dormwatch_core::types::Room;
use serde::Deserialize;
use serde_json::Value;

/// Common envelope of every portal answer.
#[derive(Debug, Deserialize)]
struct PortalResponse<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PowerData {
    remaining: Value,
}

/// HTTP implementation of [`PowerSource`].
pub struct PortalClient {
    auth_url: String,
    ecard_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl PortalClient {
    pub fn new(portal: &PortalConfig, timeout: Duration) -> Self {
        Self {
            auth_url: portal.auth_url.clone(),
            ecard_url: portal.ecard_url.trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.portal, config.retry.timeout)
    }

    async fn read_envelope<T: for<'de> Deserialize<'de>>(
        resp: reqwest::Response,
    ) -> Result<PortalResponse<T>> {
        resp.json::<PortalResponse<T>>()
            .await
            .map_err(|e| Error::portal(format!("Invalid portal response: {e}")))
    }
}

fn map_send_error(what: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("{what}: {e}"))
    } else {
        Error::transport(format!("{what}: {e}"))
    }
}

async fn status_error(resp: reqwest::Response) -> Error {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Error::HttpStatus { status, body }
}

/// The portal sends balances either as JSON numbers or numeric strings.
fn parse_balance(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl PowerSource for PortalClient {
    fn name(&self) -> &str {
        "zzu-ecard"
    }

    async fn login(&self, credential: &Credential) -> Result<Session> {
        tracing::info!("🔐 Logging in to the e-card portal as {}", credential.account);
        let resp = self
            .client
            .post(&self.auth_url)
            .form(&[
                ("username", credential.account.as_str()),
                ("password", credential.password.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| map_send_error("Portal login", e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::auth(format!("portal answered {status}")));
        }
        if !status.is_success() {
            return Err(status_error(resp).await);
        }

        let body: PortalResponse<LoginData> = Self::read_envelope(resp).await?;
        if body.code != 0 {
            return Err(Error::auth(
                body.message.unwrap_or_else(|| format!("login code {}", body.code)),
            ));
        }
        let data = body
            .data
            .ok_or_else(|| Error::portal("Login answer carries no token"))?;

        tracing::info!("✅ Portal login succeeded");
        Ok(Session {
            token: data.access_token,
        })
    }

    async fn remaining_power(&self, session: &Session, room: &Room) -> Result<f64> {
        let resp = self
            .client
            .get(format!("{}/remaining-power", self.ecard_url))
            .query(&[("room", room.room_id.as_str())])
            .bearer_auth(&session.token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| map_send_error("Balance query", e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::auth("session rejected by the e-card service"));
        }
        if !status.is_success() {
            return Err(status_error(resp).await);
        }

        let body: PortalResponse<PowerData> = Self::read_envelope(resp).await?;
        if body.code != 0 {
            return Err(Error::portal(format!(
                "Balance query for {} failed: {}",
                room.key,
                body.message.unwrap_or_else(|| format!("code {}", body.code))
            )));
        }
        body.data
            .as_ref()
            .and_then(|d| parse_balance(&d.remaining))
            .ok_or_else(|| Error::portal(format!("No balance in answer for {}", room.key)))
    }
}
