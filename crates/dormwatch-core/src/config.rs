//! Dormwatch configuration system.
//!
//! Everything is environment-supplied. [`Config::from_env`] is the only place
//! that reads the process environment; it delegates to [`Config::from_lookup`]
//! so tests can build a config from a plain map.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::error::{Error, Result};
use crate::types::{Room, Thresholds};

/// Portal account credential. Never persisted, never logged.
#[derive(Clone)]
pub struct Credential {
    pub account: String,
    pub password: String,
}

impl Credential {
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("account", &self.account)
            .field("password", &"***")
            .finish()
    }
}

/// Whether a room seen for the first time produces a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstObservation {
    Notify,
    Silent,
}

/// Retry and timeout policy for every external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one, transient errors only.
    pub max_retries: u32,
    /// Fixed pause before a retry.
    pub backoff: Duration,
    /// Upper bound for a single network call.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(2000),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// No retries and no pause; handy for tests.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Campus portal endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub auth_url: String,
    pub ecard_url: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            auth_url: "https://cas.s.zzu.edu.cn/token/password/passwordLogin".into(),
            ecard_url: "https://ecard.v.zzu.edu.cn/server/utilities".into(),
        }
    }
}

/// A channel is either fully configured or disabled with the names of the
/// variables that were missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSetting<T> {
    Enabled(T),
    Disabled { missing: Vec<String> },
}

impl<T> ChannelSetting<T> {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    /// Reason string for a disabled channel.
    pub fn disabled_reason(&self) -> Option<String> {
        match self {
            Self::Enabled(_) => None,
            Self::Disabled { missing } => Some(format!("{} not set", missing.join(", "))),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct TelegramChannelConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ServerChanConfig {
    /// One send key per target; each is tried independently.
    pub keys: Vec<String>,
    pub api_url: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct EmailChannelConfig {
    /// Sender and recipient (mail goes to self).
    pub address: String,
    /// SMTP authorization code.
    pub smtp_code: String,
    pub smtp_server: String,
    pub smtp_port: u16,
}

impl std::fmt::Debug for TelegramChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannelConfig")
            .field("bot_token", &"***")
            .field("chat_id", &self.chat_id)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl std::fmt::Debug for ServerChanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerChanConfig")
            .field("keys", &format_args!("[{} key(s)]", self.keys.len()))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl std::fmt::Debug for EmailChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailChannelConfig")
            .field("address", &self.address)
            .field("smtp_code", &"***")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

/// `Debug` of every channel config redacts its secrets, so this and
/// [`Config`] are safe to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelsConfig {
    pub telegram: ChannelSetting<TelegramChannelConfig>,
    pub serverchan: ChannelSetting<ServerChanConfig>,
    pub email: ChannelSetting<EmailChannelConfig>,
}

/// Root configuration, built once at process start.
#[derive(Debug, Clone)]
pub struct Config {
    pub credential: Credential,
    pub rooms: Vec<Room>,
    pub thresholds: Thresholds,
    pub first_observation: FirstObservation,
    pub retry: RetryPolicy,
    pub state_path: PathBuf,
    pub page_data_dir: PathBuf,
    pub tz_offset_hours: i32,
    pub portal: PortalConfig,
    pub channels: ChannelsConfig,
    /// CI job summary file the report is appended to.
    pub summary_path: Option<PathBuf>,
}

fn default_page_data_dir() -> String { "./page/data".into() }
fn default_state_path() -> String { "./page/data/state.json".into() }
fn default_telegram_api() -> String { "https://api.telegram.org".into() }
fn default_serverchan_api() -> String { "https://sctapi.ftqq.com".into() }
fn default_smtp_port() -> u16 { 465 }
fn default_tz_offset() -> i32 { 8 }

impl Config {
    /// Build the config from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let account = get("ACCOUNT").ok_or_else(|| Error::config("ACCOUNT is not set"))?;
        let password = get("PASSWORD").ok_or_else(|| Error::config("PASSWORD is not set"))?;

        let rooms = match get("ROOMS") {
            Some(spec) => parse_rooms(&spec)?,
            None => ["lt_room", "ac_room"]
                .iter()
                .filter_map(|key| get(key).map(|id| Room::new(key, &id)))
                .collect(),
        };
        if rooms.is_empty() {
            return Err(Error::config(
                "no rooms configured (set ROOMS or lt_room / ac_room)",
            ));
        }

        let defaults = Thresholds::default();
        let thresholds = Thresholds {
            low: parse_or(get("LOW_THRESHOLD"), "LOW_THRESHOLD", defaults.low)?,
            excellent: parse_or(
                get("EXCELLENT_THRESHOLD"),
                "EXCELLENT_THRESHOLD",
                defaults.excellent,
            )?,
        };
        if !thresholds.low.is_finite() || !thresholds.excellent.is_finite() {
            return Err(Error::config("LOW_THRESHOLD and EXCELLENT_THRESHOLD must be finite numbers"));
        }
        if thresholds.low >= thresholds.excellent {
            return Err(Error::config(format!(
                "LOW_THRESHOLD ({}) must be below EXCELLENT_THRESHOLD ({})",
                thresholds.low, thresholds.excellent
            )));
        }

        let notify_first = match get("NOTIFY_FIRST_OBSERVATION") {
            Some(v) => parse_bool(&v, "NOTIFY_FIRST_OBSERVATION")?,
            None => true,
        };
        let first_observation = if notify_first {
            FirstObservation::Notify
        } else {
            FirstObservation::Silent
        };

        let base = RetryPolicy::default();
        let retry = RetryPolicy {
            max_retries: parse_or(get("RETRY_MAX"), "RETRY_MAX", base.max_retries)?,
            backoff: Duration::from_millis(parse_or(
                get("RETRY_BACKOFF_MS"),
                "RETRY_BACKOFF_MS",
                base.backoff.as_millis() as u64,
            )?),
            timeout: Duration::from_secs(parse_or(
                get("REQUEST_TIMEOUT_SECS"),
                "REQUEST_TIMEOUT_SECS",
                base.timeout.as_secs(),
            )?),
        };
        if retry.timeout.is_zero() {
            return Err(Error::config("REQUEST_TIMEOUT_SECS must be positive"));
        }

        let tz_offset_hours = parse_or(get("TZ_OFFSET_HOURS"), "TZ_OFFSET_HOURS", default_tz_offset())?;
        if !(-12..=14).contains(&tz_offset_hours) {
            return Err(Error::config(format!(
                "TZ_OFFSET_HOURS out of range: {tz_offset_hours}"
            )));
        }

        let portal = {
            let d = PortalConfig::default();
            PortalConfig {
                auth_url: get("PORTAL_AUTH_URL").unwrap_or(d.auth_url),
                ecard_url: get("PORTAL_ECARD_URL").unwrap_or(d.ecard_url),
            }
        };

        let channels = ChannelsConfig {
            telegram: telegram_setting(&get),
            serverchan: serverchan_setting(&get),
            email: email_setting(&get)?,
        };

        Ok(Self {
            credential: Credential::new(account, password),
            rooms,
            thresholds,
            first_observation,
            retry,
            state_path: expand_path(&get("STATE_PATH").unwrap_or_else(default_state_path)),
            page_data_dir: expand_path(&get("PAGE_DATA_DIR").unwrap_or_else(default_page_data_dir)),
            tz_offset_hours,
            portal,
            channels,
            summary_path: get("GITHUB_STEP_SUMMARY").map(|p| expand_path(&p)),
        })
    }

    /// Timezone used for page records and report timestamps.
    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.tz_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

fn telegram_setting(get: &impl Fn(&str) -> Option<String>) -> ChannelSetting<TelegramChannelConfig> {
    match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
        (Some(bot_token), Some(chat_id)) => ChannelSetting::Enabled(TelegramChannelConfig {
            bot_token,
            chat_id,
            api_url: get("TELEGRAM_API_URL").unwrap_or_else(default_telegram_api),
        }),
        (token, chat) => ChannelSetting::Disabled {
            missing: missing_names(&[
                ("TELEGRAM_BOT_TOKEN", token.is_some()),
                ("TELEGRAM_CHAT_ID", chat.is_some()),
            ]),
        },
    }
}

fn serverchan_setting(get: &impl Fn(&str) -> Option<String>) -> ChannelSetting<ServerChanConfig> {
    let keys: Vec<String> = get("SERVERCHAN_KEYS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if keys.is_empty() {
        return ChannelSetting::Disabled {
            missing: vec!["SERVERCHAN_KEYS".into()],
        };
    }
    ChannelSetting::Enabled(ServerChanConfig {
        keys,
        api_url: get("SERVERCHAN_API_URL").unwrap_or_else(default_serverchan_api),
    })
}

fn email_setting(
    get: &impl Fn(&str) -> Option<String>,
) -> Result<ChannelSetting<EmailChannelConfig>> {
    let setting = match (get("EMAIL"), get("SMTP_CODE"), get("SMTP_SERVER")) {
        (Some(address), Some(smtp_code), Some(smtp_server)) => {
            ChannelSetting::Enabled(EmailChannelConfig {
                address,
                smtp_code,
                smtp_server,
                smtp_port: parse_or(get("SMTP_PORT"), "SMTP_PORT", default_smtp_port())?,
            })
        }
        (address, code, server) => ChannelSetting::Disabled {
            missing: missing_names(&[
                ("EMAIL", address.is_some()),
                ("SMTP_CODE", code.is_some()),
                ("SMTP_SERVER", server.is_some()),
            ]),
        },
    };
    Ok(setting)
}

fn missing_names(vars: &[(&str, bool)]) -> Vec<String> {
    vars.iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Parse `key=room_id` pairs, comma separated, keeping their order.
fn parse_rooms(spec: &str) -> Result<Vec<Room>> {
    let mut rooms: Vec<Room> = Vec::new();
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((key, id)) = entry.split_once('=') else {
            return Err(Error::config(format!(
                "ROOMS entry '{entry}' must look like key=room_id"
            )));
        };
        let (key, id) = (key.trim(), id.trim());
        if key.is_empty() || id.is_empty() {
            return Err(Error::config(format!("ROOMS entry '{entry}' is incomplete")));
        }
        if rooms.iter().any(|r| r.key == key) {
            return Err(Error::config(format!("ROOMS lists '{key}' twice")));
        }
        rooms.push(Room::new(key, id));
    }
    Ok(rooms)
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, name: &str, default: T) -> Result<T> {
    match value {
        Some(v) => v
            .parse()
            .map_err(|_| Error::config(format!("{name} has an invalid value: '{v}'"))),
        None => Ok(default),
    }
}

fn parse_bool(value: &str, name: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config(format!("{name} is not a boolean: '{other}'"))),
    }
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}
