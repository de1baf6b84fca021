//! Rooms and the status derived from their remaining balance.

use serde::{Deserialize, Serialize};

/// A metered room account watched on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Stable key used in snapshots and page data (e.g. `lt_room`).
    pub key: String,
    /// Identifier the portal knows the meter by.
    pub room_id: String,
    /// Human-readable name for reports.
    pub label: String,
}

impl Room {
    /// Build a room, picking a label from the well-known keys.
    pub fn new(key: &str, room_id: &str) -> Self {
        Self {
            key: key.to_string(),
            room_id: room_id.to_string(),
            label: default_label(key),
        }
    }
}

fn default_label(key: &str) -> String {
    match key {
        "lt_room" => "💡 Lighting".into(),
        "ac_room" => "❄️ Air conditioning".into(),
        other => other.to_string(),
    }
}

/// Observed state of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Above the "excellent" threshold.
    Sufficient,
    /// Between the low and excellent thresholds.
    Adequate,
    /// At or below the low threshold.
    Low,
    /// The portal could not be asked.
    Unknown,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sufficient => "sufficient",
            Self::Adequate => "adequate",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }

    /// Short tag shown next to a balance in notices.
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Sufficient => "Sufficient",
            Self::Adequate => "OK",
            Self::Low => "⚠️ Low",
            Self::Unknown => "❓ Unknown",
        }
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Balance thresholds (kWh) that map a balance onto a [`RoomStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_low")]
    pub low: f64,
    #[serde(default = "default_excellent")]
    pub excellent: f64,
}

fn default_low() -> f64 { 10.0 }
fn default_excellent() -> f64 { 100.0 }

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low: default_low(),
            excellent: default_excellent(),
        }
    }
}

impl Thresholds {
    pub fn classify(&self, balance: f64) -> RoomStatus {
        if balance > self.excellent {
            RoomStatus::Sufficient
        } else if balance > self.low {
            RoomStatus::Adequate
        } else {
            RoomStatus::Low
        }
    }
}
