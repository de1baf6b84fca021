//! Status snapshots: everything observed in one run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::room::RoomStatus;

/// One room's observed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomReading {
    /// Room key (see [`super::Room::key`]).
    pub room: String,
    pub status: RoomStatus,
    /// Remaining balance in kWh, absent when the fetch failed.
    #[serde(default)]
    pub balance: Option<f64>,
}

impl RoomReading {
    pub fn known(room: &str, status: RoomStatus, balance: f64) -> Self {
        Self {
            room: room.to_string(),
            status,
            balance: Some(balance),
        }
    }

    pub fn unknown(room: &str) -> Self {
        Self {
            room: room.to_string(),
            status: RoomStatus::Unknown,
            balance: None,
        }
    }
}

/// Readings for every configured room, in configured order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub taken_at: DateTime<Utc>,
    pub readings: Vec<RoomReading>,
}

impl StatusSnapshot {
    pub fn new(taken_at: DateTime<Utc>, readings: Vec<RoomReading>) -> Self {
        Self { taken_at, readings }
    }

    /// Look up a room's reading by key.
    pub fn get(&self, room: &str) -> Option<&RoomReading> {
        self.readings.iter().find(|r| r.room == room)
    }

    pub fn status_of(&self, room: &str) -> Option<RoomStatus> {
        self.get(room).map(|r| r.status)
    }

    pub fn any_low(&self) -> bool {
        self.readings.iter().any(|r| r.status == RoomStatus::Low)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
