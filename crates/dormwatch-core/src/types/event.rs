use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::room::RoomStatus;

/// A detected status change for one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub room: String,
    /// `None` on first observation.
    pub previous: Option<RoomStatus>,
    pub current: RoomStatus,
    pub balance: Option<f64>,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn is_first_observation(&self) -> bool {
        self.previous.is_none()
    }
}
