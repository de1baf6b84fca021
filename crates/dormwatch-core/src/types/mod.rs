//! Core domain types.

pub mod delivery;
pub mod event;
pub mod room;
pub mod snapshot;

pub use delivery::{ChannelKind, DeliveryOutcome, DeliveryResult, Notice};
pub use event::ChangeEvent;
pub use room::{Room, RoomStatus, Thresholds};
pub use snapshot::{RoomReading, StatusSnapshot};
