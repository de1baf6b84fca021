//! Trait seams between the pipeline and the outside world.

pub mod channel;
pub mod source;

pub use channel::{ChannelSlot, NotificationChannel};
pub use source::{PowerSource, Session};
