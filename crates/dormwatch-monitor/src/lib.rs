//! # Dormwatch Monitor
//!
//! Everything after the fetch: previous-state store, change detection,
//! notification dispatch, page history and run reports, tied together by
//! [`Monitor`].

pub mod detect;
pub mod dispatch;
pub mod engine;
pub mod history;
pub mod report;
pub mod store;

pub use detect::diff;
pub use dispatch::Dispatcher;
pub use engine::{Monitor, RunOutcome};
pub use history::PageHistory;
pub use store::StateStore;
