//! Change detection between the previous and the current snapshot.

use dormwatch_core::config::FirstObservation;
use dormwatch_core::types::{ChangeEvent, StatusSnapshot};

/// Events for every room whose status changed, in the current snapshot's
/// (configured) order.
///
/// Rooms missing from `previous` (or every room, when there is no previous
/// snapshot) are first observations and only produce events under
/// [`FirstObservation::Notify`]. Balance drift within one status is not a
/// change.
pub fn diff(
    previous: Option<&StatusSnapshot>,
    current: &StatusSnapshot,
    policy: FirstObservation,
) -> Vec<ChangeEvent> {
    current
        .readings
        .iter()
        .filter_map(|reading| {
            let before = previous.and_then(|p| p.status_of(&reading.room));
            let changed = match before {
                None => policy == FirstObservation::Notify,
                Some(status) => status != reading.status,
            };
            changed.then(|| ChangeEvent {
                room: reading.room.clone(),
                previous: before,
                current: reading.status,
                balance: reading.balance,
                at: current.taken_at,
            })
        })
        .collect()
}
