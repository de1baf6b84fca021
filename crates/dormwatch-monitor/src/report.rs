//! Renders the CI job summary and the channel notice.
//!
//! Renderers never read the clock: identical input gives identical text.

use std::fmt::Write as _;

use chrono::FixedOffset;
use dormwatch_core::error::Error;
use dormwatch_core::types::{
    ChangeEvent, DeliveryOutcome, DeliveryResult, Notice, Room, RoomStatus, StatusSnapshot,
};

pub const WARNING_TITLE: &str = "⚠️ Dorm power warning ⚠️";
pub const REPORT_TITLE: &str = "🏠 Dorm power report 🏠";
const LOW_ADVICE: &str = "⚠️ Balance low, please top up soon!";
const FINE_ADVICE: &str = "Balance is fine, keep an eye on it.";

/// Everything a successful run reports on.
#[derive(Debug, Clone, Copy)]
pub struct RunReport<'a> {
    pub rooms: &'a [Room],
    pub snapshot: &'a StatusSnapshot,
    pub events: &'a [ChangeEvent],
    pub deliveries: &'a [DeliveryResult],
    /// Partial failures worth surfacing (e.g. page data not written).
    pub notes: &'a [String],
    pub tz: FixedOffset,
}

fn label_for<'a>(rooms: &'a [Room], key: &'a str) -> &'a str {
    rooms
        .iter()
        .find(|r| r.key == key)
        .map(|r| r.label.as_str())
        .unwrap_or(key)
}

fn format_balance(balance: Option<f64>) -> String {
    match balance {
        Some(b) => format!("{b:.2} kWh"),
        None => "—".to_string(),
    }
}

pub fn title_for(snapshot: &StatusSnapshot) -> &'static str {
    if snapshot.any_low() { WARNING_TITLE } else { REPORT_TITLE }
}

fn change_line(rooms: &[Room], event: &ChangeEvent) -> String {
    let from = event
        .previous
        .map(|s| s.as_str())
        .unwrap_or("new");
    format!(
        "{}: {} → {} ({})",
        label_for(rooms, &event.room),
        from,
        event.current,
        format_balance(event.balance)
    )
}

fn delivery_line(result: &DeliveryResult) -> String {
    match &result.outcome {
        DeliveryOutcome::Delivered { attempts: 1 } => format!("✅ {}: delivered", result.channel),
        DeliveryOutcome::Delivered { attempts } => {
            format!("✅ {}: delivered after {} attempts", result.channel, attempts)
        }
        DeliveryOutcome::Failed { attempts, error } => format!(
            "❌ {}: failed after {} attempt(s): {}",
            result.channel, attempts, error
        ),
        DeliveryOutcome::Disabled { reason } => {
            format!("⏸️ {}: disabled ({})", result.channel, reason)
        }
    }
}

/// Markdown summary of a completed run.
pub fn render(report: &RunReport<'_>) -> String {
    let mut out = String::new();
    let checked = report.snapshot.taken_at.with_timezone(&report.tz);

    let _ = writeln!(out, "## {}", title_for(report.snapshot));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "_Checked {} (UTC{})_",
        checked.format("%Y-%m-%d %H:%M:%S"),
        report.tz
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "### Changes");
    if report.events.is_empty() {
        let _ = writeln!(out, "- No changes since the last run.");
    }
    for event in report.events {
        let _ = writeln!(out, "- {}", change_line(report.rooms, event));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "### Balances");
    let _ = writeln!(out, "| Room | Balance | Status |");
    let _ = writeln!(out, "|---|---|---|");
    for reading in &report.snapshot.readings {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            label_for(report.rooms, &reading.room),
            format_balance(reading.balance),
            reading.status
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "### Notifications");
    if report.deliveries.is_empty() {
        let _ = writeln!(out, "- Not sent (no changes).");
    }
    for result in report.deliveries {
        let _ = writeln!(out, "- {}", delivery_line(result));
    }

    if !report.notes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "### Notes");
        for note in report.notes {
            let _ = writeln!(out, "- ⚠️ {note}");
        }
    }
    out
}

/// Markdown summary of a run that hit a fatal error.
pub fn render_failure(error: &Error, deliveries: &[DeliveryResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## ❌ Dorm power check failed");
    let _ = writeln!(out);
    let _ = writeln!(out, "**Error:** {error}");
    let _ = writeln!(out);
    if deliveries.is_empty() {
        let _ = writeln!(out, "No notifications were sent.");
    } else {
        let _ = writeln!(out, "### Notifications");
        for result in deliveries {
            let _ = writeln!(out, "- {}", delivery_line(result));
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "The saved state was not updated.");
    out
}

/// Channel-neutral notice: changes first, then every room's balance and an
/// advice line.
pub fn compose_notice(rooms: &[Room], events: &[ChangeEvent], snapshot: &StatusSnapshot) -> Notice {
    let mut body = String::new();

    if !events.is_empty() {
        let _ = writeln!(body, "Changes:");
        for event in events {
            let _ = writeln!(body, "• {}", change_line(rooms, event));
        }
        let _ = writeln!(body);
    }

    for reading in &snapshot.readings {
        let label = label_for(rooms, &reading.room);
        let _ = match reading.balance {
            Some(b) => writeln!(body, "{label}: {b:.2} kWh ({})", reading.status.badge()),
            None => writeln!(body, "{label}: unavailable ({})", reading.status.badge()),
        };
    }
    let _ = writeln!(body);

    let advice = if snapshot.any_low() { LOW_ADVICE } else { FINE_ADVICE };
    body.push_str(advice);

    Notice {
        title: title_for(snapshot).to_string(),
        body,
    }
}

/// True when every reading is [`RoomStatus::Unknown`].
pub fn all_unknown(snapshot: &StatusSnapshot) -> bool {
    !snapshot.is_empty()
        && snapshot
            .readings
            .iter()
            .all(|r| r.status == RoomStatus::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dormwatch_core::types::{ChannelKind, RoomReading};

    fn rooms() -> Vec<Room> {
        vec![Room::new("lt_room", "1"), Room::new("ac_room", "2")]
    }

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 30, 0).unwrap(),
            vec![
                RoomReading::known("lt_room", RoomStatus::Adequate, 42.5),
                RoomReading::known("ac_room", RoomStatus::Sufficient, 120.0),
            ],
        )
    }

    fn events(snap: &StatusSnapshot) -> Vec<ChangeEvent> {
        vec![
            ChangeEvent {
                room: "lt_room".into(),
                previous: Some(RoomStatus::Low),
                current: RoomStatus::Adequate,
                balance: Some(42.5),
                at: snap.taken_at,
            },
            ChangeEvent {
                room: "ac_room".into(),
                previous: None,
                current: RoomStatus::Sufficient,
                balance: Some(120.0),
                at: snap.taken_at,
            },
        ]
    }

    fn deliveries() -> Vec<DeliveryResult> {
        vec![
            DeliveryResult {
                channel: "telegram".into(),
                kind: ChannelKind::Telegram,
                outcome: DeliveryOutcome::Disabled {
                    reason: "TELEGRAM_BOT_TOKEN not set".into(),
                },
            },
            DeliveryResult {
                channel: "serverchan".into(),
                kind: ChannelKind::ServerChan,
                outcome: DeliveryOutcome::Delivered { attempts: 1 },
            },
            DeliveryResult {
                channel: "email".into(),
                kind: ChannelKind::Email,
                outcome: DeliveryOutcome::Failed {
                    attempts: 2,
                    error: "Timeout: SMTP send".into(),
                },
            },
        ]
    }

    fn cst() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn test_render_contains_every_section() {
        let (rooms, snap) = (rooms(), snapshot());
        let (events, deliveries) = (events(&snap), deliveries());
        let text = render(&RunReport {
            rooms: &rooms,
            snapshot: &snap,
            events: &events,
            deliveries: &deliveries,
            notes: &[],
            tz: cst(),
        });

        assert!(text.starts_with(&format!("## {REPORT_TITLE}\n")));
        assert!(text.contains("_Checked 2026-03-01 08:30:00 (UTC+08:00)_"));
        assert!(text.contains("- 💡 Lighting: low → adequate (42.50 kWh)"));
        assert!(text.contains("- ❄️ Air conditioning: new → sufficient (120.00 kWh)"));
        assert!(text.contains("| 💡 Lighting | 42.50 kWh | adequate |"));
        assert!(text.contains("- ⏸️ telegram: disabled (TELEGRAM_BOT_TOKEN not set)"));
        assert!(text.contains("- ✅ serverchan: delivered"));
        assert!(text.contains("- ❌ email: failed after 2 attempt(s): Timeout: SMTP send"));
        assert!(!text.contains("### Notes"));
    }

    #[test]
    fn test_render_is_stable() {
        let (rooms, snap) = (rooms(), snapshot());
        let (events, deliveries) = (events(&snap), deliveries());
        let notes = vec!["page data not written".to_string()];
        let report = RunReport {
            rooms: &rooms,
            snapshot: &snap,
            events: &events,
            deliveries: &deliveries,
            notes: &notes,
            tz: cst(),
        };
        assert_eq!(render(&report), render(&report));
        assert!(render(&report).contains("- ⚠️ page data not written"));
    }

    #[test]
    fn test_render_no_changes() {
        let (rooms, snap) = (rooms(), snapshot());
        let text = render(&RunReport {
            rooms: &rooms,
            snapshot: &snap,
            events: &[],
            deliveries: &[],
            notes: &[],
            tz: cst(),
        });
        assert!(text.contains("- No changes since the last run."));
        assert!(text.contains("- Not sent (no changes)."));
    }

    #[test]
    fn test_render_failure() {
        let text = render_failure(&Error::auth("wrong password"), &[]);
        assert!(text.contains("Dorm power check failed"));
        assert!(text.contains("Authentication failed: wrong password"));
        assert!(text.contains("No notifications were sent."));

        let text = render_failure(&Error::State("disk full".into()), &deliveries());
        assert!(text.contains("- ✅ serverchan: delivered"));
    }

    #[test]
    fn test_notice_titles_and_advice() {
        let rooms = rooms();
        let snap = snapshot();
        let notice = compose_notice(&rooms, &events(&snap), &snap);
        assert_eq!(notice.title, REPORT_TITLE);
        assert!(notice.body.starts_with("Changes:\n• 💡 Lighting: low → adequate"));
        assert!(notice.body.contains("💡 Lighting: 42.50 kWh (OK)"));
        assert!(notice.body.contains("❄️ Air conditioning: 120.00 kWh (Sufficient)"));
        assert!(notice.body.ends_with(FINE_ADVICE));

        let low = StatusSnapshot::new(
            snap.taken_at,
            vec![
                RoomReading::known("lt_room", RoomStatus::Low, 3.0),
                RoomReading::unknown("ac_room"),
            ],
        );
        let notice = compose_notice(&rooms, &[], &low);
        assert_eq!(notice.title, WARNING_TITLE);
        assert!(notice.body.contains("❄️ Air conditioning: unavailable (❓ Unknown)"));
        assert!(notice.body.ends_with(LOW_ADVICE));
    }

    #[test]
    fn test_all_unknown() {
        let snap = StatusSnapshot::new(
            Utc::now(),
            vec![RoomReading::unknown("lt_room"), RoomReading::unknown("ac_room")],
        );
        assert!(all_unknown(&snap));
        assert!(!all_unknown(&snapshot()));
    }
}
