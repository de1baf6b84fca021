//! Page data for the static balance chart.
//!
//! Layout of the data directory:
//! - `YYYY-MM.json`: every distinct reading of that month
//! - `time.json`: month names present in the directory, newest first
//! - `last_30_records.json`: the newest records, spilling into the previous
//!   month when the current one is short

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveDate};
use dormwatch_core::error::{Error, Result};
use dormwatch_core::types::StatusSnapshot;
use serde_json::{Map, Value};

/// How many records the chart shows.
pub const MAX_RECENT: usize = 30;

const TIME_LIST: &str = "time.json";
const RECENT: &str = "last_30_records.json";

/// One chart point: `time` plus one `<prefix>_Balance` field per room.
pub type Record = Map<String, Value>;

/// What one [`PageHistory::update`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryUpdate {
    pub month: String,
    /// False when the reading repeated the month's last record.
    pub appended: bool,
    pub months: Vec<String>,
    pub recent: usize,
}

/// `lt_room` → `lt_Balance`, `water` → `water_Balance`.
pub fn balance_field(room_key: &str) -> String {
    let prefix = room_key.strip_suffix("_room").unwrap_or(room_key);
    format!("{prefix}_Balance")
}

/// Chart record for a snapshot, timestamped in `tz`.
pub fn record_for(snapshot: &StatusSnapshot, tz: &FixedOffset) -> Record {
    let local = snapshot.taken_at.with_timezone(tz);
    let mut record = Record::new();
    record.insert(
        "time".into(),
        Value::String(local.format("%m-%d %H:%M:%S").to_string()),
    );
    for reading in &snapshot.readings {
        let balance = reading
            .balance
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
        record.insert(balance_field(&reading.room), balance);
    }
    record
}

fn same_balances(a: &Record, b: &Record) -> bool {
    let balances = |r: &Record| {
        r.iter()
            .filter(|(k, _)| k.as_str() != "time")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Vec<_>>()
    };
    balances(a) == balances(b)
}

fn is_month_name(stem: &str) -> bool {
    stem.len() == 7 && NaiveDate::parse_from_str(&format!("{stem}-01"), "%Y-%m-%d").is_ok()
}

pub struct PageHistory {
    dir: PathBuf,
    tz: FixedOffset,
}

impl PageHistory {
    pub fn new(dir: impl Into<PathBuf>, tz: FixedOffset) -> Self {
        Self { dir: dir.into(), tz }
    }

    /// Record the snapshot and refresh the month index and the recent list.
    pub fn update(&self, snapshot: &StatusSnapshot) -> Result<HistoryUpdate> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::History(format!("Create {}: {e}", self.dir.display())))?;

        let month = snapshot
            .taken_at
            .with_timezone(&self.tz)
            .format("%Y-%m")
            .to_string();
        let (records, appended) = self.append(&month, record_for(snapshot, &self.tz))?;
        let months = self.update_time_list()?;
        let recent = self.write_recent(records, &months)?;

        tracing::info!(
            "📈 Page data updated: {} ({}), {} recent record(s)",
            month,
            if appended { "appended" } else { "unchanged" },
            recent
        );
        Ok(HistoryUpdate {
            month,
            appended,
            months,
            recent,
        })
    }

    fn month_path(&self, month: &str) -> PathBuf {
        self.dir.join(format!("{month}.json"))
    }

    fn append(&self, month: &str, record: Record) -> Result<(Vec<Record>, bool)> {
        let path = self.month_path(month);
        let mut records: Vec<Record> = read_json(&path)?.unwrap_or_default();

        if records.last().is_some_and(|last| same_balances(last, &record)) {
            tracing::debug!("📈 Balances match the last record of {month}, skipping");
            return Ok((records, false));
        }

        records.push(record);
        write_json(&path, &records)?;
        Ok((records, true))
    }

    /// Rebuild `time.json` from the month files on disk.
    fn update_time_list(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| Error::History(format!("List {}: {e}", self.dir.display())))?;

        let mut months: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let stem = name.strip_suffix(".json")?;
                is_month_name(stem).then(|| stem.to_string())
            })
            .collect();
        months.sort_unstable_by(|a, b| b.cmp(a));

        write_json(&self.dir.join(TIME_LIST), &months)?;
        Ok(months)
    }

    fn write_recent(&self, current: Vec<Record>, months: &[String]) -> Result<usize> {
        let mut recent = current;
        if recent.len() < MAX_RECENT
            && let Some(previous) = months.get(1)
        {
            let older: Vec<Record> = read_json(&self.month_path(previous))?.unwrap_or_default();
            let wanted = (MAX_RECENT - recent.len()).min(older.len());
            let mut filled = older[older.len() - wanted..].to_vec();
            filled.extend(recent);
            recent = filled;
        }
        let skip = recent.len().saturating_sub(MAX_RECENT);
        let recent = &recent[skip..];

        write_json(&self.dir.join(RECENT), recent)?;
        Ok(recent.len())
    }
}

/// `Ok(None)` for a missing or blank file.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::History(format!("Read {}: {e}", path.display()))),
    };
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| Error::History(format!("Parse {}: {e}", path.display())))
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .map_err(|e| Error::History(format!("Write {}: {e}", tmp.display())))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| Error::History(format!("Rename to {}: {e}", path.display())))
}
