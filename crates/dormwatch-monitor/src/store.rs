//! File-based state store holding the previous run's snapshot as pretty JSON.
//! Human-readable and git-friendly; the page publisher ships it along with
//! the rest of the page data.

use std::path::PathBuf;

use dormwatch_core::error::{Error, Result};
use dormwatch_core::types::StatusSnapshot;

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the previous snapshot.
    ///
    /// `Ok(None)` on first run (missing or empty file). An unreadable or
    /// unparsable file is an error.
    pub fn load_previous(&self) -> Result<Option<StatusSnapshot>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("🆕 No previous state at {} — first run", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::State(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        if json.trim().is_empty() {
            tracing::warn!("⚠️ {} is empty — treating as first run", self.path.display());
            return Ok(None);
        }

        let snapshot: StatusSnapshot = serde_json::from_str(&json).map_err(|e| {
            Error::State(format!("Failed to parse {}: {e}", self.path.display()))
        })?;
        tracing::debug!(
            "📂 Loaded previous snapshot ({} rooms, taken {})",
            snapshot.len(),
            snapshot.taken_at
        );
        Ok(Some(snapshot))
    }

    /// Save atomically via temp file + rename.
    pub fn save(&self, snapshot: &StatusSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::State(format!("Create {}: {e}", parent.display())))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&tmp, json)
            .map_err(|e| Error::State(format!("Write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| Error::State(format!("Replace {}: {e}", self.path.display())))?;

        tracing::debug!("💾 Saved {} rooms to {}", snapshot.len(), self.path.display());
        Ok(())
    }
}
