//! The monitoring pipeline: one scheduled run from fetch to report.
//!
//! fetch → load previous → diff → dispatch → save → page history → render

use dormwatch_core::config::Config;
use dormwatch_core::error::Error;
use dormwatch_core::traits::{ChannelSlot, PowerSource};
use dormwatch_core::types::{ChangeEvent, DeliveryResult, StatusSnapshot};
use dormwatch_providers::fetch;

use crate::detect::diff;
use crate::dispatch::Dispatcher;
use crate::history::PageHistory;
use crate::report::{self, RunReport};
use crate::store::StateStore;

/// Result of one run. `report` is always filled, even on fatal errors.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: String,
    pub fatal: Option<Error>,
    pub snapshot: Option<StatusSnapshot>,
    pub events: Vec<ChangeEvent>,
    pub deliveries: Vec<DeliveryResult>,
    /// Partial failures that did not stop the run.
    pub notes: Vec<String>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.fatal.is_none()
    }

    fn failed(
        error: Error,
        snapshot: Option<StatusSnapshot>,
        events: Vec<ChangeEvent>,
        deliveries: Vec<DeliveryResult>,
    ) -> Self {
        tracing::error!("❌ Run failed: {}", error);
        Self {
            report: report::render_failure(&error, &deliveries),
            fatal: Some(error),
            snapshot,
            events,
            deliveries,
            notes: Vec::new(),
        }
    }
}

pub struct Monitor {
    config: Config,
    source: Box<dyn PowerSource>,
    store: StateStore,
    dispatcher: Dispatcher,
    history: PageHistory,
}

impl Monitor {
    pub fn new(config: Config, source: Box<dyn PowerSource>, slots: Vec<ChannelSlot>) -> Self {
        let store = StateStore::new(config.state_path.clone());
        let history = PageHistory::new(config.page_data_dir.clone(), config.timezone());
        let dispatcher = Dispatcher::new(slots, config.retry);
        Self {
            config,
            source,
            store,
            dispatcher,
            history,
        }
    }

    /// Execute one run. Never panics on run errors; they end up in the outcome.
    pub async fn run(&self) -> RunOutcome {
        let cfg = &self.config;
        tracing::info!(
            "🚀 Checking {} room(s) via {}",
            cfg.rooms.len(),
            self.source.name()
        );

        let snapshot = match fetch(
            self.source.as_ref(),
            &cfg.credential,
            &cfg.rooms,
            &cfg.thresholds,
            &cfg.retry,
        )
        .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => return RunOutcome::failed(e, None, Vec::new(), Vec::new()),
        };

        let mut notes = Vec::new();
        if report::all_unknown(&snapshot) {
            tracing::warn!("⚠️ No room could be read this run");
            notes.push("No room balance could be read; every room is unknown.".to_string());
        }

        let previous = match self.store.load_previous() {
            Ok(previous) => previous,
            Err(e) => return RunOutcome::failed(e, Some(snapshot), Vec::new(), Vec::new()),
        };

        let events = diff(previous.as_ref(), &snapshot, cfg.first_observation);
        tracing::info!("🔍 {} change(s) detected", events.len());

        let notice = report::compose_notice(&cfg.rooms, &events, &snapshot);
        let deliveries = self.dispatcher.dispatch(&events, &notice).await;

        if let Err(e) = self.store.save(&snapshot) {
            return RunOutcome::failed(e, Some(snapshot), events, deliveries);
        }

        if report::all_unknown(&snapshot) {
            tracing::info!("⏭️ Skipping page data, nothing to record");
        } else if let Err(e) = self.history.update(&snapshot) {
            tracing::warn!("⚠️ Page data not updated: {}", e);
            notes.push(format!("Page data not updated: {e}"));
        }

        let report = report::render(&RunReport {
            rooms: &cfg.rooms,
            snapshot: &snapshot,
            events: &events,
            deliveries: &deliveries,
            notes: &notes,
            tz: cfg.timezone(),
        });

        let failed = deliveries.iter().filter(|d| d.is_failed()).count();
        tracing::info!(
            "🏁 Run finished: {} change(s), {} delivery result(s), {} failed",
            events.len(),
            deliveries.len(),
            failed
        );

        RunOutcome {
            report,
            fatal: None,
            snapshot: Some(snapshot),
            events,
            deliveries,
            notes,
        }
    }
}
