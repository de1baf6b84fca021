//! Notification dispatch — sends one notice to every configured channel.
//!
//! Channels are independent failure domains: each delivery runs with its own
//! timeout and retry budget, and whatever happens to it (error, timeout,
//! panic) ends up as a [`DeliveryResult`] instead of propagating.

use std::panic::AssertUnwindSafe;

use dormwatch_core::config::RetryPolicy;
use dormwatch_core::retry::with_retry;
use dormwatch_core::traits::{ChannelSlot, NotificationChannel};
use dormwatch_core::types::{ChangeEvent, DeliveryOutcome, DeliveryResult, Notice};
use futures::FutureExt;

pub struct Dispatcher {
    slots: Vec<ChannelSlot>,
    retry: RetryPolicy,
}

impl Dispatcher {
    pub fn new(slots: Vec<ChannelSlot>, retry: RetryPolicy) -> Self {
        Self { slots, retry }
    }

    /// Deliver `notice` for `events` to every slot.
    ///
    /// No events means no channel is touched and the result is empty.
    /// Otherwise there is exactly one result per slot, in slot order.
    pub async fn dispatch(&self, events: &[ChangeEvent], notice: &Notice) -> Vec<DeliveryResult> {
        if events.is_empty() {
            tracing::info!("😴 No changes — skipping notifications");
            return Vec::new();
        }

        tracing::info!(
            "📣 Dispatching {} change(s) to {} channel slot(s)",
            events.len(),
            self.slots.len()
        );
        let deliveries = self.slots.iter().map(|slot| self.deliver_slot(slot, notice));
        futures::future::join_all(deliveries).await
    }

    async fn deliver_slot(&self, slot: &ChannelSlot, notice: &Notice) -> DeliveryResult {
        let outcome = match slot {
            ChannelSlot::Disabled { reason, .. } => DeliveryOutcome::Disabled {
                reason: reason.clone(),
            },
            ChannelSlot::Enabled(channel) => {
                match AssertUnwindSafe(self.deliver_enabled(channel.as_ref(), notice))
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::error!("❌ Channel {} panicked during delivery", channel.name());
                        DeliveryOutcome::Failed {
                            attempts: 1,
                            error: "channel panicked during delivery".into(),
                        }
                    }
                }
            }
        };

        DeliveryResult {
            channel: slot.name().to_string(),
            kind: slot.kind(),
            outcome,
        }
    }

    async fn deliver_enabled(
        &self,
        channel: &dyn NotificationChannel,
        notice: &Notice,
    ) -> DeliveryOutcome {
        let what = format!("Delivery via {}", channel.name());
        let attempted = with_retry(&self.retry, &what, || channel.deliver(notice)).await;
        match attempted.result {
            Ok(()) => DeliveryOutcome::Delivered {
                attempts: attempted.attempts,
            },
            Err(e) => {
                tracing::warn!("⚠️ {} failed: {}", what, e);
                DeliveryOutcome::Failed {
                    attempts: attempted.attempts,
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use dormwatch_core::error::{Error, Result};
    use dormwatch_core::types::{ChannelKind, RoomStatus};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    enum Behavior {
        Succeed,
        Fail(fn() -> Error),
        FailOnceThenSucceed,
        Panic,
        Sleep(Duration),
    }

    struct FakeChannel {
        name: String,
        kind: ChannelKind,
        behavior: Behavior,
        calls: Arc<AtomicU32>,
    }

    impl FakeChannel {
        fn slot(name: &str, kind: ChannelKind, behavior: Behavior) -> (ChannelSlot, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            let channel = FakeChannel {
                name: name.into(),
                kind,
                behavior,
                calls: calls.clone(),
            };
            (ChannelSlot::enabled(channel), calls)
        }
    }

    #[async_trait]
    impl NotificationChannel for FakeChannel {
        fn kind(&self) -> ChannelKind {
            self.kind
        }

        fn name(&self) -> &str {
            &self.name
        }

        async fn deliver(&self, _notice: &Notice) -> Result<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Succeed => Ok(()),
                Behavior::Fail(make) => Err(make()),
                Behavior::FailOnceThenSucceed if n == 0 => Err(Error::transport("reset")),
                Behavior::FailOnceThenSucceed => Ok(()),
                Behavior::Panic => panic!("boom"),
                Behavior::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(())
                }
            }
        }
    }

    fn events() -> Vec<ChangeEvent> {
        vec![ChangeEvent {
            room: "lt_room".into(),
            previous: Some(RoomStatus::Adequate),
            current: RoomStatus::Low,
            balance: Some(5.0),
            at: Utc::now(),
        }]
    }

    fn notice() -> Notice {
        Notice {
            title: "t".into(),
            body: "b".into(),
        }
    }

    fn retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: Duration::ZERO,
            timeout: Duration::from_millis(500),
        }
    }

    fn disabled(name: &str, kind: ChannelKind) -> ChannelSlot {
        ChannelSlot::Disabled {
            name: name.into(),
            kind,
            reason: "TELEGRAM_BOT_TOKEN not set".into(),
        }
    }

    #[tokio::test]
    async fn test_no_events_touches_no_channel() {
        let (slot, calls) = FakeChannel::slot("serverchan", ChannelKind::ServerChan, Behavior::Succeed);
        let dispatcher = Dispatcher::new(vec![slot], retry(1));
        assert!(dispatcher.dispatch(&[], &notice()).await.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_channels_is_empty() {
        let dispatcher = Dispatcher::new(Vec::new(), retry(1));
        assert!(dispatcher.dispatch(&events(), &notice()).await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_chat_bot_and_working_push() {
        let (push, calls) = FakeChannel::slot("serverchan", ChannelKind::ServerChan, Behavior::Succeed);
        let dispatcher = Dispatcher::new(vec![disabled("telegram", ChannelKind::Telegram), push], retry(1));

        let results = dispatcher.dispatch(&events(), &notice()).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].channel, "telegram");
        assert_eq!(results[0].kind, ChannelKind::Telegram);
        assert!(results[0].is_disabled());
        assert_eq!(results[1].channel, "serverchan");
        assert_eq!(results[1].outcome, DeliveryOutcome::Delivered { attempts: 1 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_others() {
        let (bad, _) = FakeChannel::slot(
            "telegram",
            ChannelKind::Telegram,
            Behavior::Fail(|| Error::channel("chat not found")),
        );
        let (panicky, _) = FakeChannel::slot("serverchan", ChannelKind::ServerChan, Behavior::Panic);
        let (good, _) = FakeChannel::slot("email", ChannelKind::Email, Behavior::Succeed);
        let dispatcher = Dispatcher::new(vec![bad, panicky, good], retry(1));

        let results = dispatcher.dispatch(&events(), &notice()).await;
        assert!(results[0].is_failed());
        assert!(results[1].is_failed());
        assert!(results[2].is_success());
    }

    #[tokio::test]
    async fn test_transient_error_retried_once() {
        let (flaky, calls) =
            FakeChannel::slot("serverchan", ChannelKind::ServerChan, Behavior::FailOnceThenSucceed);
        let dispatcher = Dispatcher::new(vec![flaky], retry(1));

        let results = dispatcher.dispatch(&events(), &notice()).await;
        assert_eq!(results[0].outcome, DeliveryOutcome::Delivered { attempts: 2 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_auth_error_not_retried() {
        let (bad, calls) = FakeChannel::slot(
            "telegram",
            ChannelKind::Telegram,
            Behavior::Fail(|| Error::auth("bot token revoked")),
        );
        let dispatcher = Dispatcher::new(vec![bad], retry(3));

        let results = dispatcher.dispatch(&events(), &notice()).await;
        match &results[0].outcome {
            DeliveryOutcome::Failed { attempts, error } => {
                assert_eq!(*attempts, 1);
                assert!(error.contains("bot token revoked"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hung_channel_times_out_and_order_is_kept() {
        let (slow, _) = FakeChannel::slot(
            "telegram",
            ChannelKind::Telegram,
            Behavior::Sleep(Duration::from_secs(5)),
        );
        let (quick, _) = FakeChannel::slot("email", ChannelKind::Email, Behavior::Succeed);
        let dispatcher = Dispatcher::new(vec![slow, quick], retry(0));

        let results = dispatcher.dispatch(&events(), &notice()).await;
        assert_eq!(results[0].channel, "telegram");
        assert!(matches!(
            &results[0].outcome,
            DeliveryOutcome::Failed { error, .. } if error.starts_with("Timeout")
        ));
        assert_eq!(results[1].channel, "email");
        assert!(results[1].is_success());
    }
}
