//! Room status fetcher.
//!
//! Login failure aborts the run. A failed room query only turns that room
//! into [`RoomStatus::Unknown`]; the other rooms are still asked.

use chrono::Utc;
use dormwatch_core::config::{Credential, RetryPolicy};
use dormwatch_core::error::Result;
use dormwatch_core::retry::with_retry;
use dormwatch_core::traits::PowerSource;
use dormwatch_core::types::{Room, RoomReading, RoomStatus, StatusSnapshot, Thresholds};

/// Log in and read every configured room, in configured order.
pub async fn fetch(
    source: &dyn PowerSource,
    credential: &Credential,
    rooms: &[Room],
    thresholds: &Thresholds,
    retry: &RetryPolicy,
) -> Result<StatusSnapshot> {
    let login = with_retry(retry, "Portal login", || source.login(credential)).await;
    let session = match login.result {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("❌ Login to {} failed: {}", source.name(), e);
            return Err(e);
        }
    };

    let mut readings = Vec::with_capacity(rooms.len());
    for room in rooms {
        let what = format!("Balance query for {}", room.key);
        let query = with_retry(retry, &what, || source.remaining_power(&session, room)).await;
        let reading = match query.result {
            Ok(balance) => {
                let status = thresholds.classify(balance);
                tracing::info!("🔌 {}: {:.2} kWh ({})", room.label, balance, status);
                RoomReading::known(&room.key, status, balance)
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ {} unreachable after {} attempt(s): {} — recording {}",
                    room.key,
                    query.attempts,
                    e,
                    RoomStatus::Unknown
                );
                RoomReading::unknown(&room.key)
            }
        };
        readings.push(reading);
    }

    Ok(StatusSnapshot::new(Utc::now(), readings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dormwatch_core::error::Error;
    use dormwatch_core::traits::Session;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted portal: per-room answers, each consumed in order.
    struct FakePortal {
        login: Mutex<Vec<Result<Session>>>,
        answers: Mutex<HashMap<String, Vec<Result<f64>>>>,
    }

    impl FakePortal {
        fn new(login: Vec<Result<Session>>, answers: Vec<(&str, Vec<Result<f64>>)>) -> Self {
            Self {
                login: Mutex::new(login),
                answers: Mutex::new(
                    answers
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v))
                        .collect(),
                ),
            }
        }

        fn ok_login() -> Vec<Result<Session>> {
            vec![Ok(Session { token: "t".into() })]
        }
    }

    #[async_trait]
    impl PowerSource for FakePortal {
        fn name(&self) -> &str {
            "fake"
        }

        async fn login(&self, _credential: &Credential) -> Result<Session> {
            self.login.lock().unwrap().remove(0)
        }

        async fn remaining_power(&self, _session: &Session, room: &Room) -> Result<f64> {
            let mut answers = self.answers.lock().unwrap();
            let queue = answers.get_mut(&room.room_id).expect("unscripted room");
            queue.remove(0)
        }
    }

    fn rooms() -> Vec<Room> {
        vec![Room::new("lt_room", "lt"), Room::new("ac_room", "ac")]
    }

    fn creds() -> Credential {
        Credential::new("user", "pw")
    }

    #[tokio::test]
    async fn test_fetch_classifies_in_order() {
        let portal = FakePortal::new(
            FakePortal::ok_login(),
            vec![("lt", vec![Ok(8.0)]), ("ac", vec![Ok(150.5)])],
        );
        let snap = fetch(&portal, &creds(), &rooms(), &Thresholds::default(), &RetryPolicy::none())
            .await
            .unwrap();

        assert_eq!(snap.readings.len(), 2);
        assert_eq!(snap.readings[0], RoomReading::known("lt_room", RoomStatus::Low, 8.0));
        assert_eq!(
            snap.readings[1],
            RoomReading::known("ac_room", RoomStatus::Sufficient, 150.5)
        );
    }

    #[tokio::test]
    async fn test_failed_room_becomes_unknown() {
        let portal = FakePortal::new(
            FakePortal::ok_login(),
            vec![
                ("lt", vec![Err(Error::transport("reset"))]),
                ("ac", vec![Ok(50.0)]),
            ],
        );
        let snap = fetch(&portal, &creds(), &rooms(), &Thresholds::default(), &RetryPolicy::none())
            .await
            .unwrap();

        assert_eq!(snap.readings[0], RoomReading::unknown("lt_room"));
        assert_eq!(snap.status_of("ac_room"), Some(RoomStatus::Adequate));
    }

    #[tokio::test]
    async fn test_transient_room_error_retried() {
        let portal = FakePortal::new(
            FakePortal::ok_login(),
            vec![
                ("lt", vec![Err(Error::transport("reset")), Ok(20.0)]),
                ("ac", vec![Ok(50.0)]),
            ],
        );
        let retry = RetryPolicy {
            max_retries: 1,
            ..RetryPolicy::none()
        };
        let snap = fetch(&portal, &creds(), &rooms(), &Thresholds::default(), &retry)
            .await
            .unwrap();
        assert_eq!(snap.get("lt_room").and_then(|r| r.balance), Some(20.0));
    }

    #[tokio::test]
    async fn test_rejected_credential_is_fatal() {
        let portal = FakePortal::new(vec![Err(Error::auth("wrong password"))], vec![]);
        let err = fetch(&portal, &creds(), &rooms(), &Thresholds::default(), &RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(err.is_auth());
    }
}
