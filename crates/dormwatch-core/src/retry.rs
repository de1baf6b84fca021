//! Bounded retry with a per-attempt timeout.
//!
//! Every external call goes through [`with_retry`]: each attempt is capped by
//! `policy.timeout`, and only transient errors are retried, at most
//! `policy.max_retries` times with a fixed pause in between.

use std::future::Future;

use crate::config::RetryPolicy;
use crate::error::{Error, Result};

/// Outcome of a retried operation together with the attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    pub attempts: u32,
}

pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let result = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "{what} gave no answer within {}s",
                policy.timeout.as_secs_f32()
            ))),
        };

        match result {
            Err(e) if e.is_transient() && attempts < max_attempts => {
                tracing::warn!(
                    "⚠️ {} failed (attempt {}/{}): {} — retrying",
                    what,
                    attempts,
                    max_attempts,
                    e
                );
                if !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            result => return Attempted { result, attempts },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: Duration::ZERO,
            timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let out = with_retry(&policy(1), "op", || async { Ok::<_, Error>(7) }).await;
        assert_eq!(out.result.unwrap(), 7);
        assert_eq!(out.attempts, 1);
    }

    #[tokio::test]
    async fn test_transient_error_retried_once() {
        let calls = AtomicU32::new(0);
        let out = with_retry(&policy(1), "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(Error::transport("connection reset"))
                } else {
                    Ok("second")
                }
            }
        })
        .await;
        assert_eq!(out.result.unwrap(), "second");
        assert_eq!(out.attempts, 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let calls = AtomicU32::new(0);
        let out = with_retry(&policy(1), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Error::transport("down")) }
        })
        .await;
        assert!(out.result.is_err());
        assert_eq!(out.attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let out = with_retry(&policy(3), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Error::auth("bad token")) }
        })
        .await;
        assert!(out.result.unwrap_err().is_auth());
        assert_eq!(out.attempts, 1);
    }

    #[tokio::test]
    async fn test_hung_call_times_out() {
        let out = with_retry(&policy(0), "slow op", || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, Error>(())
        })
        .await;
        assert!(matches!(out.result, Err(Error::Timeout(_))));
        assert_eq!(out.attempts, 1);
    }
}
