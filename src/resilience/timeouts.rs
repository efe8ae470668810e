//! Timeout enforcement for collaborator calls.
//!
//! Every probe, adapter and notifier call goes through here. An elapsed
//! deadline is reported as its own error so callers can tell it apart from
//! a refused connection.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// The operation did not finish before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} elapsed")]
pub struct Elapsed(pub Duration);

/// Run `fut` with a deadline.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| Elapsed(deadline))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let result = with_deadline(Duration::from_millis(200), async { 7 }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_slow_future_elapses() {
        let result = with_deadline(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
        })
        .await;
        assert_eq!(result, Err(Elapsed(Duration::from_millis(20))));
    }

    #[test]
    fn test_elapsed_message_names_deadline() {
        let err = Elapsed(Duration::from_millis(250));
        assert_eq!(err.to_string(), "deadline of 250ms elapsed");
    }
}
