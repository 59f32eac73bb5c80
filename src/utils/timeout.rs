//! Deadline helper for store and cache calls.

use serde_json::json;
use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Runs `fut` with a deadline of `limit`.
///
/// An elapsed deadline becomes [`AppError::Transient`] tagged with `operation`,
/// so callers treat a slow backend the same way as an unreachable one.
pub async fn with_timeout<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(AppError::transient(
                "Storage timed out",
                json!({ "operation": operation }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_deadline_is_transient() {
        let result: Result<(), AppError> = with_timeout(Duration::from_millis(50), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(result.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn test_passes_through_result() {
        let ok = with_timeout(Duration::from_secs(1), "fast", async { Ok(3) }).await;
        assert_eq!(ok.unwrap(), 3);

        let err: Result<(), AppError> = with_timeout(Duration::from_secs(1), "fast", async {
            Err(AppError::not_found("missing", json!({})))
        })
        .await;
        assert!(matches!(err, Err(AppError::NotFound { .. })));
    }
}
