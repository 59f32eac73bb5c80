//! Background worker applying visit events to the link store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use crate::domain::repositories::LinkStore;
use crate::domain::visit_event::VisitEvent;
use crate::error::AppError;
use crate::utils::timeout::with_timeout;

/// Retries after the first attempt for a transient store failure.
const MAX_RETRIES: usize = 3;

/// Drains the visit queue until every sender is dropped.
///
/// Up to `concurrency` events are applied at once. Each store call is bounded
/// by `store_timeout`. Transient failures, timeouts included, are retried with
/// jittered exponential backoff; anything else is logged and the visit is lost.
///
/// Returns once the channel is closed and all in-flight writes finished, so the
/// composition root can await it during shutdown.
pub async fn run_visit_worker<S>(
    mut rx: mpsc::Receiver<VisitEvent>,
    store: Arc<S>,
    concurrency: usize,
    store_timeout: Duration,
) where
    S: LinkStore + ?Sized + 'static,
{
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    while let Some(event) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let store = store.clone();

        tasks.spawn(async move {
            let _permit = permit;
            apply_visit(store.as_ref(), event, store_timeout).await;
        });

        while tasks.try_join_next().is_some() {}
    }

    while tasks.join_next().await.is_some() {}
    info!("Visit worker stopped");
}

async fn apply_visit<S>(store: &S, event: VisitEvent, store_timeout: Duration)
where
    S: LinkStore + ?Sized,
{
    let strategy = ExponentialBackoff::from_millis(10)
        .map(jitter)
        .take(MAX_RETRIES);

    let result = RetryIf::spawn(
        strategy,
        || {
            with_timeout(
                store_timeout,
                "link_store.record_visit",
                store.record_visit(event.link_id),
            )
        },
        AppError::is_transient,
    )
    .await;

    match result {
        Ok(()) => debug!(link_id = event.link_id, "Visit recorded"),
        Err(e) => {
            metrics::counter!("tinylink_visits_dropped_total").increment(1);
            warn!(link_id = event.link_id, error = %e, "Failed to record visit");
        }
    }
}
