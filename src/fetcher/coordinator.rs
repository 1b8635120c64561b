//! Bounded concurrent fetching under a global deadline.
//!
//! [`fetch_all`] dispatches one worker task per identifier, never more than
//! `max_concurrency` at a time, and stops waiting on anything that has not
//! finished when the deadline fires. Every identifier ends with exactly one
//! fate: a page in the [`FetchOutcome`] or a [`FetchFailure`] in the aggregate.

use super::{FetchOutcome, FetchRequest, ResourceFetcher};
use crate::error::{AggregatedError, FailureCause, FetchFailure};
use crate::utils::millis;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, instrument, warn};

/// Successes and failures recorded under one lock so an identifier can never
/// land in both.
#[derive(Default)]
struct Ledger {
    outcome: FetchOutcome,
    failures: AggregatedError<FetchFailure>,
}

impl Ledger {
    fn record(&mut self, id: String, result: Result<String, FailureCause>) {
        match result {
            Ok(page) => {
                debug!(%id, bytes = page.len(), "Fetched resource");
                self.outcome.insert(id, page);
            }
            Err(cause) => {
                warn!(%id, %cause, "Fetch failed");
                self.failures.push(FetchFailure { id, cause });
            }
        }
    }
}

/// Fetch every identifier in `request` concurrently.
///
/// At most `max_concurrency` fetches run at once (values below 1 are treated
/// as 1). The deadline clock starts when the call begins; identifiers not
/// dispatched or not completed by then are recorded as
/// [`FailureCause::DeadlineExceeded`] and their in-flight futures are dropped.
///
/// Always waits for every dispatched worker before returning. The aggregate is
/// `None` only when every identifier succeeded.
#[instrument(level = "info", skip_all, fields(count = request.len(), max_concurrency = max_concurrency, deadline_ms = millis(deadline)))]
pub async fn fetch_all<F>(
    request: FetchRequest,
    fetcher: Arc<F>,
    max_concurrency: usize,
    deadline: Duration,
) -> (FetchOutcome, Option<AggregatedError<FetchFailure>>)
where
    F: ResourceFetcher,
{
    let started = Instant::now();
    let deadline_at = deadline_instant(started, deadline);
    let total = request.len();

    if max_concurrency == 0 {
        warn!("max_concurrency of 0 requested; using 1");
    }
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let ledger = Arc::new(Mutex::new(Ledger::default()));
    let mut workers = JoinSet::new();

    for id in request {
        let permit = match timeout_at(deadline_at, Arc::clone(&semaphore).acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(closed)) => {
                ledger
                    .lock()
                    .await
                    .record(id, Err(FailureCause::Fetch(closed.to_string())));
                continue;
            }
            Err(_) => {
                ledger
                    .lock()
                    .await
                    .record(id, Err(FailureCause::DeadlineExceeded));
                continue;
            }
        };

        let fetcher = Arc::clone(&fetcher);
        let ledger = Arc::clone(&ledger);
        workers.spawn(async move {
            let _permit = permit;
            if Instant::now() >= deadline_at {
                ledger
                    .lock()
                    .await
                    .record(id, Err(FailureCause::DeadlineExceeded));
                return;
            }

            let attempt = AssertUnwindSafe(fetcher.fetch(&id)).catch_unwind();
            let result = match timeout_at(deadline_at, attempt).await {
                Ok(Ok(Ok(page))) => Ok(page),
                Ok(Ok(Err(e))) => Err(FailureCause::Fetch(e.to_string())),
                Ok(Err(panic)) => Err(FailureCause::Panicked(panic_message(panic.as_ref()))),
                Err(_) => Err(FailureCause::DeadlineExceeded),
            };
            ledger.lock().await.record(id, result);
        });
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Fetch worker did not complete");
        }
    }

    let mut ledger = ledger.lock().await;
    let outcome = std::mem::take(&mut ledger.outcome);
    let failures = std::mem::take(&mut ledger.failures);

    info!(
        total,
        succeeded = outcome.len(),
        failed = failures.len(),
        elapsed_ms = millis(started.elapsed()),
        "Finished fetching resources"
    );
    (outcome, failures.into_option())
}

/// Deadlines too large for the clock are clamped to roughly thirty years out.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_instant(started: Instant, deadline: Duration) -> Instant {
    started
        .checked_add(deadline)
        .or_else(|| started.checked_add(FAR_FUTURE))
        .unwrap_or(started)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
