//! One fan-out implementation for both failure-tolerance shapes.
//!
//! Every batch in the executor runs through [`FanOut::run`]; the policy
//! decides whether the first failure aborts the siblings or is logged
//! and kept as a per-task error. Results come back in input order, so
//! callers can zip them against their task list.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, warn};

use crate::errors::ExecutorError;

pub type TaskFuture<T> = Pin<Box<dyn Future<Output = Result<T, ExecutorError>> + Send>>;

/// How a batch reacts to a failing task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// First failure aborts the remaining siblings and fails the batch;
    /// no partial successes are surfaced. For sub-queries whose outputs
    /// are only useful together.
    AbortOnFirstError,
    /// Every task runs to completion; failures are logged and returned
    /// in the task's slot, the batch itself never fails. For
    /// structurally independent dimensions.
    BestEffort,
}

#[derive(Clone, Debug)]
pub struct FanOut {
    policy: FailurePolicy,
    max_concurrency: Option<usize>,
}

impl FanOut {
    pub fn new(policy: FailurePolicy, max_concurrency: Option<usize>) -> Self {
        Self { policy, max_concurrency }
    }

    /// Runs `tasks` concurrently and returns their results in input
    /// order. Under `AbortOnFirstError` the outer `Result` carries the
    /// first failure; under `BestEffort` it is always `Ok` and failures
    /// sit in their task's slot.
    pub async fn run<T>(
        &self,
        tasks: Vec<TaskFuture<T>>,
    ) -> Result<Vec<Result<T, ExecutorError>>, ExecutorError>
    where
        T: Send + 'static,
    {
        let task_count = tasks.len();
        let semaphore = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let mut set: JoinSet<(usize, Result<T, ExecutorError>)> = JoinSet::new();

        for (index, task) in tasks.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            set.spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                (index, task.await)
            });
        }

        let mut slots: Vec<Option<Result<T, ExecutorError>>> =
            (0..task_count).map(|_| None).collect();

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Ok(value))) => slots[index] = Some(Ok(value)),
                Ok((index, Err(err))) => match self.policy {
                    FailurePolicy::AbortOnFirstError => {
                        set.abort_all();
                        return Err(err);
                    }
                    FailurePolicy::BestEffort => {
                        if err.is_permission_denied() {
                            warn!(error = %err, "query skipped: permission denied");
                        } else {
                            error!(error = %err, "query failed");
                        }
                        slots[index] = Some(Err(err));
                    }
                },
                Err(join_err) if join_err.is_cancelled() => {}
                Err(join_err) => {
                    let err = ExecutorError::Join(join_err.to_string());
                    match self.policy {
                        FailurePolicy::AbortOnFirstError => {
                            set.abort_all();
                            return Err(err);
                        }
                        FailurePolicy::BestEffort => error!(error = %err, "query task panicked"),
                    }
                }
            }
        }

        Ok(slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(ExecutorError::Join("task vanished".into()))))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanlens_core::{QueryName, TimeRange};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::client::WarehouseError;

    fn fail(query: QueryName) -> ExecutorError {
        ExecutorError::Warehouse {
            query,
            time_range: TimeRange::Day,
            source: WarehouseError::Execution("boom".into()),
        }
    }

    fn ready(value: u32) -> TaskFuture<u32> {
        Box::pin(async move { Ok(value) })
    }

    #[tokio::test]
    async fn best_effort_keeps_results_in_input_order() {
        let tasks: Vec<TaskFuture<u32>> = vec![
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(1)
            }),
            ready(2),
            Box::pin(async { Err(fail(QueryName::Dataset)) }),
            ready(4),
        ];

        let results = FanOut::new(FailurePolicy::BestEffort, None).run(tasks).await.unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0], Ok(1));
        assert_eq!(results[1], Ok(2));
        assert!(results[2].is_err());
        assert_eq!(results[3], Ok(4));
    }

    #[tokio::test]
    async fn abort_on_first_error_discards_partial_successes() {
        let tasks: Vec<TaskFuture<u32>> = vec![
            ready(1),
            Box::pin(async { Err(fail(QueryName::BillingProjectSlots)) }),
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(3)
            }),
        ];

        let err = FanOut::new(FailurePolicy::AbortOnFirstError, None)
            .run(tasks)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExecutorError::Warehouse { query: QueryName::BillingProjectSlots, .. }
        ));
    }

    #[tokio::test]
    async fn concurrency_bound_is_respected() {
        static RUNNING: AtomicUsize = AtomicUsize::new(0);
        static PEAK: AtomicUsize = AtomicUsize::new(0);

        let tasks: Vec<TaskFuture<u32>> = (0..8)
            .map(|i| {
                let task: TaskFuture<u32> = Box::pin(async move {
                    let now = RUNNING.fetch_add(1, Ordering::SeqCst) + 1;
                    PEAK.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    RUNNING.fetch_sub(1, Ordering::SeqCst);
                    Ok(i)
                });
                task
            })
            .collect();

        let results = FanOut::new(FailurePolicy::BestEffort, Some(2)).run(tasks).await.unwrap();

        assert_eq!(results.len(), 8);
        assert!(PEAK.load(Ordering::SeqCst) <= 2);
    }
}
