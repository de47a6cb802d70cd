//! Thread pool collaborator for independent jobs.
//!
//! Optimizers hand a batch of independent jobs (one per solve attempt) to a
//! [`WorkExecutor`], which runs them on a rayon pool sized to the request and
//! reports how the batch went.

use crate::error::{OptimizationError, Result};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::debug;

/// Outcome of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// Every job returned `Ok`.
    Completed,
    /// At least one job returned an error.
    Failed { failures: usize },
}

/// Bookkeeping for one batch of jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadedWorkSummary {
    pub status: WorkStatus,
    pub jobs: usize,
    pub threads_used: usize,
    pub elapsed: Duration,
}

/// Per-job results, in submission order, and the batch summary.
#[derive(Debug)]
pub struct WorkOutcome<R> {
    pub results: Vec<Result<R>>,
    pub summary: ThreadedWorkSummary,
}

impl<R> WorkOutcome<R> {
    /// All results, or the first error in submission order.
    pub fn into_results(self) -> Result<Vec<R>> {
        self.results.into_iter().collect()
    }
}

/// Runs batches of independent jobs on a bounded number of threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkExecutor;

impl WorkExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Threads a batch of `jobs` would use for `requested_threads`
    /// (`0` = all available).
    pub fn threads_for(requested_threads: usize, jobs: usize) -> usize {
        let available = if requested_threads == 0 {
            rayon::current_num_threads()
        } else {
            requested_threads
        };
        available.min(jobs).max(1)
    }

    /// Runs `job` on every item and collects the results in item order.
    ///
    /// A single-thread batch runs on the calling thread.
    pub fn execute<I, R, F>(&self, requested_threads: usize, items: Vec<I>, job: F) -> Result<WorkOutcome<R>>
    where
        I: Send,
        R: Send,
        F: Fn(I) -> Result<R> + Send + Sync,
    {
        let jobs = items.len();
        let threads_used = Self::threads_for(requested_threads, jobs);
        let start = Instant::now();

        let results: Vec<Result<R>> = if threads_used == 1 {
            items.into_iter().map(&job).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads_used)
                .build()
                .map_err(|e| OptimizationError::InvalidInput {
                    class: "WorkExecutor",
                    operation: "execute",
                    message: format!("unable to build a pool of {threads_used} threads: {e}"),
                })?;
            pool.install(|| items.into_par_iter().map(&job).collect())
        };

        let failures = results.iter().filter(|r| r.is_err()).count();
        let summary = ThreadedWorkSummary {
            status: if failures == 0 {
                WorkStatus::Completed
            } else {
                WorkStatus::Failed { failures }
            },
            jobs,
            threads_used,
            elapsed: start.elapsed(),
        };
        debug!(
            event = "work_batch_finished",
            jobs,
            threads_used,
            failures,
            elapsed_ms = summary.elapsed.as_millis() as u64
        );
        Ok(WorkOutcome { results, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_keep_item_order() {
        let outcome = WorkExecutor::new()
            .execute(4, (0..50).collect(), |i: usize| Ok(i * i))
            .unwrap();
        assert_eq!(outcome.summary.status, WorkStatus::Completed);
        assert_eq!(outcome.summary.jobs, 50);
        assert_eq!(outcome.summary.threads_used, 4);
        let values = outcome.into_results().unwrap();
        assert_eq!(values, (0..50).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn test_failures_are_counted() {
        let outcome = WorkExecutor::new()
            .execute(2, vec![1, 2, 3, 4], |i: i32| {
                if i % 2 == 0 {
                    Err(OptimizationError::InvalidConfig(format!("job {i}")))
                } else {
                    Ok(i)
                }
            })
            .unwrap();
        assert_eq!(outcome.summary.status, WorkStatus::Failed { failures: 2 });
        assert_eq!(
            outcome.into_results().unwrap_err(),
            OptimizationError::InvalidConfig("job 2".into())
        );
    }

    #[test]
    fn test_thread_count() {
        assert_eq!(WorkExecutor::threads_for(8, 3), 3);
        assert_eq!(WorkExecutor::threads_for(2, 10), 2);
        assert_eq!(WorkExecutor::threads_for(4, 0), 1);
        assert!(WorkExecutor::threads_for(0, 1000) >= 1);
    }

    #[test]
    fn test_empty_batch() {
        let outcome = WorkExecutor::new()
            .execute(0, Vec::<u8>::new(), |x| Ok(x))
            .unwrap();
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.summary.threads_used, 1);
    }
}
