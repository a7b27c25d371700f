//! Executor: fan-out of one batch across concurrent workers
//!
//! An [`Executor`] takes a [`RunConfig`] and drives its operation against a
//! shared [`DocumentStore`] until every worker has finished its slice. The
//! built-in [`PartitionedExecutor`] is the only strategy; the trait is the seam
//! for others (paced, duration-bound, ...).
//!
//! # High-level flow
//! 1. Split the requested operation count with [`Partition`]: every worker gets
//!    `requested / workers` iterations and the remainder is dropped.
//! 2. Start the batch clock, then spawn one Tokio task per worker. Each worker
//!    repeats the operation its share of times and folds every outcome into a
//!    worker-local [`Aggregate`].
//! 3. Join all workers, stop the clock, and merge the aggregates.
//!
//! [`run_batch`] wraps this into a [`RunResult`].
//!
//! # Notes about correctness
//! - Workers share nothing but the store handle. Any interleaving of their
//!   calls is acceptable; the store is responsible for its own consistency.
//! - Failed storage calls are counted, never retried, and never shorten the
//!   batch: the reported total is always the partitioned total.
//! - The run deadline is checked before each call and bounds each call. Once it
//!   has passed, the remaining iterations fail without touching the store, so a
//!   late batch still terminates promptly. Its numbers are then meaningless.
//! - A panicking worker surfaces as [`BenchError::Worker`] after the join.
use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use tokio::time::Instant;

use crate::{
    aggregate::{Aggregate, BatchAggregate},
    config::RunConfig,
    error::BenchError,
    metric::OpOutcome,
    report::RunResult,
    stats::Timing,
    store::DocumentStore,
};

pub mod partitioned;
pub use partitioned::PartitionedExecutor;

/// Division of a requested operation count between workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub requested: u64,
    pub workers: NonZeroUsize,
    pub per_worker: u64,
}

impl Partition {
    pub fn new(requested: u64, workers: NonZeroUsize) -> Self {
        Self {
            requested,
            workers,
            per_worker: requested / workers.get() as u64,
        }
    }

    /// Operations that will actually run: `(requested / workers) * workers`.
    pub fn achieved(&self) -> u64 {
        self.per_worker * self.workers.get() as u64
    }

    /// Remainder that no worker runs.
    pub fn dropped(&self) -> u64 {
        self.requested - self.achieved()
    }
}

/// What an executor hands back once all workers have joined.
#[derive(Debug, Clone)]
pub struct Batch<A> {
    pub aggregate: A,
    pub timing: Timing,
}

/// Strategy for running one batch of a single operation type.
///
/// Implementations decide how the work is spread over workers; they must honor
/// the run deadline and fold every outcome into the aggregate they return.
pub trait Executor
where
    Self: Send + Sync,
{
    /// Run `run` to completion against `store` and return the merged aggregate.
    ///
    /// Must not return before every worker has finished.
    fn exec<A>(
        &self,
        store: Arc<dyn DocumentStore>,
        run: RunConfig,
        deadline: Instant,
    ) -> impl Future<Output = Result<Batch<A>, BenchError>> + Send
    where
        A: Aggregate<Metric = OpOutcome>;
}

/// Execute one batch and derive its [`RunResult`].
pub async fn run_batch<E: Executor>(
    executor: &E,
    store: Arc<dyn DocumentStore>,
    run: RunConfig,
    deadline: Instant,
) -> Result<RunResult, BenchError> {
    let partition = run.partition();
    if partition.dropped() > 0 {
        tracing::debug!(
            "{} of {} {} operations do not divide across {} workers and will not run",
            partition.dropped(),
            partition.requested,
            run.operation,
            partition.workers
        );
    }

    let batch: Batch<BatchAggregate> = executor.exec(store, run, deadline).await?;
    if batch.aggregate.failed > 0 {
        tracing::debug!(
            "{} of {} {} operations failed",
            batch.aggregate.failed,
            batch.aggregate.attempted,
            run.operation
        );
    }

    Ok(RunResult::from_batch(
        run.operation,
        partition.achieved(),
        batch.timing.elapsed(),
        batch.aggregate,
    ))
}

/// Longest run deadline handed out; larger requests are clamped to it.
pub const MAX_DEADLINE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Deadline `after` from now, clamped to [`MAX_DEADLINE`].
pub fn deadline_after(after: Duration) -> Instant {
    let now = Instant::now();
    let mut after = after.min(MAX_DEADLINE);
    loop {
        if let Some(deadline) = now.checked_add(after) {
            return deadline;
        }
        after /= 2;
    }
}

/// Time left until `deadline`, for log messages.
pub(crate) fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}
