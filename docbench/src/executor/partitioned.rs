use std::sync::Arc;

use futures::future::join_all;
use tokio::{task::JoinHandle, time::Instant};

use super::{Batch, Executor};
use crate::{
    aggregate::Aggregate,
    config::RunConfig,
    error::{BenchError, StoreError},
    metric::OpOutcome,
    stats::Timing,
    store::DocumentStore,
};

/// Executor that splits a fixed operation count evenly between workers and
/// runs every worker at full speed, with no pacing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionedExecutor;

impl Executor for PartitionedExecutor {
    async fn exec<A>(
        &self,
        store: Arc<dyn DocumentStore>,
        run: RunConfig,
        deadline: Instant,
    ) -> Result<Batch<A>, BenchError>
    where
        A: Aggregate<Metric = OpOutcome>,
    {
        let partition = run.partition();

        tracing::info!(
            "Spawning {} {} workers, {} operations each...",
            partition.workers,
            run.operation,
            partition.per_worker
        );
        let timing = Timing::start();
        let handles = spawn_workers::<A>(store, run, partition.per_worker, deadline);
        let results = join_all(handles).await;
        let timing = timing.stop();

        tracing::info!("Workers joined, merging results...");
        let mut aggregate = A::new();
        for result in results {
            aggregate.merge(result?);
        }

        Ok(Batch { aggregate, timing })
    }
}

/// Spawn one task per worker. Each runs `iterations` operations and returns
/// its local aggregate.
pub fn spawn_workers<A>(
    store: Arc<dyn DocumentStore>,
    run: RunConfig,
    iterations: u64,
    deadline: Instant,
) -> Vec<JoinHandle<A>>
where
    A: Aggregate<Metric = OpOutcome>,
{
    (0..run.workers.get())
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                let mut agg = A::new();
                for _ in 0..iterations {
                    let outcome = attempt(store.as_ref(), run, deadline).await;
                    agg.consume(&outcome);
                }
                agg
            })
        })
        .collect()
}

async fn attempt(store: &dyn DocumentStore, run: RunConfig, deadline: Instant) -> OpOutcome {
    if Instant::now() >= deadline {
        return OpOutcome::Failed;
    }
    let result = match tokio::time::timeout_at(
        deadline,
        run.operation.apply(store, run.large_payload),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(StoreError::DeadlineElapsed),
    };
    OpOutcome::from_result(&result)
}
