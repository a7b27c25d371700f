use std::sync::Arc;

use tokio::time::Instant;

use crate::{
    config::{BenchConfig, Plan, redact_credentials},
    error::BenchError,
    executor::{Executor, PartitionedExecutor, deadline_after, remaining, run_batch},
    operation::{Operation, UnknownOperation},
    report::{Reporter, RunResult},
    store::{self, DocumentStore},
};

/// Drives a [`Plan`] against one store connection.
///
/// A run goes through three phases, each exactly once:
///
/// 1. **Setup**: when `plan.reset` is set, drop the dataset. A failed drop is
///    logged and ignored.
/// 2. **Execution**: run the selected operation, or insert, update and delete
///    in that order when `plan.run_all` is set. Each batch is independent.
/// 3. **Reporting**: hand each result to the reporter as soon as its batch
///    finishes, before the next batch starts.
///
/// The store handle is acquired by [`Benchmark::connect`] (or injected with
/// [`Benchmark::new`]) and released by [`Benchmark::close`].
pub struct Benchmark<E = PartitionedExecutor> {
    store: Arc<dyn DocumentStore>,
    plan: Plan,
    executor: E,
}

impl Benchmark {
    /// Connect to the store named by `config`. This is the only fallible step
    /// that stops a benchmark before it starts.
    pub async fn connect(config: &BenchConfig) -> Result<Self, BenchError> {
        let plan = config.plan()?;
        let target = redact_credentials(&config.uri);
        tracing::info!("Connecting to {target}...");
        let store = store::connect(
            &config.uri,
            &config.database,
            &config.collection,
            config.tls,
        )
        .await
        .map_err(|source| BenchError::Connect { target, source })?;
        Ok(Self::new(store, plan))
    }

    pub fn new(store: Arc<dyn DocumentStore>, plan: Plan) -> Self {
        Self {
            store,
            plan,
            executor: PartitionedExecutor,
        }
    }
}

impl<E: Executor> Benchmark<E> {
    pub fn with_executor<F: Executor>(self, executor: F) -> Benchmark<F> {
        Benchmark {
            store: self.store,
            plan: self.plan,
            executor,
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Run every phase and return the results in execution order.
    ///
    /// Only a worker panic aborts the run; store failures and unknown
    /// selectors never do.
    pub async fn run<R>(&self, reporter: &R) -> Result<Vec<RunResult>, BenchError>
    where
        R: Reporter + ?Sized,
    {
        let deadline = deadline_after(self.plan.deadline);
        tracing::debug!("Run deadline in {:?}", remaining(deadline));

        if self.plan.reset {
            self.reset(deadline).await;
        }

        let mut results = Vec::new();
        for selected in self.selected() {
            let result = match selected {
                Ok(operation) => {
                    tracing::info!("Running {operation} benchmark...");
                    let run = self.plan.run_config(operation);
                    run_batch(&self.executor, self.store.clone(), run, deadline).await?
                }
                Err(err) => {
                    tracing::warn!("{err}, nothing to run");
                    RunResult::unknown()
                }
            };

            if let Err(err) = reporter.report(&result).await {
                tracing::warn!("Failed to report {} result: {err}", result.operation);
            }
            results.push(result);
        }

        Ok(results)
    }

    /// Release the store connection.
    pub async fn close(self) -> Result<(), BenchError> {
        tracing::info!("Closing store connection...");
        self.store.close().await?;
        Ok(())
    }

    fn selected(&self) -> Vec<Result<Operation, UnknownOperation>> {
        if self.plan.run_all {
            Operation::ALL.into_iter().map(Ok).collect()
        } else {
            vec![self.plan.selector.parse()]
        }
    }

    async fn reset(&self, deadline: Instant) {
        tracing::info!("Attempting to drop dataset...");
        match tokio::time::timeout_at(deadline, self.store.drop_dataset()).await {
            Ok(Ok(())) => tracing::info!("Dataset dropped"),
            Ok(Err(err)) => {
                tracing::warn!("Failed to drop dataset: {err}. Continuing with benchmark...")
            }
            Err(_) => tracing::warn!(
                "Dropping dataset did not finish before the deadline. Continuing with benchmark..."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        num::NonZeroUsize,
        sync::{
            Mutex,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        config::OutputFormat,
        error::StoreError,
        record::{RecordId, SEED_VALUE, SyntheticRecord, UPDATED_VALUE},
        store::{Filter, MemoryStore, Update},
    };

    #[derive(Default)]
    struct CollectingReporter {
        results: Mutex<Vec<RunResult>>,
    }

    #[async_trait]
    impl Reporter for CollectingReporter {
        async fn report(&self, result: &RunResult) -> Result<(), BenchError> {
            self.results.lock().unwrap().push(result.clone());
            Ok(())
        }
    }

    struct BrokenReporter;

    #[async_trait]
    impl Reporter for BrokenReporter {
        async fn report(&self, _: &RunResult) -> Result<(), BenchError> {
            Err(BenchError::Report("closed pipe".into()))
        }
    }

    /// Memory store that counts every call and can be told to fail drops.
    #[derive(Default)]
    struct InstrumentedStore {
        inner: MemoryStore,
        calls: AtomicU64,
        fail_drop: bool,
    }

    impl InstrumentedStore {
        fn failing_drop() -> Self {
            Self {
                fail_drop: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::Relaxed)
        }

        fn touch(&self) {
            self.calls.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[async_trait]
    impl DocumentStore for InstrumentedStore {
        async fn insert_one(&self, record: SyntheticRecord) -> Result<RecordId, StoreError> {
            self.touch();
            self.inner.insert_one(record).await
        }
        async fn update_one(&self, filter: Filter, update: Update) -> Result<bool, StoreError> {
            self.touch();
            self.inner.update_one(filter, update).await
        }
        async fn delete_one(&self, filter: Filter) -> Result<bool, StoreError> {
            self.touch();
            self.inner.delete_one(filter).await
        }
        async fn drop_dataset(&self) -> Result<(), StoreError> {
            self.touch();
            if self.fail_drop {
                return Err(StoreError::Rejected("dataset locked".into()));
            }
            self.inner.drop_dataset().await
        }
        async fn count(&self, filter: Filter) -> Result<u64, StoreError> {
            self.touch();
            self.inner.count(filter).await
        }
    }

    fn plan(selector: &str) -> Plan {
        Plan::builder()
            .selector(selector)
            .workers(NonZeroUsize::new(10).unwrap())
            .operations(1000)
            .build()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_insert_run_fills_the_dataset() {
        let store = Arc::new(InstrumentedStore::default());
        let reporter = CollectingReporter::default();
        let bench = Benchmark::new(store.clone(), plan("insert"));

        let results = bench.run(&reporter).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].operation, "insert");
        assert_eq!(results[0].total_operations, 1000);
        assert_eq!(store.count(Filter::All).await.unwrap(), 1000);
        assert_eq!(*reporter.results.lock().unwrap(), results);
    }

    #[tokio::test]
    async fn unknown_selector_makes_no_store_calls() {
        let store = Arc::new(InstrumentedStore::default());
        let reporter = CollectingReporter::default();
        let bench = Benchmark::new(
            store.clone(),
            Plan::builder().selector("foo").reset(false).build(),
        );

        let results = bench.run(&reporter).await.unwrap();

        assert_eq!(results, vec![RunResult::unknown()]);
        assert_eq!(results[0].operation, "unknown");
        assert_eq!(results[0].elapsed, Duration::ZERO);
        assert_eq!(store.calls(), 0);
        assert_eq!(reporter.results.lock().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn run_all_goes_insert_update_delete() {
        let store = Arc::new(InstrumentedStore::default());
        let reporter = CollectingReporter::default();
        let bench = Benchmark::new(
            store.clone(),
            Plan::builder()
                .run_all(true)
                .selector("ignored")
                .workers(NonZeroUsize::new(4).unwrap())
                .operations(100)
                .build(),
        );

        let results = bench.run(&reporter).await.unwrap();

        let labels: Vec<_> = results.iter().map(|r| r.operation).collect();
        assert_eq!(labels, ["insert", "update", "delete"]);
        assert!(results.iter().all(|r| r.total_operations == 100));
        // every inserted record was moved off the seed value, so delete found nothing
        assert_eq!(store.count(Filter::ValueEq(UPDATED_VALUE)).await.unwrap(), 100);
        assert_eq!(store.count(Filter::All).await.unwrap(), 100);
        assert_eq!(reporter.results.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_reset_does_not_stop_the_run() {
        let store = Arc::new(InstrumentedStore::failing_drop());
        let reporter = CollectingReporter::default();
        let bench = Benchmark::new(
            store.clone(),
            Plan::builder()
                .run_all(true)
                .reset(true)
                .workers(NonZeroUsize::new(2).unwrap())
                .operations(20)
                .build(),
        );

        let results = bench.run(&reporter).await.unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| !r.is_unknown()));
        assert_eq!(reporter.results.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn reset_clears_records_from_earlier_runs() {
        let store = Arc::new(InstrumentedStore::default());
        for _ in 0..5 {
            store
                .insert_one(SyntheticRecord::generate(false))
                .await
                .unwrap();
        }
        let bench = Benchmark::new(
            store.clone(),
            Plan::builder()
                .selector("delete")
                .workers(NonZeroUsize::new(1).unwrap())
                .operations(3)
                .build(),
        );

        bench.run(&CollectingReporter::default()).await.unwrap();

        assert_eq!(store.count(Filter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn without_reset_repeated_deletes_see_a_shrinking_candidate_set() {
        let store = Arc::new(InstrumentedStore::default());
        for _ in 0..5 {
            store
                .insert_one(SyntheticRecord::generate(false))
                .await
                .unwrap();
        }
        let bench = Benchmark::new(
            store.clone(),
            Plan::builder()
                .selector("delete")
                .reset(false)
                .workers(NonZeroUsize::new(1).unwrap())
                .operations(3)
                .build(),
        );

        let reporter = CollectingReporter::default();
        bench.run(&reporter).await.unwrap();
        assert_eq!(store.count(Filter::ValueEq(SEED_VALUE)).await.unwrap(), 2);
        bench.run(&reporter).await.unwrap();
        assert_eq!(store.count(Filter::ValueEq(SEED_VALUE)).await.unwrap(), 0);

        // both runs still report the full partitioned total
        let results = reporter.results.lock().unwrap();
        assert!(results.iter().all(|r| r.total_operations == 3));
    }

    #[tokio::test]
    async fn huge_deadline_runs_instead_of_overflowing() {
        let store = Arc::new(MemoryStore::new());
        let bench = Benchmark::new(
            store.clone(),
            Plan::builder()
                .workers(NonZeroUsize::new(2).unwrap())
                .operations(10)
                .deadline(Duration::from_secs(u64::MAX))
                .build(),
        );

        let results = bench.run(&CollectingReporter::default()).await.unwrap();
        assert_eq!(results[0].total_operations, 10);
        assert_eq!(results[0].failed_operations, 0);
        assert_eq!(store.count(Filter::All).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn reporter_failure_is_not_fatal() {
        let store = Arc::new(MemoryStore::new());
        let bench = Benchmark::new(
            store,
            Plan::builder()
                .workers(NonZeroUsize::new(2).unwrap())
                .operations(4)
                .build(),
        );

        let results = bench.run(&BrokenReporter).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn connect_to_memory_target_and_close() {
        let config = BenchConfig {
            uri: "memory://localhost".into(),
            workers: NonZeroUsize::new(2).unwrap(),
            operations: 10,
            selector: "insert".into(),
            all: false,
            large: true,
            drop: true,
            tls: false,
            database: "benchmark".into(),
            collection: "testdata".into(),
            deadline_secs: 5,
            format: OutputFormat::Json,
        };

        let bench = Benchmark::connect(&config).await.unwrap();
        let results = bench.run(&CollectingReporter::default()).await.unwrap();
        assert_eq!(results[0].total_operations, 10);
        bench.close().await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_target_is_a_hard_error() {
        let config = BenchConfig {
            uri: "carrier-pigeon://user:pw@coop".into(),
            workers: NonZeroUsize::new(2).unwrap(),
            operations: 10,
            selector: "insert".into(),
            all: false,
            large: false,
            drop: true,
            tls: false,
            database: "benchmark".into(),
            collection: "testdata".into(),
            deadline_secs: 5,
            format: OutputFormat::Text,
        };

        match Benchmark::connect(&config).await {
            Err(BenchError::Connect { target, .. }) => {
                assert_eq!(target, "carrier-pigeon://***@coop")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("connected to an unsupported target"),
        }
    }
}
