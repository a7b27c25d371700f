//! docbench, a concurrent CRUD load generator for document databases.
//!
//! docbench hammers a document store with one operation type at a time
//! (insert, update or delete) from a fixed number of concurrent workers, and
//! reports throughput and average latency for each batch.
//!
//! # Architecture
//!
//! - [`DocumentStore`]: the backend under test. Shared by every worker through
//!   one `Arc` handle; it owns its own concurrency safety.
//! - [`Executor`]: runs one batch. The built-in [`PartitionedExecutor`] splits
//!   the requested operation count evenly between workers, spawns them, and
//!   joins them behind a single timing barrier.
//! - [`Aggregate`]: worker-local tally of [`OpOutcome`]s, merged after the join.
//! - [`RunResult`]: the derived statistics of one batch.
//! - [`Reporter`]: where results go (stdout text, JSON lines, or your own).
//! - [`Benchmark`]: the orchestrator tying a store, a [`Plan`] and a reporter
//!   together.
//!
//! # Example
//!
//! ```rust
//! use std::{num::NonZeroUsize, sync::Arc};
//!
//! use docbench::{Benchmark, Plan, StdoutReporter, store::MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let plan = Plan::builder()
//!         .run_all(true)
//!         .workers(NonZeroUsize::new(4).unwrap())
//!         .operations(400)
//!         .build();
//!
//!     let bench = Benchmark::new(Arc::new(MemoryStore::new()), plan);
//!     let results = bench.run(&StdoutReporter).await.unwrap();
//!     assert_eq!(results.len(), 3);
//!     bench.close().await.unwrap();
//! }
//! ```
//!
//! # Caveats
//!
//! - Failed operations are counted but still included in the reported total,
//!   so throughput is an attempted rate. See [`RunResult::failed_operations`].
//! - Update and delete batches match records by a fixed value
//!   ([`record::SEED_VALUE`]) rather than by id. Without a reset between runs
//!   they act on whatever seed-valued records earlier runs left behind.
//!
//! # Feature flags
//!
//! - `mongodb`: enables [`store::MongoStore`] for `mongodb://` targets.
//!   (Enabled by default)

/// Worker-local tallies
pub mod aggregate;
/// Orchestration of a whole benchmark run
pub mod benchmark;
/// CLI and run configuration
pub mod config;
/// Store and run errors
pub mod error;
/// Batch execution across concurrent workers
pub mod executor;
/// Per-operation samples
pub mod metric;
/// The benchmarked operation types
pub mod operation;
/// Synthetic records
pub mod record;
/// Results and reporters
pub mod report;
/// Batch timing and derived statistics
pub mod stats;
/// Storage backends
pub mod store;

pub use aggregate::{Aggregate, BatchAggregate};
pub use benchmark::Benchmark;
pub use config::{BenchConfig, OutputFormat, Plan, RunConfig};
pub use error::{BenchError, StoreError};
pub use executor::{Executor, PartitionedExecutor};
pub use metric::{Metric, OpOutcome};
pub use operation::Operation;
pub use record::SyntheticRecord;
pub use report::{JsonReporter, Reporter, RunResult, StdoutReporter};
pub use store::DocumentStore;
