use std::{num::NonZeroUsize, time::Duration};

use clap::{ArgAction, Parser, ValueEnum};
use serde::{Serialize, Serializer};
use typed_builder::TypedBuilder;

use crate::{error::BenchError, executor::Partition, operation::Operation};

pub const DEFAULT_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_WORKERS: NonZeroUsize = NonZeroUsize::new(10).unwrap();
pub const DEFAULT_OPERATIONS: u64 = 1000;
pub const DEFAULT_SELECTOR: &str = "insert";
pub const DEFAULT_DATABASE: &str = "benchmark";
pub const DEFAULT_COLLECTION: &str = "testdata";
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable result blocks
    Text,
    /// One JSON object per result
    Json,
}

/// Command-line surface of the `docbench` binary.
#[derive(Debug, Clone, Parser, Serialize)]
#[command(name = "docbench", version, about = "CRUD throughput benchmark for document databases")]
pub struct BenchConfig {
    /// Connection target. `memory://` runs against an in-process store
    #[arg(long, env = "DOCBENCH_URI", default_value = DEFAULT_URI)]
    #[serde(serialize_with = "serialize_redacted")]
    pub uri: String,

    /// Number of concurrent workers
    #[arg(long, visible_alias = "threads", default_value_t = DEFAULT_WORKERS)]
    pub workers: NonZeroUsize,

    /// Total operations per batch, split evenly across workers
    #[arg(long, default_value_t = DEFAULT_OPERATIONS)]
    pub operations: u64,

    /// Operation to benchmark: insert, update or delete
    #[arg(long = "test", default_value = DEFAULT_SELECTOR)]
    pub selector: String,

    /// Run insert, update and delete in sequence, ignoring --test
    #[arg(long)]
    pub all: bool,

    /// Insert records with a 1KiB payload
    #[arg(long)]
    pub large: bool,

    /// Drop the database before running
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub drop: bool,

    /// Use TLS for network targets
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub tls: bool,

    #[arg(long, default_value = DEFAULT_DATABASE)]
    pub database: String,

    #[arg(long, default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Overall deadline for the whole run, in seconds
    #[arg(long, default_value_t = DEFAULT_DEADLINE.as_secs())]
    pub deadline_secs: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl BenchConfig {
    pub fn plan(&self) -> Result<Plan, BenchError> {
        if self.deadline_secs == 0 {
            return Err(BenchError::Config("deadline must be at least one second".into()));
        }

        Ok(Plan::builder()
            .selector(self.selector.clone())
            .run_all(self.all)
            .workers(self.workers)
            .operations(self.operations)
            .large_payload(self.large)
            .reset(self.drop)
            .deadline(Duration::from_secs(self.deadline_secs))
            .build())
    }
}

/// What a [`Benchmark`](crate::Benchmark) runs once connected.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Plan {
    /// Operation selector used when `run_all` is off. Unknown selectors
    /// yield an "unknown" result instead of an error.
    #[builder(default = DEFAULT_SELECTOR.to_owned(), setter(into))]
    pub selector: String,
    #[builder(default)]
    pub run_all: bool,
    #[builder(default = DEFAULT_WORKERS)]
    pub workers: NonZeroUsize,
    #[builder(default = DEFAULT_OPERATIONS)]
    pub operations: u64,
    #[builder(default)]
    pub large_payload: bool,
    /// Drop the dataset before the first batch
    #[builder(default = true)]
    pub reset: bool,
    #[builder(default = DEFAULT_DEADLINE)]
    pub deadline: Duration,
}

impl Plan {
    pub fn run_config(&self, operation: Operation) -> RunConfig {
        RunConfig::builder()
            .operation(operation)
            .workers(self.workers)
            .operations(self.operations)
            .large_payload(self.large_payload)
            .build()
    }
}

/// Parameters of a single batch, fixed for its whole duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct RunConfig {
    pub operation: Operation,
    pub workers: NonZeroUsize,
    /// Requested total; see [`Partition`] for what actually runs
    pub operations: u64,
    #[builder(default)]
    pub large_payload: bool,
}

impl RunConfig {
    pub fn partition(&self) -> Partition {
        Partition::new(self.operations, self.workers)
    }
}

fn serialize_redacted<S: Serializer>(uri: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&redact_credentials(uri))
}

/// Replace the userinfo part of a connection URI so it can be logged.
pub fn redact_credentials(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_owned();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{scheme}://***@{}", &rest[at + 1..]),
        None => uri.to_owned(),
    }
}
