use thiserror::Error;

/// Errors raised by a [`DocumentStore`](crate::store::DocumentStore).
///
/// The benchmark never inspects these beyond "did the call fail"; the variants
/// exist for logs and for the connection path, where the cause is surfaced.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unsupported connection target `{0}`")]
    UnsupportedTarget(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("operation rejected: {0}")]
    Rejected(String),
    #[error("run deadline elapsed")]
    DeadlineElapsed,
    #[cfg(feature = "mongodb")]
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("failed to connect to `{target}`: {source}")]
    Connect {
        target: String,
        #[source]
        source: StoreError,
    },
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error("failed to report result: {0}")]
    Report(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::Report(err.to_string())
    }
}

impl From<std::io::Error> for BenchError {
    fn from(err: std::io::Error) -> Self {
        BenchError::Report(err.to_string())
    }
}
