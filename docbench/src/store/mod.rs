//! Storage backends the benchmark drives.
//!
//! [`DocumentStore`] is the only surface the executor talks to. Every call is
//! treated as an opaque remote operation: the executor looks at whether it
//! failed, never at why. Implementations must be safe to call from many worker
//! tasks at once, since the harness adds no locking of its own.
//!
//! [`connect`] picks a backend from the scheme of the connection target:
//!
//! - `memory://...` opens a fresh [`MemoryStore`].
//! - `mongodb://...` and `mongodb+srv://...` open a [`MongoStore`] (requires
//!   the `mongodb` feature).
use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::StoreError,
    record::{RecordId, SyntheticRecord},
};

pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;

pub use memory::MemoryStore;
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;

/// Selects which records an update or delete applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    All,
    ValueEq(i64),
}

impl Filter {
    pub fn matches(&self, record: &SyntheticRecord) -> bool {
        match self {
            Filter::All => true,
            Filter::ValueEq(value) => record.value == *value,
        }
    }
}

/// Modification applied by `update_one`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    SetValue(i64),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new record and return the identifier the backend assigned.
    async fn insert_one(&self, record: SyntheticRecord) -> Result<RecordId, StoreError>;

    /// Apply `update` to one record matching `filter`.
    ///
    /// Returns `false` when nothing matched; that is not an error.
    async fn update_one(&self, filter: Filter, update: Update) -> Result<bool, StoreError>;

    /// Remove one record matching `filter`, returning whether one was found.
    async fn delete_one(&self, filter: Filter) -> Result<bool, StoreError>;

    /// Drop the whole dataset. Dropping an already empty dataset succeeds.
    async fn drop_dataset(&self) -> Result<(), StoreError>;

    async fn count(&self, filter: Filter) -> Result<u64, StoreError>;

    /// Release the connection. The store must not be used afterwards.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Open the backend named by `target`'s scheme. `tls` only applies to network
/// backends.
#[cfg_attr(not(feature = "mongodb"), allow(unused_variables))]
pub async fn connect(
    target: &str,
    database: &str,
    collection: &str,
    tls: bool,
) -> Result<Arc<dyn DocumentStore>, StoreError> {
    let scheme = target
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .ok_or_else(|| StoreError::UnsupportedTarget(target.to_owned()))?;

    match scheme {
        "memory" => {
            tracing::info!("Using in-memory store for {database}.{collection}");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "mongodb")]
        "mongodb" | "mongodb+srv" => {
            let store = MongoStore::connect(target, database, collection, tls).await?;
            Ok(Arc::new(store))
        }
        _ => Err(StoreError::UnsupportedTarget(target.to_owned())),
    }
}
