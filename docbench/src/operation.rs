use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{
    error::StoreError,
    record::{SEED_VALUE, SyntheticRecord, UPDATED_VALUE},
    store::{DocumentStore, Filter, Update},
};

/// Label used for results of unrecognised operation selectors.
pub const UNKNOWN_LABEL: &str = "unknown";

/// The CRUD operation a batch hammers the store with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// Order used when every operation type is run back to back.
    pub const ALL: [Operation; 3] = [Operation::Insert, Operation::Update, Operation::Delete];

    pub fn label(self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Perform one iteration of this operation against `store`.
    ///
    /// Update and delete match on [`SEED_VALUE`], so finding nothing to touch
    /// is still `Ok`.
    pub async fn apply(
        self,
        store: &dyn DocumentStore,
        large_payload: bool,
    ) -> Result<(), StoreError> {
        match self {
            Operation::Insert => {
                store
                    .insert_one(SyntheticRecord::generate(large_payload))
                    .await?;
            }
            Operation::Update => {
                store
                    .update_one(Filter::ValueEq(SEED_VALUE), Update::SetValue(UPDATED_VALUE))
                    .await?;
            }
            Operation::Delete => {
                store.delete_one(Filter::ValueEq(SEED_VALUE)).await?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperation(pub String);

impl fmt::Display for UnknownOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operation `{}`", self.0)
    }
}

impl std::error::Error for UnknownOperation {}

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Operation::Insert),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(UnknownOperation(other.to_owned())),
        }
    }
}
