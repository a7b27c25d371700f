use serde::{Deserialize, Serialize};
use std::{fmt, time::SystemTime};

/// Name stamped on every generated record.
pub const RECORD_NAME: &str = "test-document";
/// Value every generated record starts with. Update and delete batches match on it.
pub const SEED_VALUE: i64 = 1000;
/// Value an update batch writes over [`SEED_VALUE`].
pub const UPDATED_VALUE: i64 = 2000;
/// Size in bytes of the payload carried by large records.
pub const LARGE_PAYLOAD_LEN: usize = 1024;
const PAYLOAD_FILLER: char = 'x';

/// Backend-assigned identifier of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A synthetic document written by insert batches.
///
/// Records are never mutated by the harness after generation; the backend owns
/// them once `insert_one` accepts them. Update and delete batches find records
/// by `value`, not by `id`, so repeated runs without a reset act on whatever
/// seed-valued records are left over from earlier runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub name: String,
    pub value: i64,
    pub payload: String,
    pub timestamp: SystemTime,
}

impl SyntheticRecord {
    /// Generate a fresh record, with a 1KiB payload when `large` is set.
    pub fn generate(large: bool) -> Self {
        let payload = if large {
            std::iter::repeat_n(PAYLOAD_FILLER, LARGE_PAYLOAD_LEN).collect()
        } else {
            String::new()
        };

        Self {
            id: None,
            name: RECORD_NAME.to_owned(),
            value: SEED_VALUE,
            payload,
            timestamp: SystemTime::now(),
        }
    }
}
