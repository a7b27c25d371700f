use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// A single sample produced by one worker iteration.
pub trait Metric
where
    Self: Send + Sync + Debug + Clone,
{
}

/// Outcome of one storage call. The cause of a failure is deliberately not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpOutcome {
    Ok,
    Failed,
}

impl OpOutcome {
    pub fn from_result<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            OpOutcome::Ok
        } else {
            OpOutcome::Failed
        }
    }
}

impl Metric for OpOutcome {}
