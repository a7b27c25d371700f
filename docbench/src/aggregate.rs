use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::metric::{Metric, OpOutcome};

/// Worker-local accumulator of [`Metric`] samples.
///
/// Each worker owns one aggregate and folds its samples into it without any
/// synchronisation. After the join barrier the executor merges them in
/// arbitrary order, so `merge` must be associative and commutative.
///
/// Aggregates keep raw tallies only. Rates and averages are derived later,
/// from the merged aggregate and the batch timing, by
/// [`RunResult`](crate::report::RunResult).
pub trait Aggregate
where
    Self: Send + Sync + Debug + Clone + 'static,
{
    type Metric: Metric;

    fn new() -> Self;

    fn aggregate(&mut self, metrics: &[Self::Metric]) {
        metrics.iter().for_each(|m| self.consume(m));
    }

    fn consume(&mut self, metric: &Self::Metric);

    fn merge(&mut self, other: Self);
}

/// Attempt and failure counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAggregate {
    pub attempted: u64,
    pub failed: u64,
}

impl Aggregate for BatchAggregate {
    type Metric = OpOutcome;

    fn new() -> Self {
        BatchAggregate::default()
    }

    fn consume(&mut self, metric: &Self::Metric) {
        self.attempted += 1;
        if *metric == OpOutcome::Failed {
            self.failed += 1;
        }
    }

    fn merge(&mut self, other: Self) {
        self.attempted += other.attempted;
        self.failed += other.failed;
    }
}
