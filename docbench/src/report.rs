use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::{
    fmt,
    io::{self, Write},
    time::Duration,
};

use crate::{
    aggregate::BatchAggregate,
    error::BenchError,
    operation::{Operation, UNKNOWN_LABEL},
    stats,
};

/// Outcome of one completed batch.
///
/// `total_operations` is the partitioned total, not the requested one, and it
/// counts attempts: failed calls are included. `failed_operations` reports how
/// many of those attempts the store rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub operation: &'static str,
    pub total_operations: u64,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    pub ops_per_second: f64,
    #[serde(rename = "average_latency_us", serialize_with = "as_micros")]
    pub average_latency: Duration,
    pub failed_operations: u64,
}

impl RunResult {
    pub fn from_batch(
        operation: Operation,
        achieved: u64,
        elapsed: Duration,
        aggregate: BatchAggregate,
    ) -> Self {
        Self {
            operation: operation.label(),
            total_operations: achieved,
            elapsed,
            ops_per_second: stats::ops_per_second(achieved, elapsed),
            average_latency: stats::average_latency(elapsed, achieved),
            failed_operations: aggregate.failed,
        }
    }

    /// Placeholder result for a selector that names no known operation.
    pub fn unknown() -> Self {
        Self {
            operation: UNKNOWN_LABEL,
            total_operations: 0,
            elapsed: Duration::ZERO,
            ops_per_second: 0.0,
            average_latency: Duration::ZERO,
            failed_operations: 0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.operation == UNKNOWN_LABEL
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_nanos() as f64 / 1e6)
}

fn as_micros<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_nanos() as f64 / 1e3)
}

/// Round `d` to the nearest multiple of `unit`.
fn round(d: Duration, unit: Duration) -> Duration {
    let unit_nanos = unit.as_nanos();
    if unit_nanos == 0 {
        return d;
    }
    let rounded = (d.as_nanos() + unit_nanos / 2) / unit_nanos * unit_nanos;
    Duration::from_nanos(u64::try_from(rounded).unwrap_or(u64::MAX))
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Benchmark Results for {}:", self.operation)?;
        writeln!(f, "Total Operations: {}", self.total_operations)?;
        writeln!(
            f,
            "Total Time: {:?}",
            round(self.elapsed, Duration::from_millis(1))
        )?;
        writeln!(f, "Operations/sec: {:.2}", self.ops_per_second)?;
        writeln!(
            f,
            "Average Latency: {:?}",
            round(self.average_latency, Duration::from_micros(1))
        )?;
        write!(f, "Failed Operations: {}", self.failed_operations)
    }
}

/// Sink for [`RunResult`]s. Called once per batch, in execution order.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, result: &RunResult) -> Result<(), BenchError>;
}

/// Prints the human-readable block for each result.
pub struct StdoutReporter;

#[async_trait]
impl Reporter for StdoutReporter {
    async fn report(&self, result: &RunResult) -> Result<(), BenchError> {
        writeln!(io::stdout(), "\n{result}")?;
        Ok(())
    }
}

/// Prints each result as a single JSON line.
pub struct JsonReporter;

#[async_trait]
impl Reporter for JsonReporter {
    async fn report(&self, result: &RunResult) -> Result<(), BenchError> {
        let line = serde_json::to_string(result)?;
        writeln!(io::stdout(), "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RunResult {
        RunResult::from_batch(
            Operation::Insert,
            1000,
            Duration::from_millis(2500),
            BatchAggregate {
                attempted: 1000,
                failed: 3,
            },
        )
    }

    #[test]
    fn derives_statistics_from_achieved_total() {
        let result = sample();
        assert_eq!(result.operation, "insert");
        assert_eq!(result.total_operations, 1000);
        assert_eq!(result.ops_per_second, 400.0);
        assert_eq!(result.average_latency, Duration::from_micros(2500));
        assert_eq!(result.failed_operations, 3);
    }

    #[test]
    fn unknown_result_is_zero_valued() {
        let result = RunResult::unknown();
        assert!(result.is_unknown());
        assert_eq!(result.operation, "unknown");
        assert_eq!(result.elapsed, Duration::ZERO);
        assert_eq!(result.total_operations, 0);
        assert_eq!(result.average_latency, Duration::ZERO);
    }

    #[test]
    fn text_block_rounds_durations() {
        let result = RunResult {
            elapsed: Duration::from_micros(1_234_567),
            average_latency: Duration::from_nanos(1_234_567),
            ..sample()
        };
        let text = result.to_string();
        assert!(text.starts_with("Benchmark Results for insert:\n"));
        assert!(text.contains("Total Operations: 1000\n"));
        assert!(text.contains("Total Time: 1.235s\n"));
        assert!(text.contains("Operations/sec: 400.00\n"));
        assert!(text.contains("Average Latency: 1.235ms\n"));
        assert!(text.ends_with("Failed Operations: 3"));
    }

    #[test]
    fn json_uses_flat_units() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["operation"], "insert");
        assert_eq!(value["total_operations"], 1000);
        assert_eq!(value["elapsed_ms"], 2500.0);
        assert_eq!(value["average_latency_us"], 2500.0);
        assert_eq!(value["failed_operations"], 3);
    }

    #[test]
    fn rounding_goes_to_nearest_unit() {
        let ms = Duration::from_millis(1);
        assert_eq!(round(Duration::from_micros(1499), ms), ms);
        assert_eq!(round(Duration::from_micros(1500), ms), Duration::from_millis(2));
        assert_eq!(round(Duration::ZERO, ms), Duration::ZERO);
    }
}
