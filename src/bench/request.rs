//! Benchmark requests and their validation.

use std::time::Duration;

use serde::Serialize;

use crate::{SuiteError, SuiteResult};

/// Divisor used to derive warmups from the operation count when none are given.
pub const DEFAULT_WARMUP_DIVISOR: u64 = 100;

/// How many iterations a benchmark runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iterations {
    /// Exactly `operations` calls in total, warmups included.
    Fixed { operations: u64, warmups: Option<u64> },
    /// Derive the measured count from the warmup cost so the measurement
    /// takes roughly `target`.
    TargetTime { target: Duration, warmups: u64 },
}

impl Iterations {
    pub fn fixed(operations: u64) -> Self {
        Iterations::Fixed {
            operations,
            warmups: None,
        }
    }

    pub fn target_time(target: Duration, warmups: u64) -> Self {
        Iterations::TargetTime { target, warmups }
    }

    /// Replace the warmup count.
    pub fn with_warmups(self, warmups: u64) -> Self {
        match self {
            Iterations::Fixed { operations, .. } => Iterations::Fixed {
                operations,
                warmups: Some(warmups),
            },
            Iterations::TargetTime { target, .. } => Iterations::TargetTime { target, warmups },
        }
    }

    /// Validate and resolve warmups and, for fixed requests, the measured count.
    pub fn plan(&self) -> SuiteResult<BenchmarkPlan> {
        match *self {
            Iterations::Fixed {
                operations,
                warmups,
            } => {
                if operations == 0 {
                    return Err(invalid("operations must be greater than zero"));
                }
                let warmups = warmups.unwrap_or(operations / DEFAULT_WARMUP_DIVISOR);
                if warmups >= operations {
                    return Err(invalid(format!(
                        "warmups ({warmups}) must be less than operations ({operations})"
                    )));
                }
                Ok(BenchmarkPlan {
                    warmups,
                    measured: MeasuredCount::Fixed(operations - warmups),
                })
            }
            Iterations::TargetTime { target, warmups } => {
                if target.is_zero() {
                    return Err(invalid("target time must be greater than zero"));
                }
                if warmups == 0 {
                    return Err(invalid("a target time request needs at least one warmup"));
                }
                Ok(BenchmarkPlan {
                    warmups,
                    measured: MeasuredCount::Calibrated { target },
                })
            }
        }
    }
}

fn invalid(message: impl Into<String>) -> SuiteError {
    SuiteError::InvalidBenchmarkRequest(message.into())
}

/// Number of timed iterations, known up front or derived after warmup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasuredCount {
    Fixed(u64),
    Calibrated { target: Duration },
}

/// Validated iteration counts for one benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkPlan {
    pub warmups: u64,
    pub measured: MeasuredCount,
}

impl BenchmarkPlan {
    /// Untimed prefix of the warmup.
    pub fn warmup_warmups(&self) -> u64 {
        self.warmups / 5
    }
}

/// A function to measure plus how to run it.
///
/// The routine receives the absolute iteration index, counted from the very
/// first warmup call.
pub struct BenchmarkRequest<F> {
    pub label: Option<String>,
    pub iterations: Iterations,
    pub routine: F,
}

impl<F> BenchmarkRequest<F> {
    pub fn new<T>(iterations: Iterations, routine: F) -> Self
    where
        F: FnMut(u64) -> anyhow::Result<T>,
    {
        BenchmarkRequest {
            label: None,
            iterations,
            routine,
        }
    }

    pub fn fixed<T>(operations: u64, routine: F) -> Self
    where
        F: FnMut(u64) -> anyhow::Result<T>,
    {
        Self::new(Iterations::fixed(operations), routine)
    }

    pub fn target_time<T>(target: Duration, warmups: u64, routine: F) -> Self
    where
        F: FnMut(u64) -> anyhow::Result<T>,
    {
        Self::new(Iterations::target_time(target, warmups), routine)
    }

    pub fn with_warmups(mut self, warmups: u64) -> Self {
        self.iterations = self.iterations.with_warmups(warmups);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// What reporters learn when a benchmark starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkStart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub warmups: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_time: Option<Duration>,
}

impl BenchmarkStart {
    pub(crate) fn new(label: Option<String>, plan: &BenchmarkPlan) -> Self {
        let (operations, target_time) = match plan.measured {
            MeasuredCount::Fixed(measured) => (Some(plan.warmups + measured), None),
            MeasuredCount::Calibrated { target } => (None, Some(target)),
        };
        BenchmarkStart {
            label,
            warmups: plan.warmups,
            operations,
            target_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(iterations: Iterations) {
        assert!(
            matches!(iterations.plan(), Err(SuiteError::InvalidBenchmarkRequest(_))),
            "{iterations:?} should be rejected"
        );
    }

    #[test]
    fn test_default_warmups_are_one_percent() {
        let plan = Iterations::fixed(1000).plan().unwrap();
        assert_eq!(plan.warmups, 10);
        assert_eq!(plan.measured, MeasuredCount::Fixed(990));
        assert_eq!(plan.warmup_warmups(), 2);
    }

    #[test]
    fn test_explicit_warmups() {
        let plan = Iterations::fixed(1000).with_warmups(100).plan().unwrap();
        assert_eq!(plan.warmups, 100);
        assert_eq!(plan.measured, MeasuredCount::Fixed(900));
    }

    #[test]
    fn test_single_operation_without_warmup() {
        let plan = Iterations::fixed(1).with_warmups(0).plan().unwrap();
        assert_eq!(plan.warmups, 0);
        assert_eq!(plan.measured, MeasuredCount::Fixed(1));
    }

    #[test]
    fn test_small_operation_counts_default_to_zero_warmups() {
        let plan = Iterations::fixed(99).plan().unwrap();
        assert_eq!(plan.warmups, 0);
        assert_eq!(plan.measured, MeasuredCount::Fixed(99));
    }

    #[test]
    fn test_invalid_requests() {
        assert_invalid(Iterations::fixed(10).with_warmups(100));
        assert_invalid(Iterations::fixed(100).with_warmups(100));
        assert_invalid(Iterations::fixed(0));
        assert_invalid(Iterations::target_time(Duration::ZERO, 10));
        assert_invalid(Iterations::target_time(Duration::from_secs(1), 0));
    }

    #[test]
    fn test_target_time_plan_is_uncalibrated() {
        let plan = Iterations::target_time(Duration::from_secs(1), 100_000)
            .plan()
            .unwrap();
        assert_eq!(plan.warmups, 100_000);
        assert_eq!(
            plan.measured,
            MeasuredCount::Calibrated {
                target: Duration::from_secs(1)
            }
        );
        assert_eq!(plan.warmup_warmups(), 20_000);
    }
}
