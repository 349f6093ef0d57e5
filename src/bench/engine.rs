//! Warmup, calibration and measurement of a single benchmark.
//!
//! One run moves through these phases:
//!
//! 1. untimed warmup of `warmups / 5` calls, absorbing first-call costs;
//! 2. timed warmup of the remaining warmup calls;
//! 3. calibration, for target-time requests only: with `average` the timed
//!    warmup window divided by the full warmup count, the measured count
//!    becomes `round(target * 1.5e9 / average)`;
//! 4. measurement: all measured calls back-to-back inside one timing window.
//!
//! A failing call stops the run, is reported with its absolute index and
//! returned to the caller. No partial result is produced.

use std::hint::black_box;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::report::{Reporter, SharedReporter};
use crate::{SuiteError, SuiteResult};

use super::clock::{Clock, MonotonicClock, Stopwatch};
use super::request::{BenchmarkPlan, BenchmarkRequest, BenchmarkStart, MeasuredCount};

/// Calibration deliberately overshoots: warmup calls tend to be slower than
/// steady-state calls.
pub const CALIBRATION_BIAS: f64 = 1.5;

/// Outcome of a completed measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub warmups: u64,
    /// Measured (non-warmup) iterations.
    pub n: u64,
    pub total_nanos: u64,
    pub average_nanos: f64,
    pub ops_per_second: u64,
}

impl BenchmarkResult {
    pub fn new(label: Option<String>, warmups: u64, n: u64, total_nanos: u64) -> Self {
        let average_nanos = total_nanos as f64 / n as f64;
        // Saturates at u64::MAX when the clock saw no time pass.
        let ops_per_second = (1e9 / average_nanos).floor() as u64;
        BenchmarkResult {
            label,
            warmups,
            n,
            total_nanos,
            average_nanos,
            ops_per_second,
        }
    }
}

/// Measured iteration count for a target duration given the timed warmup.
///
/// The timed window is averaged over every warmup, untimed ones included,
/// which pushes `N` further past the target.
pub fn calibrate(target: Duration, warmup_nanos: u64, warmups: u64) -> u64 {
    let average = warmup_nanos.max(1) as f64 / warmups.max(1) as f64;
    let measured = (target.as_secs_f64() * CALIBRATION_BIAS * 1e9 / average).round();
    (measured as u64).max(1)
}

/// Runs benchmarks against a clock and fans events out to reporters.
pub struct BenchEngine {
    clock: Box<dyn Clock>,
    reporters: Vec<SharedReporter>,
}

impl Default for BenchEngine {
    fn default() -> Self {
        Self::new(MonotonicClock::new())
    }
}

impl BenchEngine {
    pub fn new(clock: impl Clock + 'static) -> Self {
        BenchEngine {
            clock: Box::new(clock),
            reporters: Vec::new(),
        }
    }

    pub fn with_reporters(mut self, reporters: Vec<SharedReporter>) -> Self {
        self.reporters = reporters;
        self
    }

    pub fn add_reporter(&mut self, reporter: SharedReporter) {
        self.reporters.push(reporter);
    }

    pub fn reporters(&self) -> &[SharedReporter] {
        &self.reporters
    }

    pub(crate) fn notify(&self, mut event: impl FnMut(&mut dyn Reporter)) {
        for reporter in &self.reporters {
            event(&mut *reporter.borrow_mut());
        }
    }

    /// Measure `request.routine` and report the result.
    pub fn measure<F, T>(&mut self, request: BenchmarkRequest<F>) -> SuiteResult<BenchmarkResult>
    where
        F: FnMut(u64) -> anyhow::Result<T>,
    {
        let BenchmarkRequest {
            label,
            iterations,
            mut routine,
        } = request;
        let plan = iterations.plan()?;

        let start = BenchmarkStart::new(label.clone(), &plan);
        info!(
            label = label.as_deref().unwrap_or_default(),
            warmups = plan.warmups,
            operations = ?start.operations,
            target_time = ?start.target_time,
            "benchmark started"
        );
        self.notify(|r| r.performance_test_started(&start));

        let mut index = 0;
        match self.run(&plan, &mut routine, &mut index) {
            Ok((n, total_nanos)) => {
                let result = BenchmarkResult::new(label, plan.warmups, n, total_nanos);
                info!(
                    label = result.label.as_deref().unwrap_or_default(),
                    n = result.n,
                    total_nanos = result.total_nanos,
                    average_nanos = result.average_nanos,
                    "benchmark completed"
                );
                self.notify(|r| r.performance_test_ended(&result));
                Ok(result)
            }
            Err(source) => {
                let during_warmup = index < plan.warmups;
                warn!(
                    label = label.as_deref().unwrap_or_default(),
                    iteration = index,
                    during_warmup,
                    error = %source,
                    "benchmark errored"
                );
                self.notify(|r| r.performance_test_errored(index, during_warmup));
                Err(SuiteError::BenchmarkFailed {
                    iteration: index,
                    during_warmup,
                    source,
                })
            }
        }
    }

    /// Returns `(measured iterations, measured nanoseconds)`. `index` is left
    /// at the failing iteration on error.
    fn run<F, T>(&self, plan: &BenchmarkPlan, routine: &mut F, index: &mut u64) -> anyhow::Result<(u64, u64)>
    where
        F: FnMut(u64) -> anyhow::Result<T>,
    {
        let clock = self.clock.as_ref();

        let untimed = plan.warmup_warmups();
        while *index < untimed {
            black_box(routine(*index)?);
            *index += 1;
        }

        let warmup = Stopwatch::start(clock);
        while *index < plan.warmups {
            black_box(routine(*index)?);
            *index += 1;
        }
        let warmup_nanos = warmup.stop();

        let n = match plan.measured {
            MeasuredCount::Fixed(n) => n,
            MeasuredCount::Calibrated { target } => {
                calibrate(target, warmup_nanos, plan.warmups)
            }
        };

        let end = plan.warmups.saturating_add(n);
        let measurement = Stopwatch::start(clock);
        while *index < end {
            black_box(routine(*index)?);
            *index += 1;
        }
        Ok((n, measurement.stop()))
    }
}
