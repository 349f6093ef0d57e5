//! Throughput measurement with warmup and optional calibration.

pub mod clock;
pub mod engine;
pub mod request;
pub mod sweep;

pub use clock::{Clock, ManualClock, MonotonicClock, Stopwatch};
pub use engine::{BenchEngine, BenchmarkResult, CALIBRATION_BIAS, calibrate};
pub use request::{
    BenchmarkPlan, BenchmarkRequest, BenchmarkStart, DEFAULT_WARMUP_DIVISOR, Iterations,
    MeasuredCount,
};
pub use sweep::{ParameterSweep, SweepResults};
