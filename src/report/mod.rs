//! Reporter sinks.
//!
//! A [`Reporter`] observes the run (suites and tests) and every benchmark.
//! Sinks are attached as an explicit list of [`SharedReporter`]s; each one is
//! notified of every event.

pub mod console;
pub mod csv;
pub mod format;
pub mod jsonl;
pub mod memory;

use std::cell::RefCell;
use std::rc::Rc;

use crate::bench::{BenchmarkResult, BenchmarkStart};
use crate::runner::{RunInfo, RunSummary, SuiteSummary, TestOutcome};

pub use console::ConsoleReporter;
pub use csv::{CSV_HEADERS, CsvReporter};
pub use jsonl::JsonlReporter;
pub use memory::MemoryReporter;

/// Observer of run and benchmark events. Every method defaults to a no-op.
pub trait Reporter {
    fn run_started(&mut self, _info: &RunInfo) {}

    fn suite_started(&mut self, _suite: &str, _tests: usize) {}

    fn test_started(&mut self, _suite: &str, _test: &str) {}

    fn test_finished(&mut self, _outcome: &TestOutcome) {}

    fn suite_completed(&mut self, _summary: &SuiteSummary) {}

    fn run_completed(&mut self, _summary: &RunSummary) {}

    fn performance_test_started(&mut self, _start: &BenchmarkStart) {}

    /// `iteration` is the absolute index of the failing call.
    fn performance_test_errored(&mut self, _iteration: u64, _during_warmup: bool) {}

    fn performance_test_ended(&mut self, _result: &BenchmarkResult) {}
}

pub type SharedReporter = Rc<RefCell<dyn Reporter>>;

/// Wrap a reporter so it can be attached to a runner while the caller keeps
/// a typed handle to it.
pub fn shared<R: Reporter + 'static>(reporter: R) -> Rc<RefCell<R>> {
    Rc::new(RefCell::new(reporter))
}
