//! In-memory reporter for tests.

use crate::bench::{BenchmarkResult, BenchmarkStart};
use crate::runner::{RunInfo, RunSummary, SuiteSummary, TestOutcome};

use super::Reporter;

/// One observed event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    RunStarted(String),
    SuiteStarted { suite: String, tests: usize },
    TestStarted { suite: String, test: String },
    TestFinished { suite: String, test: String, passed: bool },
    SuiteCompleted(String),
    RunCompleted { passed: usize, failed: usize },
    BenchmarkStarted(BenchmarkStart),
    BenchmarkErrored { iteration: u64, during_warmup: bool },
    BenchmarkEnded(BenchmarkResult),
}

/// Records every event in arrival order.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Vec<Event>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Completed benchmark results in order.
    pub fn results(&self) -> Vec<&BenchmarkResult> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::BenchmarkEnded(result) => Some(result),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Reporter for MemoryReporter {
    fn run_started(&mut self, info: &RunInfo) {
        self.events.push(Event::RunStarted(info.name.clone()));
    }

    fn suite_started(&mut self, suite: &str, tests: usize) {
        self.events.push(Event::SuiteStarted {
            suite: suite.to_string(),
            tests,
        });
    }

    fn test_started(&mut self, suite: &str, test: &str) {
        self.events.push(Event::TestStarted {
            suite: suite.to_string(),
            test: test.to_string(),
        });
    }

    fn test_finished(&mut self, outcome: &TestOutcome) {
        self.events.push(Event::TestFinished {
            suite: outcome.suite.clone(),
            test: outcome.test.clone(),
            passed: outcome.passed(),
        });
    }

    fn suite_completed(&mut self, summary: &SuiteSummary) {
        self.events.push(Event::SuiteCompleted(summary.name.clone()));
    }

    fn run_completed(&mut self, summary: &RunSummary) {
        self.events.push(Event::RunCompleted {
            passed: summary.passed(),
            failed: summary.failed(),
        });
    }

    fn performance_test_started(&mut self, start: &BenchmarkStart) {
        self.events.push(Event::BenchmarkStarted(start.clone()));
    }

    fn performance_test_errored(&mut self, iteration: u64, during_warmup: bool) {
        self.events.push(Event::BenchmarkErrored {
            iteration,
            during_warmup,
        });
    }

    fn performance_test_ended(&mut self, result: &BenchmarkResult) {
        self.events.push(Event::BenchmarkEnded(result.clone()));
    }
}
