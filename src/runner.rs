//! Runs selected tests of a set of suites and reports outcomes.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, debug_span, info, instrument, warn};

use crate::bench::{BenchEngine, Clock};
use crate::core::EnvironmentInfo;
use crate::report::{Reporter, SharedReporter};
use crate::suite::{SuiteContext, TestFn, TestSuite};
use crate::{SuiteError, SuiteResult};

/// Handed to reporters when a run starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInfo {
    pub name: String,
    pub filters: Vec<String>,
    pub environment: Option<EnvironmentInfo>,
}

impl RunInfo {
    pub fn new(name: impl Into<String>) -> Self {
        RunInfo {
            name: name.into(),
            ..RunInfo::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub suite: String,
    pub test: String,
    pub status: TestStatus,
    pub elapsed: Duration,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteSummary {
    pub name: String,
    pub outcomes: Vec<TestOutcome>,
    pub elapsed: Duration,
    /// Error from releasing the suite's resources after its last test.
    pub teardown_error: Option<String>,
}

impl SuiteSummary {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    /// Every test passed and teardown succeeded.
    pub fn success(&self) -> bool {
        self.failed() == 0 && self.teardown_error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub name: String,
    pub suites: Vec<SuiteSummary>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.suites.iter().map(|s| s.outcomes.len()).sum()
    }

    pub fn passed(&self) -> usize {
        self.suites.iter().map(SuiteSummary::passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn success(&self) -> bool {
        self.suites.iter().all(SuiteSummary::success)
    }

    /// Suites whose resources could not all be released.
    pub fn teardown_failures(&self) -> impl Iterator<Item = &SuiteSummary> {
        self.suites.iter().filter(|s| s.teardown_error.is_some())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestOutcome> {
        self.suites
            .iter()
            .flat_map(|s| &s.outcomes)
            .filter(|o| !o.passed())
    }
}

type EngineFactory = Box<dyn Fn() -> BenchEngine>;

/// Drives suites in order, one `SuiteContext` per suite.
pub struct Runner {
    name: String,
    reporters: Vec<SharedReporter>,
    filters: Vec<Regex>,
    environment: Option<EnvironmentInfo>,
    engine: EngineFactory,
}

impl Runner {
    pub fn new(name: impl Into<String>) -> Self {
        Runner {
            name: name.into(),
            reporters: Vec::new(),
            filters: Vec::new(),
            environment: None,
            engine: Box::new(BenchEngine::default),
        }
    }

    pub fn with_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn add_reporter(&mut self, reporter: SharedReporter) {
        self.reporters.push(reporter);
    }

    /// Select tests whose `Suite.test` name matches any of `patterns`.
    pub fn with_filters<I, S>(mut self, patterns: I) -> SuiteResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let regex = Regex::new(pattern).map_err(|e| SuiteError::InvalidFilter {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            self.filters.push(regex);
        }
        Ok(self)
    }

    pub fn with_environment(mut self, environment: EnvironmentInfo) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Every suite measures against a clone of `clock`.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + Clone + 'static,
    {
        self.engine = Box::new(move || BenchEngine::new(clock.clone()));
        self
    }

    pub fn is_selected(&self, suite: &str, test: &str) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        let full = format!("{suite}.{test}");
        self.filters.iter().any(|f| f.is_match(&full))
    }

    /// `Suite.test` names that a run would execute, in run order.
    pub fn selected(&self, suites: &[TestSuite]) -> Vec<String> {
        suites
            .iter()
            .flat_map(|suite| {
                suite
                    .test_names()
                    .filter(|test| self.is_selected(suite.name(), test))
                    .map(|test| format!("{}.{test}", suite.name()))
            })
            .collect()
    }

    fn notify(&self, mut event: impl FnMut(&mut dyn Reporter)) {
        for reporter in &self.reporters {
            event(&mut *reporter.borrow_mut());
        }
    }

    pub fn run(&self, suites: &mut [TestSuite]) -> RunSummary {
        let started = Instant::now();
        let info = RunInfo {
            name: self.name.clone(),
            filters: self.filters.iter().map(|f| f.as_str().to_string()).collect(),
            environment: self.environment.clone(),
        };
        info!(run = %self.name, suites = suites.len(), "run started");
        self.notify(|r| r.run_started(&info));

        let mut summary = RunSummary {
            name: self.name.clone(),
            ..RunSummary::default()
        };
        for suite in suites.iter_mut() {
            if let Some(suite_summary) = self.run_suite(suite) {
                summary.suites.push(suite_summary);
            }
        }
        summary.elapsed = started.elapsed();

        info!(
            run = %self.name,
            passed = summary.passed(),
            failed = summary.failed(),
            "run completed"
        );
        self.notify(|r| r.run_completed(&summary));
        summary
    }

    #[instrument(skip_all, fields(suite = %suite.name()))]
    fn run_suite(&self, suite: &mut TestSuite) -> Option<SuiteSummary> {
        let name = suite.name().to_string();
        let selected: Vec<usize> = suite
            .tests
            .iter()
            .enumerate()
            .filter(|(_, (test, _))| self.is_selected(&name, test))
            .map(|(i, _)| i)
            .collect();
        if selected.is_empty() {
            debug!(suite = %name, "no selected tests, skipping");
            return None;
        }

        let started = Instant::now();
        info!(suite = %name, tests = selected.len(), "suite started");
        self.notify(|r| r.suite_started(&name, selected.len()));

        let engine = (self.engine)().with_reporters(self.reporters.clone());
        let mut ctx = SuiteContext::new(name.clone(), engine);
        let setup_error = suite
            .setup
            .as_mut()
            .and_then(|setup| guarded(setup, &mut ctx).err())
            .map(|message| format!("suite setup failed: {message}"));

        let mut outcomes = Vec::with_capacity(selected.len());
        for index in selected {
            let (test_name, body) = &mut suite.tests[index];
            let test_name = test_name.clone();
            let _span = debug_span!("test", test = %test_name).entered();
            self.notify(|r| r.test_started(&name, &test_name));
            let test_started = Instant::now();

            let result = match &setup_error {
                Some(message) => Err(message.clone()),
                None => run_test(&mut suite.before_each, body, &mut suite.after_each, &mut ctx),
            };
            let status = match result {
                Ok(()) => TestStatus::Passed,
                Err(message) => TestStatus::Failed { message },
            };
            let outcome = TestOutcome {
                suite: name.clone(),
                test: test_name,
                status,
                elapsed: test_started.elapsed(),
            };
            debug!(suite = %name, test = %outcome.test, passed = outcome.passed(), "test finished");
            self.notify(|r| r.test_finished(&outcome));
            outcomes.push(outcome);
        }

        let teardown_error = match ctx.delete_all() {
            Ok(()) => None,
            Err(err) => {
                warn!(suite = %name, error = %err, "suite teardown failed");
                Some(format!("{err:#}"))
            }
        };

        let summary = SuiteSummary {
            name,
            outcomes,
            elapsed: started.elapsed(),
            teardown_error,
        };
        info!(
            suite = %summary.name,
            passed = summary.passed(),
            failed = summary.failed(),
            "suite completed"
        );
        self.notify(|r| r.suite_completed(&summary));
        Some(summary)
    }
}

/// `before_each`, body, `after_each`. The first failure wins, but
/// `after_each` runs whenever `before_each` succeeded.
fn run_test(
    before_each: &mut Option<TestFn>,
    body: &mut TestFn,
    after_each: &mut Option<TestFn>,
    ctx: &mut SuiteContext,
) -> Result<(), String> {
    if let Some(hook) = before_each.as_mut() {
        guarded(hook, ctx).map_err(|message| format!("before_each failed: {message}"))?;
    }
    let outcome = guarded(body, ctx);
    let teardown = match after_each.as_mut() {
        Some(hook) => guarded(hook, ctx).map_err(|message| format!("after_each failed: {message}")),
        None => Ok(()),
    };
    outcome.and(teardown)
}

/// Call `f`, turning both errors and panics into a message.
fn guarded(f: &mut TestFn, ctx: &mut SuiteContext) -> Result<(), String> {
    match catch_unwind(AssertUnwindSafe(|| f(&mut *ctx))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
