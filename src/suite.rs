//! Test suites and the per-suite runtime handed to test bodies.

use std::fmt::{self, Display};

use crate::bench::{BenchEngine, BenchmarkRequest, BenchmarkResult, ParameterSweep, SweepResults};
use crate::report::SharedReporter;
use crate::resource::{ResourceKey, ResourceManager, ResourceSpec};
use crate::{SuiteError, SuiteResult};

/// Test bodies and hooks.
pub type TestFn = Box<dyn FnMut(&mut SuiteContext) -> anyhow::Result<()>>;

/// A named, ordered set of tests plus optional hooks.
///
/// `setup` runs once before the first selected test and usually registers
/// resources. `before_each` and `after_each` wrap every test; `after_each`
/// also runs when the body failed.
pub struct TestSuite {
    name: String,
    pub(crate) setup: Option<TestFn>,
    pub(crate) before_each: Option<TestFn>,
    pub(crate) after_each: Option<TestFn>,
    pub(crate) tests: Vec<(String, TestFn)>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        TestSuite {
            name: name.into(),
            setup: None,
            before_each: None,
            after_each: None,
            tests: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: FnMut(&mut SuiteContext) -> anyhow::Result<()> + 'static,
    {
        self.setup = Some(Box::new(setup));
        self
    }

    pub fn with_before_each<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut SuiteContext) -> anyhow::Result<()> + 'static,
    {
        self.before_each = Some(Box::new(hook));
        self
    }

    pub fn with_after_each<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut SuiteContext) -> anyhow::Result<()> + 'static,
    {
        self.after_each = Some(Box::new(hook));
        self
    }

    /// Append a test. Names are unique within a suite.
    pub fn add_test<F>(&mut self, name: impl Into<String>, body: F) -> SuiteResult<&mut Self>
    where
        F: FnMut(&mut SuiteContext) -> anyhow::Result<()> + 'static,
    {
        let name = name.into();
        if self.tests.iter().any(|(existing, _)| *existing == name) {
            return Err(SuiteError::DuplicateTest(format!("{}.{name}", self.name)));
        }
        self.tests.push((name, Box::new(body)));
        Ok(self)
    }

    /// Builder form of [`TestSuite::add_test`].
    pub fn with_test<F>(mut self, name: impl Into<String>, body: F) -> SuiteResult<Self>
    where
        F: FnMut(&mut SuiteContext) -> anyhow::Result<()> + 'static,
    {
        self.add_test(name, body)?;
        Ok(self)
    }

    pub fn test_names(&self) -> impl Iterator<Item = &str> {
        self.tests.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

impl fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSuite")
            .field("name", &self.name)
            .field("tests", &self.test_names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// What a test body works with: the suite's resources and its benchmark engine.
///
/// Resources outlive individual tests and are torn down when the suite ends.
pub struct SuiteContext {
    suite: String,
    resources: ResourceManager,
    bench: BenchEngine,
}

impl SuiteContext {
    pub fn new(suite: impl Into<String>, bench: BenchEngine) -> Self {
        SuiteContext {
            suite: suite.into(),
            resources: ResourceManager::new(),
            bench,
        }
    }

    /// A context with the monotonic clock and the given sinks.
    pub fn with_reporters(suite: impl Into<String>, reporters: Vec<SharedReporter>) -> Self {
        Self::new(suite, BenchEngine::default().with_reporters(reporters))
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceManager {
        &mut self.resources
    }

    pub fn bench(&self) -> &BenchEngine {
        &self.bench
    }

    pub fn bench_mut(&mut self) -> &mut BenchEngine {
        &mut self.bench
    }

    /// Both halves at once, so a routine can read resources while measuring.
    pub fn split(&mut self) -> (&mut ResourceManager, &mut BenchEngine) {
        (&mut self.resources, &mut self.bench)
    }

    pub fn register<T: 'static>(&mut self, spec: ResourceSpec<T>) -> SuiteResult<ResourceKey<T>> {
        self.resources.register(spec)
    }

    pub fn remove<T: 'static>(&mut self, key: &ResourceKey<T>) -> SuiteResult<ResourceSpec<T>> {
        self.resources.remove(key)
    }

    pub fn create(&mut self, name: impl AsRef<str>) -> SuiteResult<()> {
        self.resources.create(name.as_ref(), true)
    }

    pub fn create_many<S: AsRef<str>>(&mut self, names: &[S]) -> SuiteResult<()> {
        self.resources.create_many(names, true)
    }

    pub fn delete(&mut self, name: impl AsRef<str>) -> SuiteResult<()> {
        self.resources.delete(name.as_ref())
    }

    pub fn delete_all(&mut self) -> SuiteResult<()> {
        self.resources.delete_all()
    }

    pub fn get<T: 'static>(&self, key: &ResourceKey<T>) -> SuiteResult<&T> {
        self.resources.get(key)
    }

    pub fn measure<F, T>(&mut self, request: BenchmarkRequest<F>) -> SuiteResult<BenchmarkResult>
    where
        F: FnMut(u64) -> anyhow::Result<T>,
    {
        self.bench.measure(request)
    }

    pub fn measure_sweep<P, F, T>(&mut self, sweep: ParameterSweep<'_, P, F>) -> SuiteResult<SweepResults>
    where
        P: Display,
        F: FnMut(&P, u64) -> anyhow::Result<T>,
    {
        self.bench.measure_sweep(sweep)
    }
}
