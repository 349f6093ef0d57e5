//! One benchmark per parameter, keyed by the parameter's display form.

use std::fmt::Display;

use indexmap::IndexMap;

use crate::{SuiteError, SuiteResult};

use super::engine::{BenchEngine, BenchmarkResult};
use super::request::{BenchmarkRequest, Iterations};

/// Results in parameter order, keyed by `param.to_string()`.
pub type SweepResults = IndexMap<String, BenchmarkResult>;

type ParamHook<'a, P> = Box<dyn FnMut(&P, usize) -> anyhow::Result<()> + 'a>;
type Hook<'a> = Box<dyn FnMut() -> anyhow::Result<()> + 'a>;

/// The same routine measured once per parameter.
///
/// Hooks run as `before_all`, then per parameter `before`, the measurement
/// and `after`, then `after_all`. Keys must be unique; a repeated display
/// form is rejected before anything runs.
pub struct ParameterSweep<'a, P, F> {
    label: Option<String>,
    iterations: Iterations,
    parameters: Vec<P>,
    routine: F,
    before: Option<ParamHook<'a, P>>,
    after: Option<ParamHook<'a, P>>,
    before_all: Option<Hook<'a>>,
    after_all: Option<Hook<'a>>,
}

impl<'a, P, F> ParameterSweep<'a, P, F> {
    pub fn new<T>(iterations: Iterations, parameters: impl IntoIterator<Item = P>, routine: F) -> Self
    where
        F: FnMut(&P, u64) -> anyhow::Result<T>,
    {
        ParameterSweep {
            label: None,
            iterations,
            parameters: parameters.into_iter().collect(),
            routine,
            before: None,
            after: None,
            before_all: None,
            after_all: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_warmups(mut self, warmups: u64) -> Self {
        self.iterations = self.iterations.with_warmups(warmups);
        self
    }

    pub fn before(mut self, hook: impl FnMut(&P, usize) -> anyhow::Result<()> + 'a) -> Self {
        self.before = Some(Box::new(hook));
        self
    }

    pub fn after(mut self, hook: impl FnMut(&P, usize) -> anyhow::Result<()> + 'a) -> Self {
        self.after = Some(Box::new(hook));
        self
    }

    pub fn before_all(mut self, hook: impl FnMut() -> anyhow::Result<()> + 'a) -> Self {
        self.before_all = Some(Box::new(hook));
        self
    }

    pub fn after_all(mut self, hook: impl FnMut() -> anyhow::Result<()> + 'a) -> Self {
        self.after_all = Some(Box::new(hook));
        self
    }
}

fn sweep_label(base: Option<&str>, key: &str) -> Option<String> {
    let parts: Vec<&str> = [base.unwrap_or_default(), key]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

impl BenchEngine {
    /// Measure `sweep.routine` once per parameter.
    ///
    /// Stops at the first failing hook or benchmark; `after_all` does not run
    /// in that case.
    pub fn measure_sweep<P, F, T>(&mut self, sweep: ParameterSweep<'_, P, F>) -> SuiteResult<SweepResults>
    where
        P: Display,
        F: FnMut(&P, u64) -> anyhow::Result<T>,
    {
        let ParameterSweep {
            label,
            iterations,
            parameters,
            mut routine,
            mut before,
            mut after,
            mut before_all,
            mut after_all,
        } = sweep;

        iterations.plan()?;
        let mut keys = Vec::with_capacity(parameters.len());
        for param in &parameters {
            let key = param.to_string();
            if keys.contains(&key) {
                return Err(SuiteError::DuplicateParameter(key));
            }
            keys.push(key);
        }

        if let Some(hook) = before_all.as_mut() {
            hook()?;
        }

        let mut results = SweepResults::with_capacity(parameters.len());
        for (index, (param, key)) in parameters.iter().zip(keys).enumerate() {
            if let Some(hook) = before.as_mut() {
                hook(param, index)?;
            }
            let mut request = BenchmarkRequest::new(iterations, |i| routine(param, i));
            request.label = sweep_label(label.as_deref(), &key);
            let result = self.measure(request)?;
            if let Some(hook) = after.as_mut() {
                hook(param, index)?;
            }
            results.insert(key, result);
        }

        if let Some(hook) = after_all.as_mut() {
            hook()?;
        }
        Ok(results)
    }
}
