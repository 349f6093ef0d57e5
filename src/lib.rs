//! Test-suite runtime: dependency-ordered fixtures ("resources") and
//! calibrated throughput measurement ("benchmarks").
//!
//! A [`suite::SuiteContext`] owns one [`resource::ResourceManager`] and one
//! [`bench::BenchEngine`]; test bodies registered on a [`suite::TestSuite`]
//! receive the context and drive both. Events are delivered to zero or more
//! [`report::Reporter`] sinks.

pub mod bench;
pub mod cli;
pub mod config;
pub mod core;
pub mod report;
pub mod resource;
pub mod runner;
pub mod selftest;
pub mod suite;

use thiserror::Error;

pub use bench::{BenchEngine, BenchmarkRequest, BenchmarkResult, Iterations, ParameterSweep};
pub use report::{Reporter, SharedReporter};
pub use resource::{ResourceKey, ResourceManager, ResourceSpec};
pub use runner::{RunSummary, Runner};
pub use suite::{SuiteContext, TestSuite};

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("can not register resource '{0}': duplicate name")]
    DuplicateResource(String),
    #[error("invalid resource '{0}': not registered")]
    UnknownResource(String),
    #[error("resources [{}] currently created", names.join(", "))]
    ResourceInUse { names: Vec<String> },
    #[error("can not use resource '{0}': not created and no default value")]
    ResourceNotCreated(String),
    #[error("resource '{0}' is created but holds no value")]
    NoValue(String),
    #[error("can not create resource '{0}': already created")]
    AlreadyCreated(String),
    #[error("dependency cycle through resource '{0}'")]
    DependencyCycle(String),
    #[error("resource '{name}' does not hold a value of type {expected}")]
    ResourceTypeMismatch { name: String, expected: &'static str },
    #[error("invalid benchmark request: {0}")]
    InvalidBenchmarkRequest(String),
    #[error("benchmark failed on operation {iteration} ({}): {source:#}", if *during_warmup { "warmup" } else { "measurement" })]
    BenchmarkFailed {
        iteration: u64,
        during_warmup: bool,
        #[source]
        source: anyhow::Error,
    },
    #[error("duplicate parameter key '{0}'")]
    DuplicateParameter(String),
    #[error("duplicate test '{0}'")]
    DuplicateTest(String),
    #[error("invalid filter '{pattern}': {message}")]
    InvalidFilter { pattern: String, message: String },
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Callback(#[from] anyhow::Error),
}

pub type SuiteResult<T> = Result<T, SuiteError>;
