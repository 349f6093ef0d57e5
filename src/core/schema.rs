//! BenchRecord schema v1: one line of the JSONL sink.

use serde::{Deserialize, Serialize};

use crate::bench::BenchmarkResult;

use super::env::EnvironmentInfo;

/// Bumped whenever a field changes meaning.
pub const SCHEMA_VERSION: u32 = 1;

/// One completed benchmark with enough context to compare runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchRecord {
    pub schema_version: u32,

    /// Run name given to the runner.
    pub run: String,

    /// RFC 3339, UTC.
    pub timestamp: String,

    pub suite: String,

    pub test: String,

    #[serde(flatten)]
    pub result: BenchmarkResult,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvironmentInfo>,
}

impl BenchRecord {
    pub fn new(run: &str, suite: &str, test: &str, result: BenchmarkResult) -> Self {
        let timestamp = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        BenchRecord {
            schema_version: SCHEMA_VERSION,
            run: run.to_string(),
            timestamp,
            suite: suite.to_string(),
            test: test.to_string(),
            result,
            env: None,
        }
    }

    pub fn with_env(mut self, env: Option<EnvironmentInfo>) -> Self {
        self.env = env;
        self
    }
}
