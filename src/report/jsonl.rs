//! JSON Lines sink: one `BenchRecord` per completed benchmark.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::warn;

use crate::bench::BenchmarkResult;
use crate::core::{BenchRecord, EnvironmentInfo};
use crate::runner::{RunInfo, RunSummary};
use crate::{SuiteError, SuiteResult};

use super::Reporter;

/// Create `path`, and its parent directory when missing, for buffered writing.
pub(crate) fn create_output(path: &Path) -> SuiteResult<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Streams records as benchmarks complete.
///
/// Write failures do not interrupt the run; the first one is kept and can be
/// collected with [`JsonlReporter::take_error`].
pub struct JsonlReporter<W: Write> {
    out: W,
    run: String,
    suite: String,
    test: String,
    env: Option<EnvironmentInfo>,
    written: usize,
    error: Option<SuiteError>,
}

impl JsonlReporter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> SuiteResult<Self> {
        Ok(Self::new(create_output(path.as_ref())?))
    }
}

impl<W: Write> JsonlReporter<W> {
    pub fn new(out: W) -> Self {
        JsonlReporter {
            out,
            run: String::new(),
            suite: String::new(),
            test: String::new(),
            env: None,
            written: 0,
            error: None,
        }
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn take_error(&mut self) -> Option<SuiteError> {
        self.error.take()
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_record(&mut self, record: &BenchRecord) -> SuiteResult<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| SuiteError::Io(std::io::Error::other(e)))?;
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    fn keep(&mut self, result: SuiteResult<()>) {
        if let Err(err) = result {
            warn!(error = %err, "jsonl sink write failed");
            if self.error.is_none() {
                self.error = Some(err);
            }
        }
    }
}

impl<W: Write> Reporter for JsonlReporter<W> {
    fn run_started(&mut self, info: &RunInfo) {
        self.run = info.name.clone();
        self.env = info.environment.clone();
    }

    fn test_started(&mut self, suite: &str, test: &str) {
        self.suite = suite.to_string();
        self.test = test.to_string();
    }

    fn run_completed(&mut self, _summary: &RunSummary) {
        let flushed = self.out.flush().map_err(SuiteError::from);
        self.keep(flushed);
    }

    fn performance_test_ended(&mut self, result: &BenchmarkResult) {
        let record = BenchRecord::new(&self.run, &self.suite, &self.test, result.clone())
            .with_env(self.env.clone());
        let written = self.write_record(&record);
        if written.is_ok() {
            self.written += 1;
        }
        self.keep(written);
    }
}
