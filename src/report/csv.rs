//! CSV sink: one row per completed benchmark, written when the run ends.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::warn;

use crate::bench::BenchmarkResult;
use crate::runner::{RunInfo, RunSummary};
use crate::{SuiteError, SuiteResult};

use super::Reporter;
use super::jsonl::create_output;

/// Column headers in output order.
pub const CSV_HEADERS: &[&str] = &[
    "run",
    "suite",
    "test",
    "label",
    "warmups",
    "n",
    "total_nanos",
    "average_nanos",
    "ops_per_second",
];

struct Row {
    suite: String,
    test: String,
    result: BenchmarkResult,
}

pub struct CsvReporter<W: Write> {
    out: Option<W>,
    run: String,
    suite: String,
    test: String,
    rows: Vec<Row>,
    error: Option<SuiteError>,
}

impl CsvReporter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> SuiteResult<Self> {
        Ok(Self::new(create_output(path.as_ref())?))
    }
}

impl<W: Write> CsvReporter<W> {
    pub fn new(out: W) -> Self {
        CsvReporter {
            out: Some(out),
            run: String::new(),
            suite: String::new(),
            test: String::new(),
            rows: Vec::new(),
            error: None,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn take_error(&mut self) -> Option<SuiteError> {
        self.error.take()
    }

    /// The underlying writer, once the table has been written.
    pub fn into_inner(self) -> Option<W> {
        self.out
    }

    fn write_table(&self, out: W) -> SuiteResult<W> {
        let to_io = |e: csv::Error| SuiteError::Io(e.into());
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(CSV_HEADERS).map_err(to_io)?;
        for row in &self.rows {
            let r = &row.result;
            writer
                .write_record([
                    self.run.clone(),
                    row.suite.clone(),
                    row.test.clone(),
                    r.label.clone().unwrap_or_default(),
                    r.warmups.to_string(),
                    r.n.to_string(),
                    r.total_nanos.to_string(),
                    format!("{:.3}", r.average_nanos),
                    r.ops_per_second.to_string(),
                ])
                .map_err(to_io)?;
        }
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| SuiteError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))
    }
}

impl<W: Write> Reporter for CsvReporter<W> {
    fn run_started(&mut self, info: &RunInfo) {
        self.run = info.name.clone();
        self.rows.clear();
    }

    fn test_started(&mut self, suite: &str, test: &str) {
        self.suite = suite.to_string();
        self.test = test.to_string();
    }

    fn run_completed(&mut self, _summary: &RunSummary) {
        let Some(out) = self.out.take() else {
            return;
        };
        match self.write_table(out) {
            Ok(out) => self.out = Some(out),
            Err(err) => {
                warn!(error = %err, "csv sink write failed");
                self.error = Some(err);
            }
        }
    }

    fn performance_test_ended(&mut self, result: &BenchmarkResult) {
        self.rows.push(Row {
            suite: self.suite.clone(),
            test: self.test.clone(),
            result: result.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_written_at_run_end() {
        let mut sink = CsvReporter::new(Vec::new());
        sink.run_started(&RunInfo::new("run"));
        sink.test_started("Suite", "bench");
        sink.performance_test_ended(&BenchmarkResult::new(Some("x".into()), 10, 990, 9_900));
        assert_eq!(sink.rows(), 1);
        sink.run_completed(&RunSummary::default());

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADERS.join(","));
        assert_eq!(lines[1], "run,Suite,bench,x,10,990,9900,10.000,100000000");
    }
}
