//! gtest-style console output with a benchmark summary table.

use std::io::{Stdout, Write};

use colored::{Color, Colorize};

use crate::bench::{BenchmarkResult, BenchmarkStart};
use crate::runner::{RunInfo, RunSummary, SuiteSummary, TestOutcome, TestStatus};

use super::Reporter;
use super::format::{millis, mops, mops_value, nanos, plural};

const INDENT: &str = "    ";

struct ResultRow {
    suite: String,
    test: String,
    result: BenchmarkResult,
}

pub struct ConsoleReporter<W: Write = Stdout> {
    out: W,
    color: bool,
    indent: usize,
    measuring: bool,
    suite: String,
    test: String,
    failed_tests: Vec<String>,
    results: Vec<ResultRow>,
}

impl ConsoleReporter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        ConsoleReporter {
            out,
            color: true,
            indent: 0,
            measuring: false,
            suite: String::new(),
            test: String::new(),
            failed_tests: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn blank(&mut self) {
        let _ = writeln!(self.out);
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}{}", INDENT.repeat(self.indent), text);
    }

    fn tagged(&mut self, tag: &str, color: Color, rest: &str) {
        let tag = self.paint(tag, color);
        if rest.is_empty() {
            self.line(&tag);
        } else {
            self.line(&format!("{tag} {rest}"));
        }
    }

    fn field(&mut self, name: &str, value: &str) {
        let value = self.paint(value, Color::Green);
        self.line(&format!("{name:>11} {value}"));
    }

    fn dash(&mut self, rest: &str) {
        self.tagged("[----------]", Color::Green, rest);
    }

    fn double_dash(&mut self, rest: &str) {
        self.tagged("[==========]", Color::Green, rest);
    }

    fn failed(&mut self, rest: &str) {
        self.tagged("[  FAILED  ]", Color::Red, rest);
    }

    fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    fn write_table(&mut self) {
        type Column = (&'static str, fn(&ResultRow) -> String);
        let columns: [Column; 7] = [
            ("Suite", |r| r.suite.clone()),
            ("Test", |r| r.test.clone()),
            ("Label", |r| r.result.label.clone().unwrap_or_default()),
            ("N", |r| r.result.n.to_string()),
            ("Total", |r| nanos(r.result.total_nanos as f64)),
            ("Mean", |r| nanos(r.result.average_nanos)),
            ("MOp/s", |r| mops_value(r.result.ops_per_second).to_string()),
        ];

        let cells: Vec<Vec<String>> = columns
            .iter()
            .map(|(_, cell)| self.results.iter().map(cell).collect())
            .collect();
        let widths: Vec<usize> = columns
            .iter()
            .zip(&cells)
            .map(|((header, _), rows)| {
                rows.iter()
                    .map(|s| s.chars().count())
                    .chain(std::iter::once(header.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let header = columns
            .iter()
            .zip(&widths)
            .map(|((h, _), &w)| format!("{h:>w$}"))
            .collect::<Vec<_>>()
            .join(" | ");
        self.line(&format!("| {header} |"));
        let rule = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-|-");
        self.line(&format!("|-{rule}-|"));
        for row in 0..self.results.len() {
            let text = cells
                .iter()
                .zip(&widths)
                .map(|(column, &w)| format!("{:>w$}", column[row]))
                .collect::<Vec<_>>()
                .join(" | ");
            self.line(&format!("| {text} |"));
        }
        self.blank();
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn run_started(&mut self, info: &RunInfo) {
        self.failed_tests.clear();
        self.double_dash(&format!("Running {}", info.name));
        let filters = info
            .filters
            .iter()
            .map(|f| format!("{f:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.dash(&format!("Filters: [{filters}]"));
        if let Some(env) = &info.environment {
            self.dash(&format!("Environment: {}", env.summary()));
        }
        self.dash("Global test environment set-up.");
    }

    fn suite_started(&mut self, suite: &str, tests: usize) {
        self.blank();
        self.dash(&format!("{} from {suite}", plural(tests, "test")));
    }

    fn test_started(&mut self, suite: &str, test: &str) {
        self.suite = suite.to_string();
        self.test = test.to_string();
        self.tagged("[ RUN      ]", Color::Green, &format!("{suite}.{test}"));
        self.indent += 1;
    }

    fn test_finished(&mut self, outcome: &TestOutcome) {
        // A routine that panicked never reached the engine's error path.
        if self.measuring {
            self.measuring = false;
            self.dedent();
            self.failed("");
        }
        let name = format!("{}.{}", outcome.suite, outcome.test);
        let elapsed = millis(outcome.elapsed.as_secs_f64() * 1e3);
        match &outcome.status {
            TestStatus::Passed => {
                self.dedent();
                self.tagged("[       OK ]", Color::Green, &format!("{name} ({elapsed})"));
            }
            TestStatus::Failed { message } => {
                self.failed_tests.push(name.clone());
                for text in message.lines() {
                    self.line(text);
                }
                self.dedent();
                self.failed(&format!("{name} ({elapsed})"));
            }
        }
    }

    fn suite_completed(&mut self, summary: &SuiteSummary) {
        if let Some(message) = &summary.teardown_error {
            self.failed(&format!("{} teardown: {message}", summary.name));
        }
        let total = summary.outcomes.len();
        self.dash(&format!(
            "{} from {} ({} total)",
            plural(total, "test"),
            summary.name,
            millis(summary.elapsed.as_secs_f64() * 1e3)
        ));
    }

    fn run_completed(&mut self, summary: &RunSummary) {
        let suites = summary.suites.len();
        let total = summary.total();
        let passed = summary.passed();

        self.blank();
        self.dash("Global test environment tear-down");
        self.double_dash(&format!(
            "{} from {} ran. ({} total)",
            plural(total, "test"),
            plural(suites, "test suite"),
            millis(summary.elapsed.as_secs_f64() * 1e3)
        ));
        self.tagged("[  PASSED  ]", Color::Green, &format!("{}.", plural(passed, "test")));

        let failed = std::mem::take(&mut self.failed_tests);
        if !failed.is_empty() {
            self.failed(&format!("{}, listed below:", plural(failed.len(), "test")));
            for name in &failed {
                self.failed(name);
            }
        }
        self.blank();

        if !self.results.is_empty() {
            self.write_table();
        }
        let _ = self.out.flush();
    }

    fn performance_test_started(&mut self, start: &BenchmarkStart) {
        self.tagged("[ MEASURE  ]", Color::Yellow, "");
        self.indent += 1;
        self.measuring = true;
        if let Some(label) = &start.label {
            self.field("Label:", label);
        }
        if let Some(operations) = start.operations {
            self.field("Operations:", &operations.to_string());
        }
        if let Some(target) = start.target_time {
            self.field("Target:", &millis(target.as_secs_f64() * 1e3));
        }
        self.field("Warmups:", &start.warmups.to_string());
    }

    fn performance_test_errored(&mut self, iteration: u64, during_warmup: bool) {
        let phase = if during_warmup { "warmup" } else { "measurement" };
        let text = self.paint(&format!("Failed on operation {iteration} ({phase})"), Color::Red);
        self.line(&text);
        self.measuring = false;
        self.dedent();
        self.failed("");
    }

    fn performance_test_ended(&mut self, result: &BenchmarkResult) {
        self.results.push(ResultRow {
            suite: self.suite.clone(),
            test: self.test.clone(),
            result: result.clone(),
        });
        self.field("N:", &result.n.to_string());
        self.field("Total time:", &nanos(result.total_nanos as f64));
        self.field("Average:", &nanos(result.average_nanos));
        self.field("Rate:", &mops(result.ops_per_second));
        self.measuring = false;
        self.dedent();
        self.tagged("[     DONE ]", Color::Yellow, "");
    }
}
