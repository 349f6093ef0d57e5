//! End-to-end runs through `cli::run_suites` with every sink enabled.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use suite_bench::cli::{Settings, list_tests, run_suites};
use suite_bench::core::{BenchRecord, SCHEMA_VERSION};
use suite_bench::report::CSV_HEADERS;
use suite_bench::{BenchmarkRequest, TestSuite};

/// Console output captured for inspection after the runner is gone.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

fn settings(dir: &std::path::Path) -> Settings {
    Settings {
        name: "sinks".into(),
        filters: Vec::new(),
        color: false,
        jsonl: Some(dir.join("out/results.jsonl")),
        csv: Some(dir.join("out/results.csv")),
        environment: false,
    }
}

fn suites() -> Vec<TestSuite> {
    let bench = TestSuite::new("Bench")
        .with_test("small", |ctx| {
            ctx.measure(BenchmarkRequest::fixed(200, |i| Ok(i * 2)).with_label("double"))?;
            Ok(())
        })
        .and_then(|s| {
            s.with_test("large", |ctx| {
                ctx.measure(BenchmarkRequest::fixed(500, |i| Ok(i + 1)))?;
                Ok(())
            })
        })
        .unwrap();
    let plain = TestSuite::new("Plain")
        .with_test("fails", |_| anyhow::bail!("expected failure"))
        .unwrap();
    vec![bench, plain]
}

#[test]
fn test_jsonl_and_csv_sinks() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let console = SharedBuf::default();
    let summary = run_suites(&settings, &mut suites(), console.clone()).unwrap();
    assert_eq!(summary.passed(), 2);
    assert_eq!(summary.failed(), 1);

    let jsonl = std::fs::read_to_string(dir.path().join("out/results.jsonl")).unwrap();
    let records: Vec<BenchRecord> = jsonl
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.schema_version == SCHEMA_VERSION && r.run == "sinks"));
    assert_eq!(records[0].test, "small");
    assert_eq!(records[0].result.label.as_deref(), Some("double"));
    assert_eq!(records[1].test, "large");
    assert_eq!(records[1].result.n, 495);
    assert!(records[0].env.is_none());

    let mut reader = csv::Reader::from_path(dir.path().join("out/results.csv")).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, CSV_HEADERS);
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1], "Bench");
    assert_eq!(&rows[0][5], "198");

    let text = console.text();
    assert!(text.contains("[ RUN      ] Bench.small"));
    assert!(text.contains("[  FAILED  ] Plain.fails"));
    assert!(text.contains("expected failure"));
    assert!(text.contains("3 tests from 2 test suites ran."));
    assert!(text.contains("[  PASSED  ] 2 tests."));
}

#[test]
fn test_filters_and_listing() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(dir.path());
    settings.filters = vec!["small$".into()];

    let mut listing = Vec::new();
    list_tests(&settings, &suites(), &mut listing).unwrap();
    assert_eq!(String::from_utf8(listing).unwrap(), "Bench.small\n");

    let summary = run_suites(&settings, &mut suites(), SharedBuf::default()).unwrap();
    assert_eq!(summary.total(), 1);
    assert!(summary.success());
}

#[test]
fn test_invalid_filter_is_reported_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(dir.path());
    settings.filters = vec!["[".into()];
    assert!(run_suites(&settings, &mut suites(), SharedBuf::default()).is_err());
    assert!(!dir.path().join("out").exists());
}
