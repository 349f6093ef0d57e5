//! Command-line entry point for binaries that bundle suites.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use crate::config::{RunnerConfig, load_runner_config, split_filters};
use crate::core::EnvironmentInfo;
use crate::report::{ConsoleReporter, CsvReporter, JsonlReporter, SharedReporter, shared};
use crate::runner::{RunSummary, Runner};
use crate::suite::TestSuite;
use crate::SuiteResult;

#[derive(Parser, Debug, Default)]
#[command(about = "Run resource and benchmark test suites", long_about = None)]
pub struct Cli {
    /// Regex over `Suite.test`; repeatable, comma separated values allowed
    #[arg(short = 'f', long = "filter", value_name = "REGEX")]
    pub filters: Vec<String>,

    /// Runner config (.toml, .yaml or .yml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write one JSON record per benchmark to this file
    #[arg(long)]
    pub jsonl: Option<PathBuf>,

    /// Write a CSV table of benchmark results to this file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Record host details (CPU, memory, git revision) with the results
    #[arg(long)]
    pub environment: bool,

    /// Disable colored console output
    #[arg(long)]
    pub no_color: bool,

    /// List selected tests without running them
    #[arg(long)]
    pub list: bool,

    /// Enable verbose logging (or set SUITE_BENCH_LOG)
    #[arg(long)]
    pub verbose: bool,
}

/// Effective run settings after merging the config file and the flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub name: String,
    pub filters: Vec<String>,
    pub color: bool,
    pub jsonl: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub environment: bool,
}

impl Settings {
    pub fn resolve(default_name: &str, cli: &Cli) -> SuiteResult<Self> {
        let file = match &cli.config {
            Some(path) => load_runner_config(path)?,
            None => RunnerConfig::default(),
        };
        let mut filters = split_filters(&file.filters);
        filters.extend(split_filters(&cli.filters));
        Ok(Settings {
            name: file.name.unwrap_or_else(|| default_name.to_string()),
            filters,
            color: !cli.no_color && file.color.unwrap_or(true),
            jsonl: cli.jsonl.clone().or(file.jsonl),
            csv: cli.csv.clone().or(file.csv),
            environment: cli.environment || file.environment,
        })
    }
}

pub fn init_tracing(verbose: bool) {
    let env = std::env::var("SUITE_BENCH_LOG").unwrap_or_else(|_| {
        if verbose { "suite_bench=debug".to_string() } else { "suite_bench=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

/// Print the `Suite.test` names a run with `settings` would execute.
pub fn list_tests(settings: &Settings, suites: &[TestSuite], out: &mut impl Write) -> SuiteResult<()> {
    let runner = Runner::new(&settings.name).with_filters(&settings.filters)?;
    for name in runner.selected(suites) {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

/// Run `suites` with console output to `out` plus any file sinks.
///
/// A sink that failed to write turns into an error after the run.
pub fn run_suites<W>(settings: &Settings, suites: &mut [TestSuite], out: W) -> SuiteResult<RunSummary>
where
    W: Write + 'static,
{
    let console: SharedReporter = shared(ConsoleReporter::new(out).with_color(settings.color));
    let mut runner = Runner::new(&settings.name)
        .with_filters(&settings.filters)?
        .with_reporter(console);
    if settings.environment {
        runner = runner.with_environment(EnvironmentInfo::detect());
    }

    let jsonl = match &settings.jsonl {
        Some(path) => Some(shared(JsonlReporter::create(path)?)),
        None => None,
    };
    let csv = match &settings.csv {
        Some(path) => Some(shared(CsvReporter::create(path)?)),
        None => None,
    };
    if let Some(sink) = &jsonl {
        runner.add_reporter(sink.clone());
    }
    if let Some(sink) = &csv {
        runner.add_reporter(sink.clone());
    }

    let summary = runner.run(suites);

    let jsonl_error = jsonl.and_then(|sink| sink.borrow_mut().take_error());
    let csv_error = csv.and_then(|sink| sink.borrow_mut().take_error());
    match jsonl_error.or(csv_error) {
        Some(err) => Err(err),
        None => Ok(summary),
    }
}

/// Parse the process arguments and run; for a bundled binary's `main`.
pub fn run_main(name: &str, mut suites: Vec<TestSuite>) -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = Settings::resolve(name, &cli).and_then(|settings| {
        if cli.list {
            list_tests(&settings, &suites, &mut std::io::stdout()).map(|()| true)
        } else {
            run_suites(&settings, &mut suites, std::io::stdout()).map(|summary| summary.success())
        }
    });

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "suite-bench",
            "-f",
            "A, B",
            "--filter",
            "C",
            "--no-color",
            "--jsonl",
            "out.jsonl",
        ])
        .unwrap();
        assert_eq!(cli.filters, ["A, B", "C"]);
        assert!(cli.no_color);
        assert_eq!(cli.jsonl, Some(PathBuf::from("out.jsonl")));
    }

    #[test]
    fn test_settings_without_config() {
        let cli = Cli {
            filters: vec!["A,B".into()],
            ..Cli::default()
        };
        let settings = Settings::resolve("self-test", &cli).unwrap();
        assert_eq!(settings.name, "self-test");
        assert_eq!(settings.filters, ["A", "B"]);
        assert!(settings.color);
        assert!(settings.jsonl.is_none());
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.toml");
        std::fs::write(
            &path,
            "name = \"nightly\"\nfilters = [\"Res\"]\ncolor = true\ncsv = \"a.csv\"\n",
        )
        .unwrap();
        let cli = Cli {
            config: Some(path),
            filters: vec!["Bench".into()],
            csv: Some(PathBuf::from("b.csv")),
            no_color: true,
            ..Cli::default()
        };
        let settings = Settings::resolve("self-test", &cli).unwrap();
        assert_eq!(settings.name, "nightly");
        assert_eq!(settings.filters, ["Res", "Bench"]);
        assert!(!settings.color);
        assert_eq!(settings.csv, Some(PathBuf::from("b.csv")));
    }
}
