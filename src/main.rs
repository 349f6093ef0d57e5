#![forbid(unsafe_code)]

use std::process::ExitCode;

use suite_bench::{cli, selftest};

fn main() -> ExitCode {
    color_eyre::install().ok();
    match selftest::suites() {
        Ok(suites) => cli::run_main("suite-bench self-test", suites),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
