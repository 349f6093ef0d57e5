//! Human-readable durations and rates.

/// Nanoseconds, switching to `us` and then `ms` above 10 000 of a unit.
pub fn nanos(ns: f64) -> String {
    if ns > 1e4 {
        micros(ns / 1e3)
    } else {
        format!("{} ns", ns.round())
    }
}

pub fn micros(us: f64) -> String {
    if us > 1e4 {
        millis(us / 1e3)
    } else {
        format!("{} us", us.round())
    }
}

pub fn millis(ms: f64) -> String {
    format!("{} ms", ms.round())
}

/// Millions of operations per second, three decimals at most.
pub fn mops(ops_per_second: u64) -> String {
    format!("{} MOp/s", mops_value(ops_per_second))
}

pub fn mops_value(ops_per_second: u64) -> f64 {
    (ops_per_second as f64 / 1000.0).round() / 1000.0
}

/// `"1 test"`, `"2 tests"`.
pub fn plural(n: usize, singular: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {singular}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanos_unit_switching() {
        assert_eq!(nanos(950.4), "950 ns");
        assert_eq!(nanos(10_000.0), "10000 ns");
        assert_eq!(nanos(25_400.0), "25 us");
        assert_eq!(nanos(42_000_000.0), "42 ms");
    }

    #[test]
    fn test_mops() {
        assert_eq!(mops(100_000_000), "100 MOp/s");
        assert_eq!(mops(4_567_890), "4.568 MOp/s");
        assert_eq!(mops(0), "0 MOp/s");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "test"), "1 test");
        assert_eq!(plural(0, "suite"), "0 suites");
    }
}
