use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{SuiteError, SuiteResult};

/// Runner settings read from a file. Command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub name: Option<String>,
    pub filters: Vec<String>,
    pub color: Option<bool>,
    pub jsonl: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    /// Detect and record host details with every run.
    pub environment: bool,
}

/// Load a config from `.toml`, `.yaml` or `.yml`.
pub fn load_runner_config(path: &Path) -> SuiteResult<RunnerConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| SuiteError::Config(format!("{}: {e}", path.display())))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("toml") => toml::from_str(&s).map_err(|e| SuiteError::Config(e.to_string())),
        Some("yaml" | "yml") => {
            serde_yaml::from_str(&s).map_err(|e| SuiteError::Config(e.to_string()))
        }
        _ => Err(SuiteError::Config(format!(
            "{}: expected a .toml, .yaml or .yml file",
            path.display()
        ))),
    }
}

/// Split comma separated filter values and drop empty entries.
pub fn split_filters<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .flat_map(|v| {
            v.as_ref()
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_toml() {
        let file = write(
            ".toml",
            r#"
name = "nightly"
filters = ["^Resources\\.", "sweep"]
color = false
jsonl = "out/results.jsonl"
environment = true
"#,
        );
        let cfg = load_runner_config(file.path()).unwrap();
        assert_eq!(cfg.name.as_deref(), Some("nightly"));
        assert_eq!(cfg.filters, ["^Resources\\.", "sweep"]);
        assert_eq!(cfg.color, Some(false));
        assert_eq!(cfg.jsonl, Some(PathBuf::from("out/results.jsonl")));
        assert!(cfg.csv.is_none());
        assert!(cfg.environment);
    }

    #[test]
    fn test_load_yaml() {
        let file = write(".yml", "filters:\n  - Bench\ncsv: results.csv\n");
        let cfg = load_runner_config(file.path()).unwrap();
        assert_eq!(cfg.filters, ["Bench"]);
        assert_eq!(cfg.csv, Some(PathBuf::from("results.csv")));
        assert!(!cfg.environment);
    }

    #[test]
    fn test_unknown_extension_and_field() {
        let file = write(".json", "{}");
        assert!(matches!(load_runner_config(file.path()), Err(SuiteError::Config(_))));

        let file = write(".toml", "colour = true\n");
        assert!(matches!(load_runner_config(file.path()), Err(SuiteError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_runner_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SuiteError::Config(_)));
    }

    #[test]
    fn test_split_filters() {
        assert_eq!(
            split_filters(["a, b", "", " c ,", "d"]),
            ["a", "b", "c", "d"]
        );
    }
}
