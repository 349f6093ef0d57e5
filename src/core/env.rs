//! Host detection for benchmark records.

use std::process::Command;

use serde::{Deserialize, Serialize};

/// Where a run happened, recorded next to its results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ram_bytes: Option<u64>,

    pub os: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_dirty: Option<bool>,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        EnvironmentInfo {
            cpu_model: None,
            cpu_cores: None,
            total_ram_bytes: None,
            os: std::env::consts::OS.to_string(),
            hostname: None,
            git_sha: None,
            git_dirty: None,
        }
    }
}

impl EnvironmentInfo {
    /// Detect from the current system and working directory.
    pub fn detect() -> Self {
        use sysinfo::System;

        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        EnvironmentInfo {
            cpu_model: sys.cpus().first().map(|c| c.brand().trim().to_string()),
            cpu_cores: sys.physical_core_count().map(|c| c as u32),
            total_ram_bytes: Some(sys.total_memory()),
            os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            hostname: System::host_name(),
            git_sha: git(&["rev-parse", "HEAD"])
                .map(|out| out.trim().to_string())
                .filter(|s| !s.is_empty()),
            git_dirty: git(&["status", "--porcelain"]).map(|out| !out.trim().is_empty()),
        }
    }

    /// One line for console headers, e.g. `linux, 8 cores, Intel(R) Xeon(R)`.
    pub fn summary(&self) -> String {
        let mut parts = vec![self.os.clone()];
        if let Some(cores) = self.cpu_cores {
            parts.push(format!("{cores} cores"));
        }
        if let Some(cpu) = &self.cpu_model {
            parts.push(cpu.clone());
        }
        if let Some(sha) = &self.git_sha {
            let short: String = sha.chars().take(10).collect();
            let dirty = if self.git_dirty == Some(true) { "+dirty" } else { "" };
            parts.push(format!("git {short}{dirty}"));
        }
        parts.join(", ")
    }
}

fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
}
