use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

pub const CONFIG_FILE: &str = "dmesg-lens.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dmesg: DmesgConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Controls how the kernel log is captured.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DmesgConfig {
    /// When false, a no-op source is used and no verdict is ever escalated.
    pub enabled: bool,
    /// Command line used to dump the ring buffer, split with shell rules.
    /// Example: "sudo dmesg --level err,warn"
    pub command: Option<String>,
    /// Upper bound on a single capture before it is treated as unavailable.
    pub capture_timeout_ms: u64,
}

impl Default for DmesgConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: None,
            capture_timeout_ms: 2000,
        }
    }
}

impl DmesgConfig {
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RunnerConfig {
    /// Per-test wall-clock limit. Tests that exceed it get the `timeout` verdict.
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load `dmesg-lens.toml` from `dir`, falling back to defaults if absent or invalid.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("ignoring invalid {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
