//! Sources of kernel ring-buffer content.
//!
//! Every source implements [`LogSource`]. Callers obtain one through
//! [`detect`] and never branch on the concrete type.

pub mod dummy;
#[cfg(target_os = "linux")]
pub mod linux;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DmesgConfig;

pub use dummy::DummyDmesg;
#[cfg(target_os = "linux")]
pub use linux::LinuxDmesg;

/// Full ring-buffer content at one instant, oldest line first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSnapshot {
    lines: Vec<String>,
}

impl LogSnapshot {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Split raw command output on line boundaries. Only the final line
    /// terminator is dropped; empty lines elsewhere are kept.
    pub fn from_output(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_owned).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Reasons the kernel log could not be read. All of them mean "unavailable":
/// callers carry on without kernel-log classification, and a failed capture
/// never becomes the baseline for the next diff.
#[derive(Debug, Error)]
pub enum DmesgError {
    #[error("kernel log is not available on {0}")]
    Unsupported(&'static str),
    #[error("invalid kernel log command '{command}': {reason}")]
    InvalidCommand { command: String, reason: String },
    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with code {code}: {stderr}")]
    Exited {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("`{command}` produced output that is not UTF-8 (first bad byte at {offset})")]
    Malformed { command: String, offset: usize },
    #[error("kernel log capture timed out after {0:?}")]
    TimedOut(Duration),
}

/// Capability to read the whole kernel ring buffer.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Read the current ring-buffer content.
    async fn capture(&self) -> Result<LogSnapshot, DmesgError>;

    /// Display name for this source (e.g., "dmesg").
    fn name(&self) -> &str;

    /// True for the no-op source that never reports any content.
    fn is_dummy(&self) -> bool {
        false
    }
}

/// Build the log source for this platform and configuration.
///
/// Integration that was asked for but cannot work is reported once, at error
/// level, and replaced by [`DummyDmesg`] so test execution is never blocked.
pub async fn detect(config: &DmesgConfig) -> Arc<dyn LogSource> {
    if !config.enabled {
        log::debug!("kernel log integration disabled");
        return Arc::new(DummyDmesg);
    }

    match platform_source(config).await {
        Ok(source) => {
            log::info!("capturing kernel log with {}", source.name());
            source
        }
        Err(e) => {
            log::error!(
                "kernel log integration requested but unavailable: {e}; \
                 results will not be classified against the kernel log"
            );
            Arc::new(DummyDmesg)
        }
    }
}

#[cfg(target_os = "linux")]
async fn platform_source(config: &DmesgConfig) -> Result<Arc<dyn LogSource>, DmesgError> {
    let source = LinuxDmesg::from_config(config)?;
    let limit = config.capture_timeout();
    tokio::time::timeout(limit, source.probe())
        .await
        .map_err(|_| DmesgError::TimedOut(limit))??;
    Ok(Arc::new(source))
}

#[cfg(not(target_os = "linux"))]
async fn platform_source(_config: &DmesgConfig) -> Result<Arc<dyn LogSource>, DmesgError> {
    Err(DmesgError::Unsupported(std::env::consts::OS))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Source that replays a fixed series of captures, then keeps repeating
    /// the last one. `None` entries simulate an unavailable log.
    pub struct ScriptedSource {
        captures: Mutex<VecDeque<Option<Vec<String>>>>,
        last: Mutex<Option<Vec<String>>>,
    }

    impl ScriptedSource {
        pub fn new(captures: Vec<Option<Vec<&str>>>) -> Self {
            let captures = captures
                .into_iter()
                .map(|c| c.map(|lines| lines.into_iter().map(String::from).collect()))
                .collect();
            Self {
                captures: Mutex::new(captures),
                last: Mutex::new(None),
            }
        }

        pub fn push(&self, lines: &[&str]) {
            self.captures
                .lock()
                .unwrap()
                .push_back(Some(lines.iter().map(|l| l.to_string()).collect()));
        }
    }

    #[async_trait]
    impl LogSource for ScriptedSource {
        async fn capture(&self) -> Result<LogSnapshot, DmesgError> {
            let next = self.captures.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            match next {
                Some(Some(lines)) => {
                    *last = Some(lines.clone());
                    Ok(LogSnapshot::new(lines))
                }
                Some(None) => Err(DmesgError::Unsupported("script")),
                None => Ok(LogSnapshot::new(last.clone().unwrap_or_default())),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}
