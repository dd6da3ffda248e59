use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::DmesgConfig;

use super::{DmesgError, LogSnapshot, LogSource};

const DEFAULT_COMMAND: [&str; 3] = ["dmesg", "--level", "emerg,alert,crit,err,warn,notice"];
const RESTRICT_PATH: &str = "/proc/sys/kernel/dmesg_restrict";

/// Reads the ring buffer by running `dmesg` (or a configured replacement).
#[derive(Debug, Clone)]
pub struct LinuxDmesg {
    argv: Vec<String>,
    display: String,
}

impl LinuxDmesg {
    pub fn new(argv: Vec<String>) -> Result<Self, DmesgError> {
        if argv.is_empty() {
            return Err(DmesgError::InvalidCommand {
                command: String::new(),
                reason: "empty command".into(),
            });
        }
        let display = shell_words::join(&argv);
        Ok(Self { argv, display })
    }

    pub fn from_config(config: &DmesgConfig) -> Result<Self, DmesgError> {
        match config.command.as_deref() {
            None => Self::new(DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect()),
            Some(command) => {
                let argv =
                    shell_words::split(command).map_err(|e| DmesgError::InvalidCommand {
                        command: command.to_string(),
                        reason: e.to_string(),
                    })?;
                Self::new(argv)
            }
        }
    }

    /// Capture once to prove the command works, and warn about setups that
    /// make the diff less reliable.
    pub async fn probe(&self) -> Result<(), DmesgError> {
        let snapshot = self.capture().await?;

        if let Some(first) = snapshot.lines().first()
            && !has_timestamp(first)
        {
            log::warn!(
                "kernel log lines carry no timestamps; repeated identical messages \
                 may not be told apart (enable CONFIG_PRINTK_TIME)"
            );
        }

        if is_restricted() {
            log::warn!(
                "{} is set and this process is not root; `{}` may be denied",
                RESTRICT_PATH,
                self.display
            );
        }

        Ok(())
    }
}

#[async_trait]
impl LogSource for LinuxDmesg {
    async fn capture(&self) -> Result<LogSnapshot, DmesgError> {
        let output = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| DmesgError::Spawn {
                command: self.display.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DmesgError::Exited {
                command: self.display.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8(output.stdout).map_err(|e| DmesgError::Malformed {
            command: self.display.clone(),
            offset: e.utf8_error().valid_up_to(),
        })?;
        Ok(LogSnapshot::from_output(&text))
    }

    fn name(&self) -> &str {
        &self.display
    }
}

/// Matches the `[   12.345678]` prefix printk adds when timestamps are on.
fn has_timestamp(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('[') else {
        return false;
    };
    let Some((stamp, _)) = rest.split_once(']') else {
        return false;
    };
    let Some((secs, micros)) = stamp.trim_start().split_once('.') else {
        return false;
    };
    !secs.is_empty()
        && !micros.is_empty()
        && secs.bytes().all(|b| b.is_ascii_digit())
        && micros.bytes().all(|b| b.is_ascii_digit())
}

fn is_restricted() -> bool {
    let restricted = std::fs::read_to_string(RESTRICT_PATH)
        .map(|v| v.trim() == "1")
        .unwrap_or(false);
    restricted && unsafe { libc::geteuid() } != 0
}
