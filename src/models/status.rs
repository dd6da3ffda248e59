use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a single test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    #[default]
    #[serde(rename = "notrun")]
    NotRun,
    Skip,
    Pass,
    Warn,
    DmesgWarn,
    Fail,
    DmesgFail,
    Crash,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown verdict '{0}'")]
pub struct UnknownVerdict(pub String);

impl Verdict {
    pub const ALL: [Verdict; 9] = [
        Verdict::Pass,
        Verdict::Warn,
        Verdict::DmesgWarn,
        Verdict::Fail,
        Verdict::DmesgFail,
        Verdict::Crash,
        Verdict::Timeout,
        Verdict::Skip,
        Verdict::NotRun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::NotRun => "notrun",
            Verdict::Skip => "skip",
            Verdict::Pass => "pass",
            Verdict::Warn => "warn",
            Verdict::DmesgWarn => "dmesg-warn",
            Verdict::Fail => "fail",
            Verdict::DmesgFail => "dmesg-fail",
            Verdict::Crash => "crash",
            Verdict::Timeout => "timeout",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Verdict::Pass => "✔",
            Verdict::Warn | Verdict::DmesgWarn => "⚠",
            Verdict::Fail | Verdict::DmesgFail => "✘",
            Verdict::Crash | Verdict::Timeout => "☠",
            Verdict::Skip | Verdict::NotRun => "⊘",
        }
    }

    /// Position from best (0) to worst. `None` for verdicts that are not
    /// ranked (the test did not really run).
    pub fn severity(&self) -> Option<u8> {
        match self {
            Verdict::Pass => Some(0),
            Verdict::Warn => Some(10),
            Verdict::DmesgWarn => Some(20),
            Verdict::Fail => Some(30),
            Verdict::DmesgFail => Some(40),
            Verdict::Crash => Some(50),
            Verdict::Timeout => Some(60),
            Verdict::Skip | Verdict::NotRun => None,
        }
    }

    /// `(passed, counted)` contribution of this verdict to a pass rate.
    pub fn fraction(&self) -> (u8, u8) {
        match self {
            Verdict::Pass => (1, 1),
            Verdict::Skip | Verdict::NotRun => (0, 0),
            _ => (0, 1),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = UnknownVerdict;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verdict::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVerdict(s.to_string()))
    }
}
