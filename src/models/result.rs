use serde::{Deserialize, Serialize};

use super::status::Verdict;

/// Result record for one test execution, after kernel-log classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returncode: Option<i32>,
    /// Kernel log lines that appeared while the test ran.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dmesg: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtests: Vec<Subtest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtest {
    pub name: String,
    pub result: TestResult,
}

impl TestResult {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            ..Self::default()
        }
    }

    pub fn with_subtest(mut self, name: impl Into<String>, result: TestResult) -> Self {
        self.subtests.push(Subtest {
            name: name.into(),
            result,
        });
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub counted: usize,
    pub escalated: usize,
    pub skipped: usize,
    pub duration: u64,
    /// Most severe ranked verdict seen so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worst: Option<Verdict>,
}

impl RunSummary {
    /// Fold one classified result into the summary. `raw` is the verdict
    /// the test reported before kernel-log classification.
    pub fn record(&mut self, raw: Verdict, result: &TestResult) {
        let (passed, counted) = result.verdict.fraction();
        self.total += 1;
        self.passed += passed as usize;
        self.counted += counted as usize;
        if counted == 0 {
            self.skipped += 1;
        }
        if raw != result.verdict {
            self.escalated += 1;
        }
        self.duration += result.duration_ms.unwrap_or(0);
        if let Some(severity) = result.verdict.severity()
            && self.worst.and_then(|w| w.severity()).is_none_or(|w| severity > w)
        {
            self.worst = Some(result.verdict);
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.counted == 0 {
            return 0.0;
        }
        self.passed as f64 / self.counted as f64
    }
}
