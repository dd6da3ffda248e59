//! Verdict escalation based on kernel log lines that appeared during a test.

use crate::models::{TestResult, Verdict};

impl Verdict {
    /// The verdict to report when new kernel log lines were seen.
    ///
    /// Only `pass`, `warn` and `fail` are affected; everything else is
    /// already at least as informative as the kernel log would make it.
    pub fn escalate(self) -> Verdict {
        match self {
            Verdict::Pass => Verdict::DmesgWarn,
            Verdict::Warn | Verdict::Fail => Verdict::DmesgFail,
            other => other,
        }
    }
}

/// Apply kernel-log escalation to a result and attach the lines.
///
/// Every subtest is escalated against the same `new_lines`; they are not
/// split between subtests. The lines themselves are attached to the
/// top-level result whenever there are any, escalated or not.
pub fn classify(mut result: TestResult, new_lines: &[String]) -> TestResult {
    if new_lines.is_empty() {
        return result;
    }
    escalate_tree(&mut result);
    result.dmesg = new_lines.to_vec();
    result
}

fn escalate_tree(result: &mut TestResult) {
    result.verdict = result.verdict.escalate();
    for subtest in &mut result.subtests {
        escalate_tree(&mut subtest.result);
    }
}
