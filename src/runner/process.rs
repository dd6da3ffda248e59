use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::process::Command;

use crate::models::{TestResult, Verdict};

/// Exit code a test uses to report that it skipped itself.
pub const SKIP_EXIT_CODE: i32 = 77;

/// Guard that kills the child process (and its entire process group) on drop.
struct ChildGuard {
    child: Option<tokio::process::Child>,
    /// Process group ID saved at spawn time so we can kill the whole group.
    #[cfg(unix)]
    pgid: Option<u32>,
    /// Set once the child has been waited for. Its pid, and possibly its
    /// process group id, may then belong to an unrelated process.
    reaped: bool,
}

impl ChildGuard {
    fn new(child: tokio::process::Child) -> Self {
        #[cfg(unix)]
        let pgid = child.id();
        Self {
            child: Some(child),
            #[cfg(unix)]
            pgid,
            reaped: false,
        }
    }

    async fn wait(&mut self) -> Result<ExitStatus> {
        let child = self.child.as_mut().context("test process already reaped")?;
        let status = child.wait().await.context("failed to wait for test process")?;
        self.reaped = true;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        // Take out anything the test forked so it cannot keep writing to the
        // kernel log after the test is over.
        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
        }
        if let Some(ref mut child) = self.child {
            let _ = child.start_kill();
        }
    }
}

/// Run one test command to completion and turn its exit status into a verdict.
///
/// The test's stdout is forwarded to our stderr so that stdout stays free for
/// results. A test still running after `limit` is killed and gets `timeout`.
pub async fn run_command(argv: &[String], limit: Option<Duration>) -> Result<TestResult> {
    let (program, args) = argv.split_first().context("empty test command")?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(std::io::stderr())
        .stderr(std::io::stderr());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.as_std_mut().process_group(0);
    }

    let start = Instant::now();
    let child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn `{}`", shell_words::join(argv)))?;
    let mut guard = ChildGuard::new(child);

    let status = match limit {
        Some(limit) => tokio::time::timeout(limit, guard.wait()).await.ok(),
        None => Some(guard.wait().await),
    };
    let duration_ms = start.elapsed().as_millis() as u64;
    drop(guard);

    let mut result = match status {
        Some(status) => interpret(status?),
        None => {
            log::warn!("`{}` timed out", shell_words::join(argv));
            TestResult::new(Verdict::Timeout)
        }
    };
    result.duration_ms = Some(duration_ms);
    Ok(result)
}

fn interpret(status: ExitStatus) -> TestResult {
    let verdict = match status.code() {
        Some(0) => Verdict::Pass,
        Some(SKIP_EXIT_CODE) => Verdict::Skip,
        Some(_) => Verdict::Fail,
        None => Verdict::Crash,
    };
    TestResult {
        verdict,
        returncode: returncode(status),
        ..TestResult::default()
    }
}

/// Exit code, or the negated signal number when the test was killed.
fn returncode(status: ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(-signal);
        }
    }
    status.code()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[tokio::test]
    async fn exit_codes_map_to_verdicts() {
        let cases = [
            ("exit 0", Verdict::Pass, 0),
            ("exit 77", Verdict::Skip, 77),
            ("exit 3", Verdict::Fail, 3),
        ];
        for (script, verdict, code) in cases {
            let result = run_command(&sh(script), None).await.unwrap();
            assert_eq!(result.verdict, verdict, "{script}");
            assert_eq!(result.returncode, Some(code));
            assert!(result.duration_ms.is_some());
        }
    }

    #[tokio::test]
    async fn signal_is_a_crash() {
        let result = run_command(&sh("kill -SEGV $$"), None).await.unwrap();
        assert_eq!(result.verdict, Verdict::Crash);
        assert_eq!(result.returncode, Some(-libc::SIGSEGV));
    }

    #[tokio::test]
    async fn slow_test_times_out() {
        let result = run_command(&sh("sleep 5"), Some(Duration::from_millis(100)))
            .await
            .unwrap();
        assert_eq!(result.verdict, Verdict::Timeout);
        assert!(result.returncode.is_none());
    }

    #[tokio::test]
    async fn waited_child_is_not_signalled_on_drop() {
        let child = Command::new("sh").args(["-c", "exit 0"]).spawn().unwrap();
        let mut guard = ChildGuard::new(child);
        assert!(!guard.reaped);

        let status = guard.wait().await.unwrap();
        assert!(status.success());
        assert!(guard.reaped);
    }

    #[tokio::test]
    async fn empty_or_missing_command_is_an_error() {
        assert!(run_command(&[], None).await.is_err());
        let missing = vec!["/nonexistent/dmesg-lens-test".to_string()];
        assert!(run_command(&missing, None).await.is_err());
    }
}
