pub mod process;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::classify::classify;
use crate::dmesg::{DmesgError, LogSource};
use crate::models::TestResult;
use crate::tracker::RingDiffTracker;

/// Serialization point around the kernel log.
///
/// The ring buffer is shared by the whole machine, so only one test may sit
/// between its baseline and final refresh at a time. The tracker lives behind
/// a single async mutex that is held for the whole bracketed run.
pub struct DmesgMonitor {
    tracker: Mutex<RingDiffTracker>,
    capture_timeout: Duration,
    dummy: bool,
    warned: AtomicBool,
}

impl DmesgMonitor {
    pub fn new(source: Arc<dyn LogSource>, capture_timeout: Duration) -> Self {
        let dummy = source.is_dummy();
        Self {
            tracker: Mutex::new(RingDiffTracker::new(source)),
            capture_timeout,
            dummy,
            warned: AtomicBool::new(false),
        }
    }

    /// False when results are never classified (no-op log source).
    pub fn is_active(&self) -> bool {
        !self.dummy
    }

    /// Refresh, run `test`, refresh again, and classify its result against the
    /// kernel log lines that appeared in between.
    ///
    /// If either refresh fails the result is returned unescalated, with a note
    /// in `info`. Errors from `test` itself are passed through.
    pub async fn run_bracketed<F, Fut>(&self, test: F) -> Result<TestResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TestResult>>,
    {
        let mut tracker = self.tracker.lock().await;

        let before = self.refresh(&mut tracker).await;
        let mut result = test().await?;
        let after = self.refresh(&mut tracker).await;

        match before.and(after) {
            Ok(()) => {
                let new_lines = tracker.new_lines().unwrap_or_default();
                Ok(classify(result, new_lines))
            }
            Err(e) => {
                self.report_unavailable(&e);
                result.info = Some(format!("kernel log unavailable: {e}"));
                Ok(result)
            }
        }
    }

    /// Run a command as a bracketed test.
    pub async fn run_command(
        &self,
        argv: &[String],
        limit: Option<Duration>,
    ) -> Result<TestResult> {
        self.run_bracketed(|| process::run_command(argv, limit)).await
    }

    async fn refresh(&self, tracker: &mut RingDiffTracker) -> Result<(), DmesgError> {
        tokio::time::timeout(self.capture_timeout, tracker.refresh())
            .await
            .map_err(|_| DmesgError::TimedOut(self.capture_timeout))?
    }

    fn report_unavailable(&self, e: &DmesgError) {
        if !self.warned.swap(true, Ordering::Relaxed) {
            log::warn!("kernel log unavailable, results are not being classified: {e}");
        } else {
            log::debug!("kernel log unavailable: {e}");
        }
    }
}
