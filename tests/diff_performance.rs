use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dmesg_lens::tracker::{longest_overlap, new_lines_since};
use dmesg_lens::{DmesgError, LogSnapshot, LogSource, RingDiffTracker};

/// A diff over 7,000 lines takes well under a millisecond in release
/// builds; this leaves room for debug builds on slow CI machines.
const BUDGET: Duration = Duration::from_millis(50);

fn numbered(range: std::ops::Range<usize>) -> Vec<String> {
    range
        .map(|i| format!("[{:>5}.{:06}] dmesg-lens test {}", i / 1000, i % 1000, i))
        .collect()
}

#[test]
fn seven_thousand_line_partial_wrap_is_fast() {
    let old = numbered(0..7000);
    let new = numbered(500..7500);

    let start = Instant::now();
    let fresh = new_lines_since(&old, &new);
    let elapsed = start.elapsed();

    assert_eq!(fresh, &numbered(7000..7500)[..]);
    assert!(elapsed < BUDGET, "diff took {elapsed:?}");
}

#[test]
fn repeated_content_is_not_quadratic() {
    // Identical lines make every candidate overlap plausible.
    let old = vec!["[drm] *ERROR* flip timed out".to_string(); 7000];
    let mut new = old[1..].to_vec();
    new.push("[drm] *ERROR* flip timed out".to_string());
    new.push("[drm] recovered".to_string());

    let start = Instant::now();
    let overlap = longest_overlap(&old, &new);
    let elapsed = start.elapsed();

    assert_eq!(overlap, 7000);
    assert_eq!(&new[overlap..], ["[drm] recovered"]);
    assert!(elapsed < BUDGET, "diff took {elapsed:?}");
}

#[test]
fn complete_wrap_of_seven_thousand_lines() {
    let old = numbered(0..7000);
    let new = numbered(10_000..17_000);

    let start = Instant::now();
    let fresh = new_lines_since(&old, &new);
    let elapsed = start.elapsed();

    assert_eq!(fresh.len(), 7000);
    assert!(elapsed < BUDGET, "diff took {elapsed:?}");
}

/// Serves a full 7,000-line buffer, shifted by 500 lines on each capture.
struct WrappingLog {
    captures: AtomicUsize,
}

#[async_trait]
impl LogSource for WrappingLog {
    async fn capture(&self) -> Result<LogSnapshot, DmesgError> {
        let start = self.captures.fetch_add(1, Ordering::SeqCst) * 500;
        Ok(LogSnapshot::new(numbered(start..start + 7000)))
    }

    fn name(&self) -> &str {
        "wrapping"
    }
}

#[tokio::test]
async fn refresh_over_seven_thousand_lines_is_fast() {
    let source = Arc::new(WrappingLog {
        captures: AtomicUsize::new(0),
    });
    let mut tracker = RingDiffTracker::new(source);
    tracker.refresh().await.unwrap();

    let start = Instant::now();
    tracker.refresh().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(tracker.new_lines(), Some(&numbered(7000..7500)[..]));
    assert!(elapsed < BUDGET, "refresh took {elapsed:?}");
}
