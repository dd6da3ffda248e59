//! Ring-buffer diffing.
//!
//! The kernel log is a FIFO ring: old lines are evicted from the front while
//! new ones are appended at the back. Between two captures, the tail of the
//! earlier capture therefore reappears at the head of the later one, in full
//! if nothing wrapped, partially after a partial wrap, or not at all after a
//! complete wrap. [`new_lines_since`] finds that overlap and returns what
//! follows it.

use std::sync::Arc;

use crate::dmesg::{DmesgError, LogSnapshot, LogSource};

/// Owns the last observed snapshot and the lines that were new in it.
pub struct RingDiffTracker {
    source: Arc<dyn LogSource>,
    last: Option<LogSnapshot>,
    new_lines: Option<Vec<String>>,
}

impl RingDiffTracker {
    pub fn new(source: Arc<dyn LogSource>) -> Self {
        Self {
            source,
            last: None,
            new_lines: None,
        }
    }

    /// Lines that appeared between the two most recent refreshes.
    /// `None` until the first refresh; the first refresh always yields `[]`.
    pub fn new_lines(&self) -> Option<&[String]> {
        self.new_lines.as_deref()
    }

    /// Capture the log and diff it against the previous capture.
    ///
    /// If the capture fails the previous baseline is kept, `new_lines`
    /// becomes empty, and the error is returned so the caller can record
    /// that the kernel log was unavailable.
    pub async fn refresh(&mut self) -> Result<(), DmesgError> {
        let snapshot = match self.source.capture().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.new_lines = Some(Vec::new());
                return Err(e);
            }
        };

        let new_lines = match &self.last {
            None => Vec::new(),
            Some(last) => new_lines_since(last.lines(), snapshot.lines()).to_vec(),
        };
        log::debug!(
            "kernel log: {} lines captured, {} new",
            snapshot.len(),
            new_lines.len()
        );

        self.new_lines = Some(new_lines);
        self.last = Some(snapshot);
        Ok(())
    }
}

/// The part of `new` that follows the longest suffix of `old` that is also a
/// prefix of `new`. With no overlap at all, every line of `new` is returned.
///
/// The overlap is found with a prefix-function pass over `new ++ [sep] ++ old`,
/// so the cost is linear in the total number of lines even when the log
/// repeats the same message many times.
pub fn new_lines_since<'a>(old: &[String], new: &'a [String]) -> &'a [String] {
    let overlap = longest_overlap(old, new);
    &new[overlap..]
}

/// Length of the longest suffix of `old` that equals a prefix of `new`.
pub fn longest_overlap(old: &[String], new: &[String]) -> usize {
    if old.is_empty() || new.is_empty() {
        return 0;
    }

    // `None` is the separator: it never equals a line, so no border can
    // cross from `old` back into `new`.
    let seq: Vec<Option<&str>> = new
        .iter()
        .map(|l| Some(l.as_str()))
        .chain(std::iter::once(None))
        .chain(old.iter().map(|l| Some(l.as_str())))
        .collect();

    let mut border = vec![0usize; seq.len()];
    for i in 1..seq.len() {
        let mut k = border[i - 1];
        while k > 0 && (seq[i].is_none() || seq[i] != seq[k]) {
            k = border[k - 1];
        }
        if seq[i].is_some() && seq[i] == seq[k] {
            k += 1;
        }
        border[i] = k;
    }

    border[seq.len() - 1]
}
