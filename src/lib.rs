//! Kernel ring-buffer change detection for test runs.
//!
//! A [`tracker::RingDiffTracker`] remembers the last kernel log it saw and
//! reports only the lines that appeared since, even after the ring buffer has
//! wrapped. [`classify::classify`] turns those lines into a stricter verdict.

pub mod classify;
pub mod config;
pub mod dmesg;
pub mod models;
pub mod runner;
pub mod tracker;

pub use classify::classify;
pub use dmesg::{DmesgError, LogSnapshot, LogSource};
pub use models::{RunSummary, Subtest, TestResult, Verdict};
pub use tracker::RingDiffTracker;
