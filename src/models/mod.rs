pub mod result;
pub mod status;

pub use result::{RunSummary, Subtest, TestResult};
pub use status::{UnknownVerdict, Verdict};
