use async_trait::async_trait;

use super::{DmesgError, LogSnapshot, LogSource};

/// Source for platforms without a kernel ring buffer. Always empty, so no
/// result is ever escalated.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyDmesg;

#[async_trait]
impl LogSource for DummyDmesg {
    async fn capture(&self) -> Result<LogSnapshot, DmesgError> {
        Ok(LogSnapshot::default())
    }

    fn name(&self) -> &str {
        "none"
    }

    fn is_dummy(&self) -> bool {
        true
    }
}
