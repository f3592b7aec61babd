use crate::error::Result;
use crate::metrics::values::ReconciledMetrics;
use async_trait::async_trait;

pub mod console;
pub mod json;

/// Sink for reconciled metric sets, one write per successful poll tick.
#[async_trait]
pub trait OutputHandler: Send + Sync {
    async fn write(&mut self, metrics: &ReconciledMetrics) -> Result<()>;
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
