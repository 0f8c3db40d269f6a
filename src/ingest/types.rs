// src/ingest/types.rs
use anyhow::Result;

use crate::signal::RawSignal;

/// Anything that can hand over a batch of unvalidated signals.
#[async_trait::async_trait]
pub trait SignalSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawSignal>>;
    fn name(&self) -> &'static str;
}
