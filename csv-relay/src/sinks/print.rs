use async_trait::async_trait;
use metrics::counter;
use tracing::info;

use crate::error::RelayError;
use crate::metrics_consts::RECORDS_EMITTED;
use crate::sinks::RecordSink;

pub struct PrintSink {}

#[async_trait]
impl RecordSink for PrintSink {
    async fn send(&self, source: &str, payload: String) -> Result<(), RelayError> {
        info!("record from {}: {}", source, payload);
        counter!(RECORDS_EMITTED).increment(1);

        Ok(())
    }
}
