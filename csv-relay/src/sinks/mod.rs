use async_trait::async_trait;

use crate::error::RelayError;

pub mod kafka;
pub mod print;

/// Destination for encoded records. `send` is called once per record in
/// row order and must not return until the record is accepted; an error
/// is fatal for the stream being relayed.
#[async_trait]
pub trait RecordSink {
    async fn send(&self, source: &str, payload: String) -> Result<(), RelayError>;
}
