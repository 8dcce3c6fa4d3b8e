use std::pin::Pin;

use anyhow::Error;
use async_trait::async_trait;
use tokio::io::AsyncBufRead;

pub mod spool;

/// Boxed reader over one pending input stream.
pub type StreamReader = Pin<Box<dyn AsyncBufRead + Send>>;

/// One pending input stream: its identifier, declared size in bytes
/// (observability only) and its contents.
pub struct InboundStream {
    pub name: String,
    pub size: u64,
    pub reader: StreamReader,
}

/// What to do with a stream once its run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Processed,
    Failed,
}

/// Supplier of pending input streams. `next_stream` hands out the next
/// pending stream, or `None` when nothing is waiting; `retire`
/// acknowledges a finished run so the stream is not handed out again.
#[async_trait]
pub trait StreamSource {
    async fn next_stream(&self) -> Result<Option<InboundStream>, Error>;
    async fn retire(&self, name: &str, disposition: Disposition) -> Result<(), Error>;
}
