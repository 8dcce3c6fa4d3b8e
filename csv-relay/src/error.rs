use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("input stream holds no header line")]
    EmptyStream,

    #[error("row holds no values")]
    EmptyRow,

    #[error("failed to read input stream: {0}")]
    StreamRead(#[from] io::Error),

    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to emit record to sink")]
    EmitFailed,
}
