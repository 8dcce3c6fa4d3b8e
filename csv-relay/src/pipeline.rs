use std::sync::Arc;
use std::time::Duration;

use health::HealthHandle;
use metrics::{counter, histogram};
use tokio::io::AsyncBufRead;
use tracing::{debug, info, warn};

use crate::csv::CsvStream;
use crate::error::RelayError;
use crate::metrics_consts::{COLUMN_COUNT_MISMATCH, STREAM_ROWS};
use crate::record::Record;
use crate::sinks::RecordSink;
use crate::time::TimeSource;

/// Result of a completed run over one input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub rows_emitted: u64,
}

/// Drives one input stream end to end: read the header, then per row
/// build a record, encode it and send it to the sink, waiting a fixed
/// delay after each send. Any error aborts the stream; rows already
/// sent stay sent, the caller decides whether to replay the stream.
pub struct RecordPipeline {
    sink: Arc<dyn RecordSink + Send + Sync>,
    timesource: Arc<dyn TimeSource + Send + Sync>,
    liveness: HealthHandle,
    emit_delay: Duration,
}

impl RecordPipeline {
    pub fn new<TZ, S>(timesource: TZ, sink: S, liveness: HealthHandle, emit_delay: Duration) -> Self
    where
        TZ: TimeSource + Send + Sync + 'static,
        S: RecordSink + Send + Sync + 'static,
    {
        RecordPipeline {
            sink: Arc::new(sink),
            timesource: Arc::new(timesource),
            liveness,
            emit_delay,
        }
    }

    pub async fn process<R>(
        &self,
        name: &str,
        size: u64,
        reader: R,
    ) -> Result<StreamSummary, RelayError>
    where
        R: AsyncBufRead + Unpin,
    {
        info!("processing stream {} ({} bytes)", name, size);

        let mut stream = CsvStream::new(reader);
        let header = stream.read_header().await?;
        info!("parsed header with {} fields from {}", header.len(), name);

        let mut rows_emitted: u64 = 0;
        while let Some(row) = stream.next_row().await? {
            // Long streams emit for a while, keep the liveness probe green
            self.liveness.report_healthy().await;
            debug!("read row: {:?}", row);

            if row.len() != header.len() {
                counter!(COLUMN_COUNT_MISMATCH).increment(1);
                warn!(
                    "row {} of {} has {} values for {} header fields, mapping positionally",
                    rows_emitted + 1,
                    name,
                    row.len(),
                    header.len()
                );
            }

            let record = Record::from_row(&header, row, self.timesource.date_stamp())?;
            let payload = record.to_json()?;
            self.sink.send(name, payload).await?;
            rows_emitted += 1;
            debug!("emitted record {} of {}", rows_emitted, name);

            if !self.emit_delay.is_zero() {
                tokio::time::sleep(self.emit_delay).await;
            }
        }

        histogram!(STREAM_ROWS).record(rows_emitted as f64);
        info!("completed stream {}: {} records emitted", name, rows_emitted);
        Ok(StreamSummary { rows_emitted })
    }
}
