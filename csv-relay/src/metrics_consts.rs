pub const STREAMS_RECEIVED: &str = "csv_relay_streams_received_total";
pub const STREAMS_COMPLETED: &str = "csv_relay_streams_completed_total";
pub const STREAMS_FAILED: &str = "csv_relay_streams_failed_total";
pub const RECORDS_EMITTED: &str = "csv_relay_records_emitted_total";
pub const COLUMN_COUNT_MISMATCH: &str = "csv_relay_column_count_mismatch_total";
pub const KAFKA_PRODUCE_ERRORS: &str = "csv_relay_kafka_produce_errors_total";
pub const STREAM_ROWS: &str = "csv_relay_stream_rows";
