use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_json_diff::assert_json_eq;
use async_trait::async_trait;
use serde_json::{json, Value};

use csv_relay::error::RelayError;
use csv_relay::pipeline::{RecordPipeline, StreamSummary};
use csv_relay::sinks::RecordSink;
use csv_relay::time::TimeSource;
use health::HealthRegistry;

static STAMP: &str = "2023-10-05T12:00:00Z";

#[derive(Clone)]
pub struct FixedTime {
    pub time: String,
}

impl TimeSource for FixedTime {
    fn date_stamp(&self) -> String {
        self.time.to_string()
    }
}

#[derive(Clone, Default)]
struct MemorySink {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemorySink {
    fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    fn payloads(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn send(&self, source: &str, payload: String) -> Result<(), RelayError> {
        self.messages
            .lock()
            .unwrap()
            .push((source.to_string(), payload));
        Ok(())
    }
}

async fn pipeline_on(sink: MemorySink, emit_delay: Duration) -> RecordPipeline {
    let registry = HealthRegistry::new("liveness");
    let liveness = registry
        .register("relay_loop".to_string(), Duration::from_secs(30))
        .await;
    RecordPipeline::new(
        FixedTime {
            time: STAMP.to_string(),
        },
        sink,
        liveness,
        emit_delay,
    )
}

async fn run(input: &str) -> (Result<StreamSummary, RelayError>, MemorySink) {
    let sink = MemorySink::default();
    let pipeline = pipeline_on(sink.clone(), Duration::ZERO).await;
    let result = pipeline
        .process("test.csv", input.len() as u64, input.as_bytes())
        .await;
    (result, sink)
}

#[tokio::test]
async fn emits_one_message_per_row_keyed_by_header() {
    let input = "a,b,c\n1,2,3\n4,5,6\n";
    let (result, sink) = run(input).await;

    assert_eq!(result.unwrap(), StreamSummary { rows_emitted: 2 });
    assert_eq!(sink.len(), 2);

    // Every message is tagged with the source stream name
    for (source, _) in sink.messages() {
        assert_eq!(source, "test.csv");
    }

    let payloads = sink.payloads();
    assert_json_eq!(
        serde_json::from_str::<Value>(&payloads[0]).unwrap(),
        json!({"functionDateStamp": STAMP, "a": "1", "b": "2", "c": "3"})
    );
    assert_json_eq!(
        serde_json::from_str::<Value>(&payloads[1]).unwrap(),
        json!({"functionDateStamp": STAMP, "a": "4", "b": "5", "c": "6"})
    );
}

#[tokio::test]
async fn fields_follow_header_order_with_stamp_first() {
    let input = "zeta,alpha\n1,2\n";
    let (result, sink) = run(input).await;

    result.unwrap();
    // Exact text: stamp first, then header order, all values as strings
    assert_eq!(
        sink.payloads()[0],
        r#"{"functionDateStamp":"2023-10-05T12:00:00Z","zeta":"1","alpha":"2"}"#
    );
}

#[tokio::test]
async fn values_are_never_type_coerced() {
    let input = "count,flag\n0042,true\n";
    let (result, sink) = run(input).await;

    result.unwrap();
    let decoded: Value = serde_json::from_str(&sink.payloads()[0]).unwrap();
    assert_eq!(decoded["count"], "0042");
    assert_eq!(decoded["flag"], "true");
}

#[tokio::test]
async fn shorter_row_omits_trailing_header_fields() {
    let input = "a,b,c\n1,2\n";
    let (result, sink) = run(input).await;

    assert_eq!(result.unwrap(), StreamSummary { rows_emitted: 1 });
    let decoded: Value = serde_json::from_str(&sink.payloads()[0]).unwrap();
    assert_json_eq!(
        decoded,
        json!({"functionDateStamp": STAMP, "a": "1", "b": "2"})
    );
}

#[tokio::test]
async fn longer_row_drops_extra_values() {
    let input = "a,b\n1,2,3\n";
    let (result, sink) = run(input).await;

    assert_eq!(result.unwrap(), StreamSummary { rows_emitted: 1 });
    let decoded: Value = serde_json::from_str(&sink.payloads()[0]).unwrap();
    assert_json_eq!(
        decoded,
        json!({"functionDateStamp": STAMP, "a": "1", "b": "2"})
    );
}

#[tokio::test]
async fn empty_stream_fails_and_emits_nothing() {
    let (result, sink) = run("").await;

    match result {
        Err(RelayError::EmptyStream) => {}
        other => panic!("expected EmptyStream, got {other:?}"),
    }
    assert_eq!(sink.len(), 0);
}

#[tokio::test]
async fn header_only_stream_completes_with_zero_rows() {
    let (result, sink) = run("a,b,c\n").await;

    assert_eq!(result.unwrap(), StreamSummary { rows_emitted: 0 });
    assert_eq!(sink.len(), 0);

    // Same without a trailing terminator
    let (result, sink) = run("a,b,c").await;
    assert_eq!(result.unwrap(), StreamSummary { rows_emitted: 0 });
    assert_eq!(sink.len(), 0);
}

#[tokio::test]
async fn paces_emissions_and_keeps_row_order() {
    let input = "a\n1\n2\n3\n";
    let sink = MemorySink::default();
    let pipeline = pipeline_on(sink.clone(), Duration::from_millis(100)).await;

    let start = tokio::time::Instant::now();
    let summary = pipeline
        .process("test.csv", input.len() as u64, input.as_bytes())
        .await
        .unwrap();

    assert_eq!(summary.rows_emitted, 3);
    // Three sends with a delay after each: at minimum the two gaps
    // between successive sends must have elapsed
    assert!(
        start.elapsed() >= Duration::from_millis(200),
        "emission finished too fast: {:?}",
        start.elapsed()
    );

    let values: Vec<String> = sink
        .payloads()
        .iter()
        .map(|payload| {
            let decoded: Value = serde_json::from_str(payload).unwrap();
            decoded["a"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(values, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn special_characters_round_trip_through_encoding() {
    let input = "q,w\nhe said \"hi\",back\\slash\n";
    let (result, sink) = run(input).await;

    result.unwrap();
    let payload = &sink.payloads()[0];
    // The quote is escaped on the wire
    assert!(payload.contains(r#"he said \"hi\""#), "payload: {payload}");

    let decoded: Value = serde_json::from_str(payload).unwrap();
    assert_eq!(decoded["q"], "he said \"hi\"");
    assert_eq!(decoded["w"], "back\\slash");
}

#[tokio::test]
async fn blank_data_line_emits_a_single_empty_field() {
    let input = "a,b\n\n";
    let (result, sink) = run(input).await;

    assert_eq!(result.unwrap(), StreamSummary { rows_emitted: 1 });
    assert_eq!(
        sink.payloads()[0],
        r#"{"functionDateStamp":"2023-10-05T12:00:00Z","a":""}"#
    );
}

#[tokio::test]
async fn invalid_utf8_aborts_the_stream() {
    let input: &[u8] = b"a,b\n1,2\n\xff\xfe,3\n";
    let sink = MemorySink::default();
    let pipeline = pipeline_on(sink.clone(), Duration::ZERO).await;

    match pipeline.process("test.csv", input.len() as u64, input).await {
        Err(RelayError::StreamRead(_)) => {}
        other => panic!("expected StreamRead, got {other:?}"),
    }

    // The row before the bad bytes was already relayed and stays relayed
    assert_eq!(sink.len(), 1);
    assert_json_eq!(
        serde_json::from_str::<Value>(&sink.payloads()[0]).unwrap(),
        json!({"functionDateStamp": STAMP, "a": "1", "b": "2"})
    );
}

#[tokio::test]
async fn crlf_input_parses_like_lf_input() {
    let input = "a,b\r\n1,2\r\n";
    let (result, sink) = run(input).await;

    assert_eq!(result.unwrap(), StreamSummary { rows_emitted: 1 });
    assert_json_eq!(
        serde_json::from_str::<Value>(&sink.payloads()[0]).unwrap(),
        json!({"functionDateStamp": STAMP, "a": "1", "b": "2"})
    );
}

#[tokio::test]
async fn sink_failure_aborts_the_stream() {
    struct FailingSink {
        delivered: Arc<Mutex<Vec<String>>>,
        fail_after: usize,
    }

    #[async_trait]
    impl RecordSink for FailingSink {
        async fn send(&self, _source: &str, payload: String) -> Result<(), RelayError> {
            let mut delivered = self.delivered.lock().unwrap();
            if delivered.len() >= self.fail_after {
                return Err(RelayError::EmitFailed);
            }
            delivered.push(payload);
            Ok(())
        }
    }

    let delivered = Arc::new(Mutex::new(vec![]));
    let registry = HealthRegistry::new("liveness");
    let liveness = registry
        .register("relay_loop".to_string(), Duration::from_secs(30))
        .await;
    let pipeline = RecordPipeline::new(
        FixedTime {
            time: STAMP.to_string(),
        },
        FailingSink {
            delivered: delivered.clone(),
            fail_after: 2,
        },
        liveness,
        Duration::ZERO,
    );

    let input = "a\n1\n2\n3\n4\n";
    match pipeline
        .process("test.csv", input.len() as u64, input.as_bytes())
        .await
    {
        Err(RelayError::EmitFailed) => {}
        other => panic!("expected EmitFailed, got {other:?}"),
    }

    // Rows sent before the failure stay sent, later rows never go out
    assert_eq!(delivered.lock().unwrap().len(), 2);
}
