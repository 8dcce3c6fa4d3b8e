use async_trait::async_trait;
use common_kafka::config::KafkaConfig;
use common_kafka::kafka_producer::{create_kafka_producer, KafkaContext};
use health::HealthHandle;
use metrics::counter;
use rdkafka::producer::{DeliveryFuture, FutureProducer, FutureRecord};
use tracing::error;

use crate::error::RelayError;
use crate::metrics_consts::{KAFKA_PRODUCE_ERRORS, RECORDS_EMITTED};
use crate::sinks::RecordSink;

/// One Kafka message per record, keyed by the source stream name so all
/// rows of one stream land on the same partition and keep their order.
pub struct KafkaSink {
    producer: FutureProducer<KafkaContext>,
    topic: String,
}

impl KafkaSink {
    pub async fn new(
        config: &KafkaConfig,
        topic: String,
        liveness: HealthHandle,
    ) -> anyhow::Result<KafkaSink> {
        let producer = create_kafka_producer(config, liveness).await?;
        Ok(KafkaSink { producer, topic })
    }

    fn kafka_send(&self, source: &str, payload: &str) -> Result<DeliveryFuture, RelayError> {
        match self.producer.send_result(FutureRecord {
            topic: self.topic.as_str(),
            payload: Some(payload),
            partition: None,
            key: Some(source),
            timestamp: None,
            headers: None,
        }) {
            Ok(ack) => Ok(ack),
            Err((e, _)) => {
                counter!(KAFKA_PRODUCE_ERRORS).increment(1);
                error!("failed to enqueue record: {}", e);
                Err(RelayError::EmitFailed)
            }
        }
    }

    async fn process_ack(delivery: DeliveryFuture) -> Result<(), RelayError> {
        match delivery.await {
            Err(_) => {
                // Cancelled due to timeout while retrying
                counter!(KAFKA_PRODUCE_ERRORS).increment(1);
                error!("failed to produce to Kafka before write timeout");
                Err(RelayError::EmitFailed)
            }
            Ok(Err((err, _))) => {
                counter!(KAFKA_PRODUCE_ERRORS).increment(1);
                error!("failed to produce to Kafka: {}", err);
                Err(RelayError::EmitFailed)
            }
            Ok(Ok(_)) => {
                counter!(RECORDS_EMITTED).increment(1);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RecordSink for KafkaSink {
    async fn send(&self, source: &str, payload: String) -> Result<(), RelayError> {
        let ack = self.kafka_send(source, &payload)?;
        Self::process_ack(ack).await
    }
}
