use std::time::Duration;

use envconfig::Envconfig;

use common_kafka::config::KafkaConfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "::")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3301")]
    pub port: u16,

    #[envconfig(default = "false")]
    pub print_sink: bool,

    // Directory scanned for dropped files; processed/ and failed/
    // subdirectories are created under it for retired files
    #[envconfig(default = "/tmp/csv-relay/spool")]
    pub spool_dir: String,

    #[envconfig(default = "5")]
    pub spool_poll_interval_seconds: u64,

    // Fixed wait after each emitted record, pacing the outbound flow
    #[envconfig(default = "1000")]
    pub emit_delay_ms: u64,

    #[envconfig(default = "csv_rows")]
    pub kafka_topic: String,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,
}

impl Config {
    pub fn emit_delay(&self) -> Duration {
        Duration::from_millis(self.emit_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.spool_poll_interval_seconds)
    }
}
