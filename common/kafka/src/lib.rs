pub mod config;
pub mod kafka_producer;
