pub mod config;
pub mod context;
pub mod csv;
pub mod error;
pub mod metrics_consts;
pub mod pipeline;
pub mod prometheus;
pub mod record;
pub mod sinks;
pub mod source;
pub mod time;
