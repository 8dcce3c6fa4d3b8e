use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use envconfig::Envconfig;
use health::ComponentStatus;
use metrics::counter;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use csv_relay::config::Config;
use csv_relay::context::AppContext;
use csv_relay::metrics_consts::{STREAMS_COMPLETED, STREAMS_FAILED, STREAMS_RECEIVED};
use csv_relay::pipeline::RecordPipeline;
use csv_relay::prometheus::{serve, setup_metrics_routes};
use csv_relay::sinks::kafka::KafkaSink;
use csv_relay::sinks::print::PrintSink;
use csv_relay::source::spool::SpoolSource;
use csv_relay::source::{Disposition, InboundStream, StreamSource};
use csv_relay::time::SystemTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn setup_tracing() {
    let log_layer: tracing_subscriber::filter::Filtered<
        tracing_subscriber::fmt::Layer<tracing_subscriber::Registry>,
        EnvFilter,
        tracing_subscriber::Registry,
    > = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

pub async fn index() -> &'static str {
    "csv relay service"
}

fn start_health_liveness_server(config: &Config, context: Arc<AppContext>) -> JoinHandle<()> {
    let bind = format!("{}:{}", config.host, config.port);
    let router = Router::new()
        .route("/", get(index))
        .route("/_readiness", get(index))
        .route(
            "/_liveness",
            get(move || std::future::ready(context.liveness.get_status())),
        );
    let router = setup_metrics_routes(router);
    tokio::task::spawn(async move {
        serve(router, &bind)
            .await
            .expect("failed to start serving metrics");
    })
}

async fn create_pipeline(context: &Arc<AppContext>) -> anyhow::Result<RecordPipeline> {
    let config = &context.config;
    if config.print_sink {
        // Print sink is only used for local debug, don't allow a container with it to run on prod
        context
            .liveness
            .register("print_sink".to_string(), Duration::from_secs(30))
            .await
            .report_status(ComponentStatus::Unhealthy)
            .await;

        Ok(RecordPipeline::new(
            SystemTime {},
            PrintSink {},
            context.relay_liveness.clone(),
            config.emit_delay(),
        ))
    } else {
        let sink_liveness = context
            .liveness
            .register("rdkafka".to_string(), Duration::from_secs(30))
            .await;

        let sink = KafkaSink::new(&config.kafka, config.kafka_topic.clone(), sink_liveness).await?;
        Ok(RecordPipeline::new(
            SystemTime {},
            sink,
            context.relay_liveness.clone(),
            config.emit_delay(),
        ))
    }
}

async fn relay_loop(context: Arc<AppContext>, pipeline: RecordPipeline, source: SpoolSource) {
    loop {
        context.relay_liveness.report_healthy().await;

        let stream = match source.next_stream().await {
            Ok(Some(stream)) => stream,
            Ok(None) => {
                tokio::time::sleep(context.config.poll_interval()).await;
                continue;
            }
            Err(err) => {
                error!("failed to scan spool: {:?}", err);
                tokio::time::sleep(context.config.poll_interval()).await;
                continue;
            }
        };

        counter!(STREAMS_RECEIVED).increment(1);
        let InboundStream { name, size, reader } = stream;
        let disposition = match pipeline.process(&name, size, reader).await {
            Ok(summary) => {
                counter!(STREAMS_COMPLETED).increment(1);
                info!("relayed {}: {} records", name, summary.rows_emitted);
                Disposition::Processed
            }
            Err(err) => {
                counter!(STREAMS_FAILED).increment(1);
                error!("failed to relay {}: {}", name, err);
                Disposition::Failed
            }
        };

        if let Err(err) = source.retire(&name, disposition).await {
            // The file stays in the spool and will be picked up again,
            // so delivery is at-least-once when retiring fails
            error!("failed to retire {}: {:?}", name, err);
            tokio::time::sleep(context.config.poll_interval()).await;
        }
    }
}

async fn shutdown() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    info!("starting up...");

    let config = Config::init_from_env()?;
    let context = Arc::new(AppContext::new(config).await?);

    start_health_liveness_server(&context.config, context.clone());

    let source = SpoolSource::new(&context.config.spool_dir).await?;
    let pipeline = create_pipeline(&context).await?;

    info!(
        "relaying spool {} to {}",
        context.config.spool_dir,
        if context.config.print_sink {
            "print sink".to_string()
        } else {
            format!("kafka topic {}", context.config.kafka_topic)
        }
    );

    tokio::select! {
        _ = relay_loop(context, pipeline, source) => {}
        _ = shutdown() => {}
    }

    Ok(())
}
