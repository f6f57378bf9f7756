//! Video processing worker binary.

use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vproc_catalogue::PgVideoCatalogue;
use vproc_media::{check_ffmpeg, check_ffprobe, FfmpegToolkit};
use vproc_ml_client::ServiceClient;
use vproc_queue::{ensure_topic, JobConsumer, QueueConfig};
use vproc_storage::S3Client;
use vproc_worker::{JobExecutor, JobProcessor, ProcessingContext, WorkerConfig};

#[tokio::main]
async fn main() {
    // TLS for the service client
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting vproc-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let executor = match build_executor(config).await {
        Ok(executor) => Arc::new(executor),
        Err(e) => {
            error!("Failed to start worker: {:#}", e);
            std::process::exit(1);
        }
    };

    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, finishing current job");
            signal_executor.shutdown();
        }
    });

    executor.run().await;

    info!("Worker shutdown complete");
}

/// Colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vproc=info,rdkafka=warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn build_executor(config: WorkerConfig) -> anyhow::Result<JobExecutor> {
    check_ffmpeg().context("toolchain self-check")?;
    check_ffprobe().context("toolchain self-check")?;

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("creating work dir {}", config.work_dir.display()))?;

    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("installing Prometheus exporter")?;
        info!("Serving metrics on {}", addr);
    } else {
        warn!("WORKER_METRICS_ADDR not set, metrics are not exported");
    }

    let store = S3Client::from_env().await.context("object storage")?;
    store.ensure_bucket().await.context("bucket bootstrap")?;

    let catalogue = PgVideoCatalogue::from_env().await.context("catalogue")?;
    let services = ServiceClient::from_env().context("service client")?;

    let queue_config = QueueConfig::from_env();
    ensure_topic(&queue_config).await.context("topic bootstrap")?;
    let consumer = JobConsumer::new(&queue_config).context("bus consumer")?;

    let ctx = ProcessingContext::new(
        config,
        Arc::new(store),
        Arc::new(catalogue),
        Arc::new(FfmpegToolkit::new()),
        Arc::new(services),
    );

    Ok(JobExecutor::new(Arc::new(consumer), JobProcessor::new(ctx)))
}
