//! Fraud Scoring Service - Main Entry Point
//!
//! Loads the training artifacts, then serves the HTTP API and, when
//! configured, a NATS request/reply scoring worker.

use anyhow::{Context, Result};
use clap::Parser;
use fraud_scoring_service::{
    api,
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
    consumer::TransactionConsumer,
    metrics::{MetricsReporter, ScoringMetrics},
    models::ModelLoader,
    producer::ScorePublisher,
    service::PredictionService,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fraud-scoring-service", about = "Transaction fraud scoring service")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from_path(&cli.config)?;
    init_logging(&config.logging)?;

    info!("Starting Fraud Scoring Service");
    info!(
        threshold = config.detection.threshold,
        missing_feature_fill = ?config.detection.missing_feature_fill,
        "Configuration loaded from {}",
        cli.config.display()
    );

    // Artifacts are fatal: do not accept traffic without them
    let artifacts = ModelLoader::new(config.artifacts.onnx_threads)
        .load_all(&config.artifacts)
        .context("Failed to load model artifacts")?;
    info!(
        model = %artifacts.classifier.name(),
        features = artifacts.schema.len(),
        amount_q95 = artifacts.amount_q95.value,
        "Artifacts loaded"
    );

    let metrics = Arc::new(ScoringMetrics::new());
    let service = Arc::new(PredictionService::new(
        artifacts,
        config.detection.threshold,
        config.detection.missing_feature_fill,
        metrics.clone(),
    ));

    if config.pipeline.metrics_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
        tokio::spawn(reporter.start());
    }

    if let Some(nats) = &config.nats {
        let client = async_nats::connect(&nats.url)
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", nats.url))?;
        info!("Connected to NATS at {}", nats.url);

        let consumer = TransactionConsumer::new(client.clone(), &nats.transaction_subject);
        let publisher = ScorePublisher::new(client, &nats.score_subject);
        info!(
            workers = config.pipeline.workers,
            listen = %nats.transaction_subject,
            publish = %publisher.subject(),
            "Starting NATS scoring worker"
        );

        let service = service.clone();
        let workers = config.pipeline.workers;
        tokio::spawn(async move {
            if let Err(e) = consumer.run(service, publisher, workers).await {
                error!(error = %e, "NATS scoring worker stopped");
            }
        });
    }

    let app = api::router(service);
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("Listening on http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
