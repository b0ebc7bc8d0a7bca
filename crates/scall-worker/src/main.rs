//! Video render worker binary.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scall_store::JobStore;
use scall_worker::{JobExecutor, PipelineContext, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("scall=info".parse().unwrap())
        .add_directive("aws_config=warn".parse().unwrap())
        .add_directive("aws_smithy_runtime=warn".parse().unwrap());

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

    info!("Starting scall-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let store = match JobStore::from_env().await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to connect to job store: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = match PipelineContext::new(config.clone(), store) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Failed to build pipeline context: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = ctx.storage.check_connectivity().await {
        warn!("Storage connectivity check failed, continuing anyway: {}", e);
    }

    let executor = Arc::new(JobExecutor::new(config, ctx));

    // Signal handler: stop claiming and drain the in-flight job
    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_executor.shutdown();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
