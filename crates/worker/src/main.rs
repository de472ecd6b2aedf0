//! Order worker entry point.

use std::sync::Arc;

use domain::OrderCommandService;
use sqlx::postgres::PgPoolOptions;
use store::PgStore;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use worker::config::Config;
use worker::kafka::{KafkaCommandSource, KafkaEventPublisher};
use worker::source::run_commands;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    // 2. Install the Prometheus recorder with its built-in listener
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(config.metrics_addr)
        .install()
        .expect("failed to install Prometheus recorder");

    // 3. Connect to the database and bring the schema up to date
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    let store = PgStore::new(pool);
    store.run_migrations().await.expect("migrations failed");

    // 4. Wire the command service
    let publisher =
        KafkaEventPublisher::from_config(&config).expect("failed to create Kafka producer");
    let service = OrderCommandService::new(Arc::new(store), Arc::new(publisher));

    // 5. Subscribe to the command stream and run until shutdown
    let source =
        KafkaCommandSource::from_config(&config).expect("failed to create Kafka consumer");

    tracing::info!(topic = %config.commands_topic, "order worker started");

    tokio::select! {
        result = run_commands(source, &service) => {
            if let Err(error) = result {
                tracing::error!(%error, "command stream failed");
            }
        }
        () = shutdown_signal() => {}
    }

    tracing::info!("order worker shut down");
}
