//! Orders API server entry point.

use std::sync::Arc;

use common::ServiceToken;
use customers::HttpCustomerDirectory;
use idempotency::{IdempotencyCoordinator, PostgresIdempotencyStore};
use ledger::{OrderService, PostgresLedger};
use orders_api::config::Config;
use orders_api::{AppState, create_app};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

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
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::raw_sql(include_str!("../../../migrations/001_create_ledger_tables.sql"))
        .execute(&pool)
        .await
        .expect("failed to run migrations");
    sqlx::raw_sql(include_str!("../../../migrations/002_create_idempotency_keys.sql"))
        .execute(&pool)
        .await
        .expect("failed to run migrations");

    let token = ServiceToken::new(config.internal_token.clone());
    let directory = HttpCustomerDirectory::new(config.customers_api_url.clone(), token.clone())
        .expect("failed to build customer directory client");

    let state = Arc::new(AppState {
        service: OrderService::new(PostgresLedger::new(pool.clone()), directory),
        coordinator: IdempotencyCoordinator::new(PostgresIdempotencyStore::new(pool)),
    });
    let app = create_app(state, token, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting orders-api");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
