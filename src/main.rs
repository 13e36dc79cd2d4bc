//! Membership Reconciler service
//!
//! ## Endpoints
//!
//! - `POST /webhooks/stripe` - Subscription lifecycle webhooks
//! - `GET /membership/customers/:id/status` - Live membership status
//! - `GET /membership/customers/:id/groups` - Tier groups and tier field
//! - `GET /health` - Liveness probe

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use membership_reconciler::adapters::postgres::{PostgresCustomerDirectory, PostgresGroupMembership};
use membership_reconciler::adapters::stripe::StripeBillingAdapter;
use membership_reconciler::app::{build_router, build_state, Collaborators};
use membership_reconciler::config::{AppConfig, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.server)?;

    config.validate()?;
    tracing::info!(
        environment = ?config.server.environment,
        port = config.server.port,
        database = config.database.is_some(),
        test_ping = config.payment.allow_unsigned_test_ping,
        stripe_test_mode = config.payment.is_test_mode(),
        "Configuration loaded"
    );

    let billing = Arc::new(StripeBillingAdapter::new(config.payment.stripe_config())?);

    let collaborators = match &config.database {
        Some(database) => {
            let pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .acquire_timeout(database.acquire_timeout())
                .connect(&database.url)
                .await?;
            tracing::info!("Database pool created");
            Collaborators {
                directory: Arc::new(PostgresCustomerDirectory::new(pool.clone())),
                groups: Arc::new(PostgresGroupMembership::new(pool)),
                billing,
            }
        }
        None => {
            tracing::warn!("No database configured, using in-memory customer store");
            Collaborators::in_memory(billing)
        }
    };

    let state = build_state(&config, collaborators)?;
    let app = build_router(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(server: &ServerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&server.log_level))?;
    let registry = tracing_subscriber::registry().with(filter);

    if server.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
