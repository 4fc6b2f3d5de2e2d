//! Subscription lifecycle server.
//!
//! Loads configuration, connects to PostgreSQL, loads the trust roots and the
//! plan catalog, and serves the notification router until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subscription_lifecycle::adapters::http::{webhook_router, WebhookAppState};
use subscription_lifecycle::adapters::postgres::{
    load_plan_catalog, PostgresNotificationLog, PostgresSubscriptionRepository,
};
use subscription_lifecycle::config::AppConfig;
use subscription_lifecycle::domain::notification::{SignedPayloadVerifier, TrustStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config);
    tracing::info!(
        "Starting subscription-lifecycle v{} ({:?})",
        env!("CARGO_PKG_VERSION"),
        config.server.environment
    );

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection established");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Database migrations applied");
    }

    let trust = TrustStore::load(&config.notifications.root_certificate_paths())
        .context("Failed to load trusted root certificates")?;
    for fingerprint in trust.fingerprints() {
        tracing::info!(sha256 = %fingerprint, "Trusting root certificate");
    }

    let catalog = load_plan_catalog(&pool)
        .await
        .context("Failed to load plan catalog")?;
    if catalog.is_empty() {
        tracing::warn!("Plan catalog is empty; every product will be unresolvable");
    } else {
        tracing::info!(plans = catalog.len(), "Plan catalog loaded");
    }

    let state = WebhookAppState {
        verifier: Arc::new(SignedPayloadVerifier::new(
            trust,
            config.notifications.bundle_id.clone(),
            config.notifications.environment,
        )),
        plan_catalog: Arc::new(catalog),
        subscription_repository: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        notification_log: Arc::new(PostgresNotificationLog::new(pool.clone())),
        lifecycle_policy: config.lifecycle.policy(),
        write_timeout: config.lifecycle.write_timeout(),
        health: config.lifecycle.health_settings(),
    };

    let app = webhook_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        bundle_id = %config.notifications.bundle_id,
        environment = %config.notifications.environment,
        "Listening on {}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
