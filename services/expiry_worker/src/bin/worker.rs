//! services/expiry_worker/src/bin/worker.rs

use expiry_worker_lib::{
    adapters::{db::DbAdapter, fcm::FcmPushAdapter},
    config::Config,
    error::WorkerError,
    scheduler::{run_daily, SweepRunner},
    web::{router, state::AppState},
};
use freshness_core::{ExpirySweepJob, PushTransport, SweepDeps, SystemClock};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), WorkerError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting expiry worker...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Push Adapter (optional) ---
    let transport: Option<Arc<dyn PushTransport>> = match &config.fcm {
        Some(fcm) => {
            let client = reqwest::Client::builder()
                .timeout(config.engine.push_timeout)
                .build()
                .map_err(|e| WorkerError::Internal(format!("Failed to build HTTP client: {}", e)))?;
            info!(project = %fcm.project_id, "FCM push delivery enabled.");
            Some(Arc::new(FcmPushAdapter::new(client, fcm)))
        }
        None => {
            warn!(
                "FCM_PROJECT_ID / FCM_ACCESS_TOKEN not set; notifications will only be recorded."
            );
            None
        }
    };

    // --- 4. Build the Sweep Job ---
    let clock = Arc::new(SystemClock);
    let deps = SweepDeps {
        candidates: db_adapter.clone(),
        ledger: db_adapter.clone(),
        notifications: db_adapter.clone(),
        households: db_adapter,
        transport,
        clock: clock.clone(),
    };
    let runner = Arc::new(SweepRunner::new(ExpirySweepJob::new(
        deps,
        config.engine.clone(),
    )));

    if config.run_on_startup {
        info!("RUN_ON_STARTUP set; running an initial sweep.");
        if let Err(e) = runner.run().await {
            error!(error = %e, "Initial expiry sweep failed");
        }
    }

    // --- 5. Start the Daily Scheduler ---
    let shutdown = CancellationToken::new();
    let scheduler = tokio::spawn(run_daily(
        runner.clone(),
        config.sweep_at,
        clock,
        shutdown.clone(),
    ));

    // --- 6. Start the Ops Server ---
    let app = router(Arc::new(AppState {
        runner,
        config: config.clone(),
    }));
    info!("Starting ops server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                error!("Failed to listen for the shutdown signal.");
            }
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = scheduler.await {
        error!("Scheduler task ended abnormally: {}", e);
    }
    info!("Expiry worker stopped.");
    Ok(())
}
