//! API server binary: hosts the HTTP surface, the scheduler and the
//! orchestrator run loop in one process. Multiple instances are safe; the
//! store's per-job write lease keeps writers single.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelgen_api::{create_router, ApiConfig, AppState};
use reelgen_orchestrator::{HttpAdapterFactory, Orchestrator, OrchestratorConfig};
use reelgen_providers::{CredentialStore, EnvCredentialStore};
use reelgen_scheduler::Scheduler;
use reelgen_store::{JobStore, ProjectStore, RedisProgressChannel, RedisStore, RedisStoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("reelgen=info".parse()?))
        .init();

    info!("Starting reelgen-api");

    let config = ApiConfig::from_env();
    let store_config = RedisStoreConfig::from_env();
    let progress = Arc::new(RedisProgressChannel::new(
        &store_config.redis_url,
        store_config.key_prefix.clone(),
    )?);
    let store = Arc::new(RedisStore::new(store_config)?);
    let jobs: Arc<dyn JobStore> = store.clone();
    let projects: Arc<dyn ProjectStore> = store.clone();
    let credentials: Arc<dyn CredentialStore> = Arc::new(EnvCredentialStore);

    let (scheduler, wakeups) = Scheduler::new();
    let orchestrator = Arc::new(
        Orchestrator::new(
            jobs.clone(),
            projects.clone(),
            credentials.clone(),
            Arc::new(HttpAdapterFactory),
            scheduler,
            OrchestratorConfig::from_env(),
        )
        .with_progress_sink(progress),
    );
    orchestrator.clone().spawn(wakeups);

    // Re-enter any job interrupted by the previous shutdown.
    let resumed = orchestrator.resume_all().await?;
    info!(resumed, "startup resume complete");

    let state = AppState::new(config.clone(), projects, jobs, credentials, orchestrator);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
