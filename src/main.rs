//! task-planner - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes the goal planning API.

use task_planner::{ai_providers::ProviderSelection, api, config::Config};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_planner=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: store={:?}, database={}, gate={}",
        config.store_type,
        config.database_path.display(),
        if config.enforce_dependency_gate {
            "enforced"
        } else {
            "advisory"
        }
    );
    match &config.provider {
        ProviderSelection::Configured(provider) => {
            info!("Using AI provider: {}", provider.describe())
        }
        ProviderSelection::Unconfigured { reason } => {
            warn!("{} Goal creation will be unavailable.", reason)
        }
    }

    // Start HTTP server
    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting server on {}", addr);

    api::serve(config).await?;

    Ok(())
}
