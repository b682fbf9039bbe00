//! Site Lockdown - Per-domain unblock, interrupt and lockdown timers
//! 
//! This is the main entry point for the site-lockdown service.

use std::sync::Arc;
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use site_lockdown::{
    api::create_router,
    config::Config,
    dispatch::PolicyReactor,
    state::{AppState, SystemClock},
    store::{MemoryStore, SiteStore},
    tasks::wake_up_timer_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("site_lockdown={},tower_http=info", config.log_level()))
        .init();

    info!("Starting site-lockdown server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, block_page={}",
          config.host, config.port, config.block_page_url());

    let store: Arc<dyn SiteStore> = match &config.sites {
        Some(path) => Arc::new(
            MemoryStore::load_json(path)
                .with_context(|| format!("failed to load sites from {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };

    let reactor = PolicyReactor::new(&config.block_page_url())
        .context("invalid block page url")?;

    // Create application state
    let state = Arc::new(AppState::new(
        config.port,
        config.host.clone(),
        store,
        reactor,
        Arc::new(SystemClock),
    ));

    // Start the wake-up timer background task
    let timer_state = Arc::clone(&state);
    tokio::spawn(async move {
        wake_up_timer_task(timer_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /navigate      - Apply a tab navigation");
    info!("  POST /sites         - Register or reset a site");
    info!("  GET  /sites         - List sites with their current state");
    info!("  GET  /sites/:domain - Show one site");
    info!("  GET  /blocked       - Describe a blocked URL");
    info!("  GET  /status        - Check active domain and pending wake-up");
    info!("  GET  /health        - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
