//! Timer Keeper - a local daemon for named, categorized countdown timers
//!
//! This is the main entry point for the timer-keeper application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use timer_keeper::{
    api::create_router,
    config::Config,
    persistence::{JsonFileStore, KeyValueStore, MemoryStore, PersistenceGateway},
    state::AppState,
    tasks::{persistence_writer_task, tick_scheduler_task},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("timer_keeper={},tower_http=info", config.log_level()))
        .init();

    info!("Starting timer-keeper server v{}", env!("CARGO_PKG_VERSION"));
    let (medium, storage): (Arc<dyn KeyValueStore>, String) = if config.in_memory {
        (Arc::new(MemoryStore::new()), "memory".to_string())
    } else {
        let file = JsonFileStore::new(&config.data_file);
        let path = file.path().display().to_string();
        (Arc::new(file), path)
    };
    info!("Configuration: host={}, port={}, storage={}", config.host, config.port, storage);

    // Load persisted timers; corrupt data starts an empty store
    let state = Arc::new(AppState::init(PersistenceGateway::new(medium)));

    // Start the background tasks
    let writer = tokio::spawn(persistence_writer_task(Arc::clone(&state)));
    tokio::spawn(tick_scheduler_task(Arc::clone(&state)));

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /timers                         - List timers");
    info!("  POST   /timers                         - Create a timer");
    info!("  GET    /timers/:id                     - Get one timer");
    info!("  PATCH  /timers/:id                     - Rename or re-categorize");
    info!("  DELETE /timers/:id                     - Delete a timer");
    info!("  POST   /timers/:id/:action             - start | pause | reset");
    info!("  GET    /categories                     - Category rollups");
    info!("  GET    /categories/available           - Suggested categories");
    info!("  POST   /categories/:category/:action   - Bulk start | pause | reset");
    info!("  POST   /reload                         - Reload from storage");
    info!("  GET    /events                         - Completion event stream");
    info!("  GET    /status                         - Store status");
    info!("  GET    /health                         - Health check");

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

    // Let the writer drain so nothing since the last background save is lost
    state.stop_writer();
    if let Err(e) = writer.await {
        tracing::error!("Persistence writer task failed: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}
