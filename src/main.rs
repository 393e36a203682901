mod config;
mod db;
mod engine;
mod handlers;
mod models;
mod router;
mod session;
mod utils;
mod ws;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{Mutex, RwLock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use db::Store;
use engine::reconciler::ScanSession;
use engine::session_log::CommandHistory;
use session::SessionManager;
use ws::Hub;

/// Application state shared across handlers
pub struct AppState {
    pub store: Store,
    pub config: Config,
    pub sessions: Arc<SessionManager>,
    /// Latest scan of each device
    pub scans: RwLock<HashMap<String, Arc<Mutex<ScanSession>>>>,
    /// Command recall history of each device
    pub histories: Mutex<HashMap<String, CommandHistory>>,
    pub ws_hub: Arc<Hub>,
}

impl AppState {
    pub async fn scan_session(&self, device_id: &str) -> Option<Arc<Mutex<ScanSession>>> {
        self.scans.read().await.get(device_id).cloned()
    }

    /// Forget per-device in-memory state (scan results and history)
    pub async fn forget_device(&self, device_id: &str) {
        self.scans.write().await.remove(device_id);
        self.histories.lock().await.remove(device_id);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ont_console=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::load();
    tracing::info!("Starting ONT Console Server");
    tracing::info!("Database: {}", cfg.db_path);
    tracing::info!("Listen: {}", cfg.listen_addr);
    if cfg.simulate_scan {
        tracing::info!("Simulated scans enabled for disconnected devices");
    }

    let store = Store::with_pool_size(&cfg.db_path, cfg.db_max_connections).await?;
    tracing::info!("Database initialized (pool_size={})", cfg.db_max_connections);

    let state = Arc::new(AppState {
        store,
        config: cfg.clone(),
        sessions: Arc::new(SessionManager::new(cfg.ssh_timeout_secs, cfg.simulate_scan)),
        scans: RwLock::new(HashMap::new()),
        histories: Mutex::new(HashMap::new()),
        ws_hub: Arc::new(Hub::new()),
    });

    let app = router::build(state.clone(), &cfg.frontend_dir);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("ONT Console listening on {}", cfg.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for device_id in state.sessions.connected_devices() {
        state.sessions.disconnect(&device_id);
    }
    tracing::info!("ONT Console shutting down");
    Ok(())
}

/// WebSocket upgrade handler
pub async fn ws_upgrade_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> axum::response::Response {
    ws::ws_handler(ws, axum::extract::State(state.ws_hub.clone())).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
