use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>, frontend_dir: &str) -> Router {
    Router::new()
        .route("/api/health", get(handlers::healthcheck))
        // Device routes
        .route(
            "/api/devices",
            get(handlers::devices::list_devices).post(handlers::devices::create_device),
        )
        .route(
            "/api/devices/:id",
            get(handlers::devices::get_device)
                .put(handlers::devices::update_device)
                .delete(handlers::devices::delete_device),
        )
        .route("/api/devices/:id/connect", post(handlers::devices::connect_device))
        .route("/api/devices/:id/disconnect", post(handlers::devices::disconnect_device))
        .route("/api/devices/:id/status", get(handlers::devices::device_status))
        // ONT inventory routes
        .route(
            "/api/devices/:id/onts",
            get(handlers::onts::list_onts).post(handlers::onts::create_ont),
        )
        .route("/api/devices/:id/onts/next-id", get(handlers::onts::next_ont_id))
        .route("/api/onts/:id", axum::routing::delete(handlers::onts::delete_ont))
        .route("/api/onts/:id/status", put(handlers::onts::update_ont_status))
        // Detection routes
        .route("/api/devices/:id/scan", post(handlers::detection::scan_device))
        .route("/api/devices/:id/detected", get(handlers::detection::list_detected))
        .route(
            "/api/devices/:id/detected/:serial/confirm",
            post(handlers::detection::confirm_detected),
        )
        // Terminal routes
        .route("/api/devices/:id/terminal", post(handlers::terminal::send_command))
        .route("/api/devices/:id/terminal/history/back", post(handlers::terminal::history_back))
        .route(
            "/api/devices/:id/terminal/history/forward",
            post(handlers::terminal::history_forward),
        )
        .route(
            "/api/devices/:id/logs",
            get(handlers::terminal::list_logs).delete(handlers::terminal::clear_logs),
        )
        .route("/api/devices/:id/logs/export", get(handlers::terminal::export_logs))
        // WebSocket route
        .route("/api/ws", get(crate::ws_upgrade_handler))
        // Static files (frontend)
        .nest_service("/assets", ServeDir::new(format!("{}/assets", frontend_dir)))
        .fallback_service(ServeDir::new(frontend_dir).fallback(
            tower_http::services::ServeFile::new(format!("{}/index.html", frontend_dir)),
        ))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
