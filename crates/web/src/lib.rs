//! Templup web server and REST API.
//!
//! Provides an Axum-based HTTP server with:
//! - Status and health endpoints
//! - Update check / package / run endpoints
//! - Customization analysis API
//! - Backup and rollback API
//! - Conflict review and resolution API
//! - Audit log API

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use templup_core::config::AppConfig;
use templup_core::db::Database;
use templup_core::orchestrator::UpdateOrchestrator;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub db: Arc<Database>,
    pub orchestrator: Arc<UpdateOrchestrator>,
    pub config: AppConfig,
}

/// The web server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server with the given dependencies.
    pub fn new(config: AppConfig, db: Arc<Database>, orchestrator: Arc<UpdateOrchestrator>) -> Self {
        let state = Arc::new(AppState {
            db,
            orchestrator,
            config,
        });
        Self { state }
    }

    /// Start the web server, listening on the given address.
    pub async fn start(self, listen_addr: &str) -> anyhow::Result<()> {
        let addr: SocketAddr = listen_addr.parse()?;

        // CORS: allow the dashboard (same origin) and localhost dev.
        // In production, restrict to the actual frontend origin.
        let cors = CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]);

        let app = Router::new()
            .merge(api::status::routes())
            .merge(api::updates::routes())
            .merge(api::customizations::routes())
            .merge(api::backups::routes())
            .merge(api::conflicts::routes())
            .merge(api::audit::routes())
            .layer(DefaultBodyLimit::max(2 * 1024 * 1024)) // 2 MB max request body
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state);

        info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
