//! Treestatus dashboard web server.
//!
//! Provides an Axum-based HTTP server with:
//! - The trees overview with bulk status updates and the recent changes stack
//! - Per-tree history pages with editable log entries
//! - A heartbeat endpoint
//!
//! All state lives in the remote Treestatus API; handlers only translate
//! between HTML forms and API calls.

pub mod flash;
pub mod render;
pub mod routes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use treestatus_core::api::StatusApi;
use treestatus_core::config::AppConfig;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub config: AppConfig,
    /// The Treestatus backend, chosen at startup.
    pub api: Arc<dyn StatusApi>,
}

/// Build the full router around the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::trees::routes())
        .merge(routes::changes::routes())
        .merge(routes::status::routes())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The web server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: AppConfig, api: Arc<dyn StatusApi>) -> Self {
        Self {
            state: Arc::new(AppState { config, api }),
        }
    }

    /// Serve on `listen_addr` until `shutdown` resolves.
    pub async fn start<F>(self, listen_addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listen_addr.parse()?;
        let app = build_router(self.state);

        info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("web server stopped");
        Ok(())
    }
}
