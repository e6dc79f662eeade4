//! HTTP surface.
//!
//! Thin axum wiring over the library: [`routes`] maps paths to
//! [`handlers`], [`form`] reads multipart bodies, and [`Server`] binds the
//! listener and runs until Ctrl-C.

pub mod form;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use crate::config::Settings;
use crate::error::Word2HtmlError;
use crate::relay::Relay;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// The formatting HTTP server.
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(relay: Relay, settings: Arc<Settings>) -> Self {
        Self {
            state: Arc::new(AppState::new(relay, settings)),
        }
    }

    /// Build the relay from `settings` and wrap it in a server.
    pub fn from_settings(settings: Settings) -> Result<Self, Word2HtmlError> {
        let relay = Relay::from_settings(&settings)?;
        Ok(Self::new(relay, Arc::new(settings)))
    }

    pub fn addr(&self) -> String {
        self.state.settings.server.addr()
    }

    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    /// Serve until Ctrl-C, letting in-flight requests finish.
    pub async fn run(&self) -> Result<(), Word2HtmlError> {
        let addr = self.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| Word2HtmlError::Bind {
                addr: addr.clone(),
                source,
            })?;

        info!("Listening on http://{}", addr);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Word2HtmlError::Internal(format!("Server error: {}", e)))?;
        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
