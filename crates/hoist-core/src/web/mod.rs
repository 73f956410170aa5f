//! Embedded web server exposing the session engine over HTTP.
//!
//! The binding is a thin translation layer: each endpoint maps onto one
//! engine operation and nothing else.
//!
//! ## API Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | /api/status | Server status |
//! | POST | /api/uploads | Initialize a session |
//! | GET | /api/uploads | List sessions |
//! | GET | /api/uploads/{id} | Session status |
//! | PUT | /api/uploads/{id}/chunks/{n} | Receive a chunk |
//! | POST | /api/uploads/{id}/finalize | Assemble the output |
//! | GET | /api/uploads/{id}/download | Download the assembled file |

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, SharedState};

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::engine::SessionEngine;
use crate::error::Result;

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Bind to localhost only
    pub localhost_only: bool,
    /// Maximum request body size in bytes (chunk payload plus multipart
    /// framing)
    pub body_limit: usize,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_SERVER_PORT,
            localhost_only: false,
            body_limit: default_body_limit(crate::DEFAULT_CHUNK_SIZE),
        }
    }
}

impl WebServerConfig {
    /// Get the bind address for the server.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        if self.localhost_only {
            SocketAddr::from(([127, 0, 0, 1], self.port))
        } else {
            SocketAddr::from(([0, 0, 0, 0], self.port))
        }
    }

    /// Size the body limit for a given chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.body_limit = default_body_limit(chunk_size);
        self
    }
}

/// Chunk payload plus headroom for multipart boundaries and headers.
fn default_body_limit(chunk_size: u64) -> usize {
    usize::try_from(chunk_size).unwrap_or(usize::MAX).saturating_add(64 * 1024)
}

/// Build the API router for an engine.
#[must_use]
pub fn router(state: SharedState, body_limit: usize) -> Router {
    Router::new()
        .route("/api/status", get(handlers::get_status))
        .route(
            "/api/uploads",
            post(handlers::initialize_upload).get(handlers::list_uploads),
        )
        .route("/api/uploads/{id}", get(handlers::get_upload))
        .route(
            "/api/uploads/{id}/chunks/{chunk}",
            put(handlers::upload_chunk),
        )
        .route("/api/uploads/{id}/finalize", post(handlers::finalize_upload))
        .route("/api/uploads/{id}/download", get(handlers::download_upload))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(body_limit))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Run the web server until the process is stopped.
///
/// # Errors
///
/// Returns an error if the listener cannot bind.
pub async fn serve(engine: SessionEngine, config: WebServerConfig) -> Result<()> {
    let addr = config.bind_addr();
    let state = AppState::new(engine);
    let app = router(state, config.body_limit);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr() {
        let config = WebServerConfig {
            port: 9000,
            localhost_only: true,
            ..Default::default()
        };
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:9000");

        let open = WebServerConfig::default();
        assert_eq!(open.bind_addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_body_limit_tracks_chunk_size() {
        let config = WebServerConfig::default().with_chunk_size(1024);
        assert_eq!(config.body_limit, 1024 + 64 * 1024);
    }
}
