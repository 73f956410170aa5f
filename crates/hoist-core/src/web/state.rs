//! Shared state for the web API.

use std::sync::Arc;
use std::time::Instant;

use crate::engine::SessionEngine;

/// State shared across all request handlers.
#[derive(Debug)]
pub struct AppState {
    /// The session engine all requests flow into
    pub engine: SessionEngine,
    /// When the server started
    pub started_at: Instant,
}

/// Cheaply cloneable handle to the app state.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wrap an engine for the router.
    #[must_use]
    pub fn new(engine: SessionEngine) -> SharedState {
        Arc::new(Self {
            engine,
            started_at: Instant::now(),
        })
    }
}
