use std::sync::Arc;

use gd_core::clock::Clock;
use gd_core::types::Timestamp;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Immutable after startup; cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub pool: gd_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Source of `now` for every time-dependent pipeline call.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}
