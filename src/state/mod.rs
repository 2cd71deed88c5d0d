//! Shared application state and the match lifecycle core.

pub mod game;
pub mod registry;
pub mod scoring;
pub mod state_machine;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::{catalog::Catalog, config::AppConfig, state::registry::MatchRegistry};

/// Cheaply cloneable handle to the process-wide state.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a connected player.
pub struct PlayerConnection {
    /// Player identifier presented at join time.
    pub id: String,
    /// Display name shown to the opponent.
    pub name: String,
    /// Optional avatar reference shown to the opponent.
    pub photo_url: Option<String>,
    /// Sender feeding the connection's writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state: the match registry plus the live connections.
pub struct AppState {
    config: AppConfig,
    registry: MatchRegistry,
    connections: DashMap<String, PlayerConnection>,
}

impl AppState {
    /// Construct the shared state wrapped in an [`Arc`] so it can be cloned
    /// cheaply into handlers and background tasks.
    pub fn new(config: AppConfig, catalog: Catalog) -> SharedState {
        let registry = MatchRegistry::new(
            Arc::new(catalog),
            config.rounds_per_match,
            config.round_time_limit_secs,
        );
        Arc::new(Self {
            config,
            registry,
            connections: DashMap::new(),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The match lifecycle core.
    pub fn registry(&self) -> &MatchRegistry {
        &self.registry
    }

    /// Registry of active player sockets keyed by player identifier.
    pub fn connections(&self) -> &DashMap<String, PlayerConnection> {
        &self.connections
    }
}
