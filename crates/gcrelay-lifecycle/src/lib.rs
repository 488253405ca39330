//! gcrelay Lifecycle -- match reporting and the post-game shutdown sequence.
//!
//! None -> PreShutdown -> ShuttingDown -> Terminated. Driven by the host's
//! game frame (`tick`) and by sign-out / load-failure events surfaced by the
//! interception rules.

pub mod lifecycle;
pub mod reports;

pub use lifecycle::{Lifecycle, LifecycleActions, ShutdownState};

use std::path::PathBuf;
use std::time::Duration;

use gcrelay_lobby::LobbyError;
use gcrelay_protocol::DEFAULT_PROFILE;

/// Timing and sink settings for the lifecycle.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Broadcast (TV) delay added to both shutdown bounds.
    pub broadcast_delay: Duration,
    pub min_shutdown: Duration,
    pub max_shutdown: Duration,
    /// Interval between status lines while players load.
    pub status_interval: Duration,
    /// Directory for `match_<id>.txt` when no endpoint is configured.
    pub results_dir: PathBuf,
    /// Forward scoreboard updates as live documents.
    pub live_stats: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            broadcast_delay: Duration::from_secs(DEFAULT_PROFILE.broadcast_delay_secs),
            min_shutdown: Duration::from_secs(DEFAULT_PROFILE.min_shutdown_secs),
            max_shutdown: Duration::from_secs(DEFAULT_PROFILE.max_shutdown_secs),
            status_interval: Duration::from_secs(DEFAULT_PROFILE.status_interval_secs),
            results_dir: PathBuf::from("."),
            live_stats: true,
        }
    }
}

/// Delivery of report documents to the match endpoint.
///
/// `in_flight` counts attempts submitted and not yet completed; a count
/// above zero holds shutdown back.
pub trait Delivery {
    fn has_destination(&self) -> bool;
    fn submit(&mut self, document: Vec<u8>);
    fn in_flight(&self) -> usize;
}

/// Read-only view of which player slots hold a connected client.
pub trait PlayerConnectivity {
    fn connected_player_count(&self) -> usize;
    fn is_player_connected(&self, slot: usize) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("lobby error: {0}")]
    Lobby(#[from] LobbyError),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
