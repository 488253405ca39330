//! Configuration types for gcrelay-node.
//! Parsed from gcrelay.toml.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use gcrelay_lifecycle::LifecycleConfig;
use gcrelay_lobby::{CustomConfig, LobbySettings, Series};
use gcrelay_protocol::{SteamId, DEFAULT_PROFILE};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub relay: RelaySection,
    #[serde(default)]
    pub lobby: LobbySection,
    #[serde(default)]
    pub lifecycle: LifecycleSection,
    #[serde(default)]
    pub delivery: DeliverySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySection {
    /// Match endpoint. Empty means results are written to `results_dir`.
    #[serde(default)]
    pub match_post_url: String,
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    /// Server config executed once, on the first coordinator welcome.
    pub exec_config: Option<String>,
    #[serde(default = "default_true")]
    pub live_stats: bool,
    #[serde(default)]
    pub server_ip: String,
    #[serde(default)]
    pub server_port: u16,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            match_post_url: String::new(),
            results_dir: default_results_dir(),
            exec_config: None,
            live_stats: true,
            server_ip: String::new(),
            server_port: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub steam_id: SteamId,
    pub name: String,
    pub hero: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbySection {
    #[serde(default)]
    pub match_id: u64,
    #[serde(default = "default_game_mode")]
    pub game_mode: u32,
    #[serde(default = "default_lobby_type")]
    pub lobby_type: u32,
    #[serde(default)]
    pub series: Series,
    #[serde(default)]
    pub radiant: Vec<PlayerEntry>,
    #[serde(default)]
    pub dire: Vec<PlayerEntry>,
    #[serde(default)]
    pub spectators: Vec<PlayerEntry>,
    #[serde(default)]
    pub custom: CustomConfig,
}

impl Default for LobbySection {
    fn default() -> Self {
        Self {
            match_id: 0,
            game_mode: default_game_mode(),
            lobby_type: default_lobby_type(),
            series: Series::default(),
            radiant: Vec::new(),
            dire: Vec::new(),
            spectators: Vec::new(),
            custom: CustomConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSection {
    #[serde(default = "default_broadcast_delay")]
    pub broadcast_delay_secs: u64,
    #[serde(default = "default_min_shutdown")]
    pub min_shutdown_secs: u64,
    #[serde(default = "default_max_shutdown")]
    pub max_shutdown_secs: u64,
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,
}

impl Default for LifecycleSection {
    fn default() -> Self {
        Self {
            broadcast_delay_secs: default_broadcast_delay(),
            min_shutdown_secs: default_min_shutdown(),
            max_shutdown_secs: default_max_shutdown(),
            status_interval_secs: default_status_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySection {
    /// Attempts per document. 0 retries until the endpoint accepts.
    #[serde(default)]
    pub max_attempts: u32,
    /// Pause before a resubmission. 0 resubmits immediately.
    #[serde(default)]
    pub retry_delay_ms: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            retry_delay_ms: 0,
            timeout_secs: default_timeout(),
        }
    }
}

// Default value functions
fn default_results_dir() -> String {
    ".".into()
}
fn default_true() -> bool {
    true
}
fn default_game_mode() -> u32 {
    LobbySettings::default().game_mode
}
fn default_lobby_type() -> u32 {
    LobbySettings::default().lobby_type
}
fn default_broadcast_delay() -> u64 {
    DEFAULT_PROFILE.broadcast_delay_secs
}
fn default_min_shutdown() -> u64 {
    DEFAULT_PROFILE.min_shutdown_secs
}
fn default_max_shutdown() -> u64 {
    DEFAULT_PROFILE.max_shutdown_secs
}
fn default_status_interval() -> u64 {
    DEFAULT_PROFILE.status_interval_secs
}
fn default_timeout() -> u64 {
    30
}

impl RelayConfig {
    /// Load config from file, or defaults if missing.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: RelayConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Sanity checks that toml parsing cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        let lc = &self.lifecycle;
        if lc.min_shutdown_secs > lc.max_shutdown_secs {
            anyhow::bail!(
                "lifecycle.min_shutdown_secs ({}) exceeds max_shutdown_secs ({})",
                lc.min_shutdown_secs,
                lc.max_shutdown_secs
            );
        }
        if !self.relay.match_post_url.is_empty() {
            reqwest::Url::parse(&self.relay.match_post_url)?;
        }
        Ok(())
    }

    pub fn lobby_settings(&self) -> LobbySettings {
        LobbySettings {
            match_id: self.lobby.match_id,
            game_mode: self.lobby.game_mode,
            lobby_type: self.lobby.lobby_type,
            series: self.lobby.series,
        }
    }

    pub fn lifecycle_config(&self) -> LifecycleConfig {
        let lc = &self.lifecycle;
        LifecycleConfig {
            broadcast_delay: Duration::from_secs(lc.broadcast_delay_secs),
            min_shutdown: Duration::from_secs(lc.min_shutdown_secs),
            max_shutdown: Duration::from_secs(lc.max_shutdown_secs),
            status_interval: Duration::from_secs(lc.status_interval_secs),
            results_dir: PathBuf::from(&self.relay.results_dir),
            live_stats: self.relay.live_stats,
        }
    }
}
