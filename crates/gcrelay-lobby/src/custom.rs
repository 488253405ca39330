//! Custom-game overrides. Every field is independently set or inherited.

use serde::{Deserialize, Serialize};

/// Map used when no override names one.
pub const DEFAULT_MAP_NAME: &str = "dota";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_difficulty: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_game_auto_created_lobby: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_game_crc: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_game_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_game_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_game_timestamp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_game_uses_account_records: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_map_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_max_players: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_min_players: Option<u32>,
}

impl CustomConfig {
    /// Values a lobby starts from before overrides apply.
    pub fn defaults() -> Self {
        Self {
            custom_map_name: Some(DEFAULT_MAP_NAME.to_string()),
            ..Self::default()
        }
    }

    /// Fields set on `self` win; unset fields inherit from `base`.
    pub fn merge_over(&self, base: &CustomConfig) -> CustomConfig {
        CustomConfig {
            custom_difficulty: self.custom_difficulty.or(base.custom_difficulty),
            custom_game_auto_created_lobby: self
                .custom_game_auto_created_lobby
                .or(base.custom_game_auto_created_lobby),
            custom_game_crc: self.custom_game_crc.or(base.custom_game_crc),
            custom_game_id: self.custom_game_id.or(base.custom_game_id),
            custom_game_mode: self
                .custom_game_mode
                .clone()
                .or_else(|| base.custom_game_mode.clone()),
            custom_game_timestamp: self.custom_game_timestamp.or(base.custom_game_timestamp),
            custom_game_uses_account_records: self
                .custom_game_uses_account_records
                .or(base.custom_game_uses_account_records),
            custom_map_name: self
                .custom_map_name
                .clone()
                .or_else(|| base.custom_map_name.clone()),
            custom_max_players: self.custom_max_players.or(base.custom_max_players),
            custom_min_players: self.custom_min_players.or(base.custom_min_players),
        }
    }
}
