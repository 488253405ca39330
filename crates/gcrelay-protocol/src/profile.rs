//! Relay profile -- the fixed parameter set the synthetic session is built on.
//!
//! The GC client in the game server checks lobby identity and versions
//! against what it saw earlier in the session, so these values must stay
//! stable for the lifetime of a process. Timing values are defaults; the
//! node config may override them per deployment.

/// Fixed identity and timing parameters for one relay deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayProfile {
    // -- Lobby identity --
    /// Shared-object id of the synthetic lobby.
    pub lobby_id: u64,
    /// Shared-object type id of a lobby.
    pub lobby_so_type: u32,
    /// Owner type of the lobby's owning shared object.
    pub lobby_owner_type: u32,
    /// Version carried by the initial snapshot. Every broadcast after it
    /// increments by one.
    pub lobby_version_seed: u64,

    // -- Roster --
    /// Players per playing team. Spectators are not capped.
    pub max_team_players: usize,
    /// Value of the `channel` field on every lobby member.
    pub member_channel: u32,

    // -- Lifecycle timing --
    /// Earliest shutdown after sign-out, past the broadcast delay.
    pub min_shutdown_secs: u64,
    /// Latest shutdown after sign-out, past the broadcast delay.
    pub max_shutdown_secs: u64,
    /// Broadcast (TV) delay that shifts both shutdown bounds.
    pub broadcast_delay_secs: u64,
    /// Interval between "players connected" status lines while loading.
    pub status_interval_secs: u64,
}

/// Default profile.
pub const DEFAULT_PROFILE: RelayProfile = RelayProfile {
    lobby_id: 24_210_021_764_591_890,
    lobby_so_type: 2004,
    lobby_owner_type: 3,
    lobby_version_seed: 24_210_021_764_591_896,

    max_team_players: 5,
    member_channel: 6,

    min_shutdown_secs: 3 * 60,
    max_shutdown_secs: 5 * 60,
    broadcast_delay_secs: 120,
    status_interval_secs: 30,
};
