//! gcrelay Protocol -- GC envelope framing, message ids, structured records.
//!
//! Every message exchanged with the game coordinator travels in one envelope:
//! `[u32 type LE][i32 header_len LE][header][body]`. A type id with the high
//! bit set carries a structured-schema body (JSON here, see `messages`).

pub mod codec;
pub mod emsg;
pub mod messages;
pub mod profile;

pub use codec::{Envelope, ENVELOPE_PREFIX_SIZE, STRUCTURED_FLAG};
pub use messages::ProtoHeader;
pub use profile::{RelayProfile, DEFAULT_PROFILE};

/// Maximum players per playing team (sourced from the default profile).
pub const MAX_TEAM_PLAYERS: usize = DEFAULT_PROFILE.max_team_players;

/// Fixed identity of the synthetic lobby object.
pub const LOBBY_ID: u64 = DEFAULT_PROFILE.lobby_id;

/// Shared-object type id of the lobby.
pub const LOBBY_SO_TYPE: u32 = DEFAULT_PROFILE.lobby_so_type;

/// Shared-object owner type of the lobby.
pub const LOBBY_OWNER_TYPE: u32 = DEFAULT_PROFILE.lobby_owner_type;

/// Version carried by the initial cache-subscribed snapshot.
pub const LOBBY_VERSION_SEED: u64 = DEFAULT_PROFILE.lobby_version_seed;

/// Steam id (64-bit).
pub type SteamId = u64;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
    #[error("buffer too small: need {needed} bytes, capacity {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
