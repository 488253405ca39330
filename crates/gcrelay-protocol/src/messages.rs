//! Structured message records the relay reads or fabricates.
//!
//! Structured bodies are serde JSON. Records the relay only inspects keep any
//! fields they do not name in a flattened map, so nothing is lost when a
//! record is turned into a report document. Opaque byte fields travel as
//! base64 strings.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec::{self, Envelope, STRUCTURED_FLAG};
use crate::{Result, SteamId};

type Extra = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Header
// ============================================================================

/// Envelope header. An empty header is encoded as zero bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id_source: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id_target: Option<u64>,
}

impl ProtoHeader {
    pub fn is_empty(&self) -> bool {
        self.job_id_source.is_none() && self.job_id_target.is_none()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Encode a structured-schema envelope (sets the high bit on `id`).
pub fn encode_structured<T: Serialize>(id: u32, header: &ProtoHeader, body: &T) -> Result<Vec<u8>> {
    let header = header.to_bytes()?;
    let body = serde_json::to_vec(body)?;
    Ok(codec::encode(id | STRUCTURED_FLAG, &header, &body))
}

/// Decode the body of a structured envelope into `T`.
pub fn decode_body<T: DeserializeOwned>(envelope: &Envelope) -> Result<T> {
    Ok(serde_json::from_slice(&envelope.body)?)
}

// ============================================================================
// Game state
// ============================================================================

/// Game rules state as reported by the game server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum GameState {
    #[default]
    Init,
    WaitForPlayersToLoad,
    HeroSelection,
    StrategyTime,
    PreGame,
    GameInProgress,
    PostGame,
    Disconnect,
    Other(u32),
}

impl From<u32> for GameState {
    fn from(raw: u32) -> Self {
        match raw {
            0 => GameState::Init,
            1 => GameState::WaitForPlayersToLoad,
            2 => GameState::HeroSelection,
            3 => GameState::StrategyTime,
            4 => GameState::PreGame,
            5 => GameState::GameInProgress,
            6 => GameState::PostGame,
            7 => GameState::Disconnect,
            other => GameState::Other(other),
        }
    }
}

impl From<GameState> for u32 {
    fn from(state: GameState) -> Self {
        match state {
            GameState::Init => 0,
            GameState::WaitForPlayersToLoad => 1,
            GameState::HeroSelection => 2,
            GameState::StrategyTime => 3,
            GameState::PreGame => 4,
            GameState::GameInProgress => 5,
            GameState::PostGame => 6,
            GameState::Disconnect => 7,
            GameState::Other(raw) => raw,
        }
    }
}

// ============================================================================
// Welcome
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientWelcome {
    pub version: u32,
}

// ============================================================================
// Shared objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoId {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribedType {
    pub type_id: u32,
    #[serde(with = "b64_list")]
    pub object_data: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSubscribed {
    pub objects: Vec<SubscribedType>,
    pub owner_soid: SoId,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleObject {
    pub type_id: u32,
    #[serde(with = "b64")]
    pub object_data: Vec<u8>,
    pub version: u64,
    pub service_id: u32,
    pub owner_soid: SoId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoObject {
    pub type_id: u32,
    #[serde(with = "b64")]
    pub object_data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipleObjects {
    #[serde(default)]
    pub objects_modified: Vec<SoObject>,
    #[serde(default)]
    pub objects_removed: Vec<SoObject>,
    pub version: u64,
    pub service_id: u32,
    pub owner_soid: SoId,
}

// ============================================================================
// Match sign-out
// ============================================================================

/// Nested record inside a sign-out, decoded by its own message id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalMsg {
    pub id: u32,
    #[serde(with = "b64")]
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMatchSignOut {
    #[serde(default)]
    pub good_guys_win: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_msgs: Vec<AdditionalMsg>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMatchSignOutResponse {
    pub match_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignOutPermissionResponse {
    #[serde(default)]
    pub permission_granted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_seconds: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ============================================================================
// Roster traffic
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerFailedToConnect {
    #[serde(default)]
    pub failed_loaders: Vec<SteamId>,
    #[serde(default)]
    pub abandoned_loaders: Vec<SteamId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedPlayer {
    pub steam_id: SteamId,
    #[serde(default)]
    pub hero_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectedPlayer {
    pub steam_id: SteamId,
    #[serde(default)]
    pub reason: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectedPlayers {
    #[serde(default)]
    pub connected_players: Vec<ConnectedPlayer>,
    #[serde(default)]
    pub disconnected_players: Vec<DisconnectedPlayer>,
    #[serde(default)]
    pub send_reason: u32,
    #[serde(default)]
    pub first_blood_happened: bool,
    #[serde(default)]
    pub game_state: GameState,
}

/// Periodic score/stat update. Carried opaquely into the report document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveScoreboardUpdate {
    #[serde(flatten)]
    pub fields: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchPlayerResourcesResponse {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

// ============================================================================
// Byte field helpers
// ============================================================================

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

mod b64_list {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&STANDARD.encode(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<u8>>, D::Error> {
        let raw = Vec::<String>::deserialize(d)?;
        raw.into_iter()
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
