//! gcrelay Lobby -- the synthetic lobby session the game server is fed.
//!
//! Players are staged before injection. Injection replays the shared-object
//! sequence a real coordinator would send (snapshot, create, update); after
//! that every mutation is broadcast as a versioned update.

pub mod custom;
pub mod object;
pub mod session;

pub use custom::CustomConfig;
pub use object::{
    LeaverStatus, LobbyObject, LobbyState, MatchOutcome, Member, Series, SeriesType, Team,
};
pub use session::{LobbySession, LobbySettings, StagedPlayer};

use gcrelay_protocol::ProtocolError;
use gcrelay_relay::NotificationBridge;

#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("too late to modify lobby data: session already injected")]
    TooLate,
    #[error("player {0} already staged on this team")]
    DuplicatePlayer(u64),
    #[error("team {0} is full")]
    TeamFull(&'static str),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl From<serde_json::Error> for LobbyError {
    fn from(e: serde_json::Error) -> Self {
        LobbyError::Protocol(ProtocolError::Json(e))
    }
}

pub type Result<T> = std::result::Result<T, LobbyError>;

/// Destination for envelopes the lobby fabricates.
pub trait EnvelopeSink {
    fn inject(&mut self, envelope: Vec<u8>);
}

impl EnvelopeSink for NotificationBridge {
    fn inject(&mut self, envelope: Vec<u8>) {
        NotificationBridge::inject(self, envelope);
    }
}

/// Collects envelopes in order. Used by dry runs and tests.
impl EnvelopeSink for Vec<Vec<u8>> {
    fn inject(&mut self, envelope: Vec<u8>) {
        self.push(envelope);
    }
}
