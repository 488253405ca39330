//! The replicated lobby object and its members.
//!
//! Serialized as the `object_data` of the shared-object messages the lobby
//! broadcasts.

use gcrelay_protocol::messages::GameState;
use gcrelay_protocol::SteamId;
use serde::{Deserialize, Serialize};

/// Lobby lifecycle as seen by the game server. Forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyState {
    #[default]
    Ui,
    ServerAssign,
    ServerSetup,
    Run,
    PostGame,
}

impl LobbyState {
    pub fn name(&self) -> &'static str {
        match self {
            LobbyState::Ui => "ui",
            LobbyState::ServerAssign => "server_assign",
            LobbyState::ServerSetup => "server_setup",
            LobbyState::Run => "run",
            LobbyState::PostGame => "post_game",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Radiant,
    Dire,
    Spectator,
}

impl Team {
    /// Party id every member of this team shares.
    pub fn party_id(&self) -> u32 {
        match self {
            Team::Radiant => 1,
            Team::Dire => 2,
            Team::Spectator => 3,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Team::Radiant | Team::Dire)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Team::Radiant => "radiant",
            Team::Dire => "dire",
            Team::Spectator => "spectator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaverStatus {
    Connected,
    Disconnected,
    #[default]
    NeverConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    RadiantVictory,
    DireVictory,
}

impl MatchOutcome {
    pub fn from_good_guys_win(good_guys_win: bool) -> Self {
        if good_guys_win {
            MatchOutcome::RadiantVictory
        } else {
            MatchOutcome::DireVictory
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesType {
    #[default]
    None,
    Bo3,
    Bo5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub kind: SeriesType,
    #[serde(default)]
    pub radiant_wins: u8,
    #[serde(default)]
    pub dire_wins: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: SteamId,
    pub team: Team,
    pub name: String,
    pub hero_id: u32,
    /// 1-based position within the team.
    pub slot: u32,
    pub party_id: u32,
    pub leaver_status: LeaverStatus,
    pub channel: u32,
    /// Always "no team".
    pub coach_team: Option<Team>,
    pub cameraman: bool,
}

impl Member {
    pub fn new(id: SteamId, team: Team, name: &str, slot: u32, channel: u32) -> Self {
        Self {
            id,
            team,
            name: name.to_string(),
            hero_id: 0,
            slot,
            party_id: team.party_id(),
            leaver_status: LeaverStatus::NeverConnected,
            channel,
            coach_team: None,
            cameraman: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.leaver_status == LeaverStatus::Connected
    }

    /// Low 32 bits of the steam id.
    pub fn account_id(&self) -> u32 {
        (self.id & 0xFFFF_FFFF) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseSetting {
    Unlimited,
    Limited,
    Disabled,
}

/// The session object as the game server sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyObject {
    pub lobby_id: u64,
    pub state: LobbyState,
    pub game_state: GameState,
    pub matchgroup: u32,
    pub tv_delay_secs: u32,
    pub lobby_type: u32,
    pub allow_spectating: bool,
    pub league_id: u32,
    pub server_id: u64,
    pub connect: String,
    pub pause_setting: Option<PauseSetting>,
    pub series: Series,
    pub game_mode: u32,
    pub match_id: u64,
    pub match_outcome: Option<MatchOutcome>,
    pub first_blood_happened: bool,
    #[serde(flatten)]
    pub custom: crate::CustomConfig,
    pub members: Vec<Member>,
}

impl LobbyObject {
    pub fn new(lobby_id: u64, lobby_type: u32) -> Self {
        Self {
            lobby_id,
            state: LobbyState::Ui,
            game_state: GameState::Init,
            matchgroup: 1,
            tv_delay_secs: 120,
            lobby_type,
            allow_spectating: false,
            league_id: 0,
            server_id: 0,
            connect: String::new(),
            pause_setting: None,
            series: Series::default(),
            game_mode: 0,
            match_id: 0,
            match_outcome: None,
            first_blood_happened: false,
            custom: crate::CustomConfig::default(),
            members: Vec::new(),
        }
    }

    pub fn member(&self, id: SteamId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn member_mut(&mut self, id: SteamId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.id == id)
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
