//! Lobby session state machine: UI -> ServerAssign -> ServerSetup -> Run -> PostGame.

use std::fmt::Write as _;

use gcrelay_protocol::messages::{
    self, CacheSubscribed, ConnectedPlayers, GameState, MultipleObjects, SingleObject, SoId,
    SoObject, SubscribedType,
};
use gcrelay_protocol::{emsg, ProtoHeader, RelayProfile, SteamId, DEFAULT_PROFILE};
use serde::{Deserialize, Serialize};

use crate::object::{LeaverStatus, LobbyObject, LobbyState, MatchOutcome, Member, PauseSetting, Series, Team};
use crate::{CustomConfig, EnvelopeSink, LobbyError, Result};

/// All pick.
fn default_game_mode() -> u32 {
    1
}

/// Casual 1v1.
fn default_lobby_type() -> u32 {
    8
}

/// Match-level settings, fixed before injection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySettings {
    #[serde(default)]
    pub match_id: u64,
    #[serde(default = "default_game_mode")]
    pub game_mode: u32,
    #[serde(default = "default_lobby_type")]
    pub lobby_type: u32,
    #[serde(default)]
    pub series: Series,
}

impl Default for LobbySettings {
    fn default() -> Self {
        Self {
            match_id: 0,
            game_mode: default_game_mode(),
            lobby_type: default_lobby_type(),
            series: Series::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPlayer {
    pub steam_id: SteamId,
    pub name: String,
    /// Hero entity name to force, if any.
    pub hero: Option<String>,
}

pub struct LobbySession {
    profile: RelayProfile,
    settings: LobbySettings,
    custom: CustomConfig,
    radiant: Vec<StagedPlayer>,
    dire: Vec<StagedPlayer>,
    spectators: Vec<StagedPlayer>,
    lobby: LobbyObject,
    version: u64,
    injected: bool,
    cleared: bool,
}

impl LobbySession {
    pub fn new(settings: LobbySettings) -> Self {
        Self::with_profile(settings, DEFAULT_PROFILE)
    }

    pub fn with_profile(settings: LobbySettings, profile: RelayProfile) -> Self {
        Self {
            lobby: LobbyObject::new(profile.lobby_id, settings.lobby_type),
            version: profile.lobby_version_seed,
            profile,
            settings,
            custom: CustomConfig::default(),
            radiant: Vec::new(),
            dire: Vec::new(),
            spectators: Vec::new(),
            injected: false,
            cleared: false,
        }
    }

    // ---- staging -------------------------------------------------------

    /// Stage a player. Radiant and Dire hold at most `max_team_players`;
    /// spectators are not capped.
    pub fn stage_player(
        &mut self,
        team: Team,
        steam_id: SteamId,
        name: &str,
        hero: Option<&str>,
    ) -> Result<()> {
        if self.injected {
            return Err(LobbyError::TooLate);
        }

        let max = self.profile.max_team_players;
        let list = self.staged_mut(team);
        if list.iter().any(|p| p.steam_id == steam_id) {
            return Err(LobbyError::DuplicatePlayer(steam_id));
        }
        if team.is_playing() && list.len() >= max {
            return Err(LobbyError::TeamFull(team.name()));
        }

        list.push(StagedPlayer {
            steam_id,
            name: name.to_string(),
            hero: hero.filter(|h| !h.is_empty()).map(str::to_string),
        });
        tracing::debug!(steam_id, team = team.name(), name, "lobby: player staged");
        Ok(())
    }

    pub fn set_custom(&mut self, custom: CustomConfig) -> Result<()> {
        if self.injected {
            return Err(LobbyError::TooLate);
        }
        self.custom = custom;
        Ok(())
    }

    pub fn set_match_id(&mut self, match_id: u64) {
        self.settings.match_id = match_id;
    }

    pub fn staged(&self, team: Team) -> &[StagedPlayer] {
        match team {
            Team::Radiant => &self.radiant,
            Team::Dire => &self.dire,
            Team::Spectator => &self.spectators,
        }
    }

    fn staged_mut(&mut self, team: Team) -> &mut Vec<StagedPlayer> {
        match team {
            Team::Radiant => &mut self.radiant,
            Team::Dire => &mut self.dire,
            Team::Spectator => &mut self.spectators,
        }
    }

    // ---- injection -----------------------------------------------------

    /// Replay the shared-object sequence that establishes the lobby on the
    /// game server. Returns false when already injected.
    pub fn inject_session(
        &mut self,
        server_id: u64,
        connect: &str,
        sink: &mut dyn EnvelopeSink,
    ) -> Result<bool> {
        if self.injected {
            return Ok(false);
        }

        let mut lobby = self.lobby.clone();
        let mut version = self.version;

        // Snapshot at UI, carrying the seed version
        lobby.state = LobbyState::Ui;
        lobby.game_state = GameState::Init;
        lobby.lobby_type = self.settings.lobby_type;
        lobby.custom = self.custom.merge_over(&CustomConfig::defaults());
        let snapshot = messages::encode_structured(
            emsg::SO_CACHE_SUBSCRIBED,
            &ProtoHeader::default(),
            &CacheSubscribed {
                objects: vec![SubscribedType {
                    type_id: self.profile.lobby_so_type,
                    object_data: vec![lobby.to_bytes()?],
                }],
                owner_soid: self.owner_soid(),
                version,
            },
        )?;

        // Roster copied in, server assignment
        self.populate(&mut lobby);
        lobby.state = LobbyState::ServerAssign;
        lobby.allow_spectating = true;
        lobby.league_id = 1;
        version += 1;
        let create = messages::encode_structured(
            emsg::SO_CREATE,
            &ProtoHeader::default(),
            &SingleObject {
                type_id: self.profile.lobby_so_type,
                object_data: lobby.to_bytes()?,
                version,
                service_id: 0,
                owner_soid: self.owner_soid(),
            },
        )?;

        // Server setup
        lobby.server_id = server_id;
        lobby.connect = connect.to_string();
        lobby.state = LobbyState::ServerSetup;
        version += 1;
        let update = self.update_envelope(&lobby, version, false)?;

        self.lobby = lobby;
        self.version = version;
        self.injected = true;

        sink.inject(snapshot);
        sink.inject(create);
        sink.inject(update);

        tracing::info!(
            members = self.lobby.members.len(),
            version,
            "lobby: session injected"
        );
        Ok(true)
    }

    fn populate(&self, lobby: &mut LobbyObject) {
        let channel = self.profile.member_channel;
        for (team, list) in [
            (Team::Radiant, &self.radiant),
            (Team::Dire, &self.dire),
            (Team::Spectator, &self.spectators),
        ] {
            for (i, p) in list.iter().enumerate() {
                lobby
                    .members
                    .push(Member::new(p.steam_id, team, &p.name, i as u32 + 1, channel));
            }
        }

        lobby.pause_setting = Some(PauseSetting::Limited);
        lobby.series = self.settings.series;
        lobby.game_mode = self.settings.game_mode;
    }

    // ---- broadcasts ----------------------------------------------------

    /// Enter `Run` and publish the match id.
    pub fn finalize(&mut self, sink: &mut dyn EnvelopeSink) -> Result<()> {
        self.advance(LobbyState::Run);
        self.lobby.match_id = self.settings.match_id;
        self.broadcast(sink)
    }

    pub fn enter_post_game(&mut self, outcome: MatchOutcome, sink: &mut dyn EnvelopeSink) -> Result<()> {
        self.advance(LobbyState::PostGame);
        self.lobby.match_outcome = Some(outcome);
        tracing::info!(?outcome, "lobby: entering post game");
        self.broadcast(sink)
    }

    /// Merge a connected-players report into the roster.
    pub fn apply_roster_delta(&mut self, msg: &ConnectedPlayers, sink: &mut dyn EnvelopeSink) -> Result<()> {
        for connected in &msg.connected_players {
            if let Some(m) = self.lobby.member_mut(connected.steam_id) {
                m.leaver_status = LeaverStatus::Connected;
                m.hero_id = connected.hero_id;
            }
        }
        for disconnected in &msg.disconnected_players {
            if let Some(m) = self.lobby.member_mut(disconnected.steam_id) {
                m.leaver_status = LeaverStatus::Disconnected;
            }
        }

        self.lobby.first_blood_happened = msg.first_blood_happened;
        self.lobby.game_state = msg.game_state;

        self.broadcast(sink)
    }

    /// Rename a roster member. Broadcasts only when the member exists.
    pub fn update_player_name(
        &mut self,
        steam_id: SteamId,
        name: &str,
        sink: &mut dyn EnvelopeSink,
    ) -> Result<bool> {
        let Some(member) = self.lobby.member_mut(steam_id) else {
            return Ok(false);
        };
        member.name = name.to_string();
        self.broadcast(sink)?;
        Ok(true)
    }

    /// Publish the lobby as removed. No further broadcasts follow.
    pub fn remove_session(&mut self, sink: &mut dyn EnvelopeSink) -> Result<()> {
        if self.cleared {
            return Ok(());
        }

        let version = self.version + 1;
        let envelope = self.update_envelope(&self.lobby, version, true)?;
        self.version = version;
        self.cleared = true;
        sink.inject(envelope);

        tracing::info!(version, "lobby: session removed");
        Ok(())
    }

    fn broadcast(&mut self, sink: &mut dyn EnvelopeSink) -> Result<()> {
        if self.cleared {
            tracing::debug!("lobby: session cleared, update not sent");
            return Ok(());
        }

        let version = self.version + 1;
        let envelope = self.update_envelope(&self.lobby, version, false)?;
        self.version = version;
        sink.inject(envelope);

        tracing::info!(state = self.lobby.state.name(), version, "lobby: broadcast update");
        Ok(())
    }

    fn update_envelope(&self, lobby: &LobbyObject, version: u64, removed: bool) -> Result<Vec<u8>> {
        let object = SoObject {
            type_id: self.profile.lobby_so_type,
            object_data: lobby.to_bytes()?,
        };
        let (objects_modified, objects_removed) = if removed {
            (Vec::new(), vec![object])
        } else {
            (vec![object], Vec::new())
        };

        Ok(messages::encode_structured(
            emsg::SO_UPDATE_MULTIPLE,
            &ProtoHeader::default(),
            &MultipleObjects {
                objects_modified,
                objects_removed,
                version,
                service_id: 0,
                owner_soid: self.owner_soid(),
            },
        )?)
    }

    fn owner_soid(&self) -> SoId {
        SoId {
            id: self.profile.lobby_id,
            kind: self.profile.lobby_owner_type,
        }
    }

    fn advance(&mut self, to: LobbyState) {
        if to > self.lobby.state {
            tracing::debug!(from = self.lobby.state.name(), to = to.name(), "lobby: state");
            self.lobby.state = to;
        }
    }

    // ---- connectivity (no broadcast) -----------------------------------

    pub fn on_player_connected(&mut self, steam_id: SteamId) -> bool {
        match self.lobby.member_mut(steam_id) {
            Some(m) => {
                m.leaver_status = LeaverStatus::Connected;
                true
            }
            None => false,
        }
    }

    pub fn on_player_disconnected(&mut self, steam_id: SteamId) -> bool {
        match self.lobby.member_mut(steam_id) {
            Some(m) => {
                m.leaver_status = LeaverStatus::Disconnected;
                true
            }
            None => false,
        }
    }

    // ---- queries -------------------------------------------------------

    pub fn state(&self) -> LobbyState {
        self.lobby.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_injected(&self) -> bool {
        self.injected
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    pub fn match_id(&self) -> u64 {
        self.settings.match_id
    }

    pub fn settings(&self) -> &LobbySettings {
        &self.settings
    }

    pub fn game_state(&self) -> GameState {
        self.lobby.game_state
    }

    pub fn object(&self) -> &LobbyObject {
        &self.lobby
    }

    pub fn roster(&self) -> &[Member] {
        &self.lobby.members
    }

    pub fn connected_count(&self) -> usize {
        self.lobby.members.iter().filter(|m| m.is_connected()).count()
    }

    /// Comma-joined names of members not connected, with `;` shown as `:`.
    pub fn not_connected_names(&self) -> String {
        self.lobby
            .members
            .iter()
            .filter(|m| !m.is_connected())
            .map(|m| m.name.replace(';', ":"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Team a staged player was assigned to.
    pub fn player_team(&self, steam_id: SteamId) -> Option<Team> {
        [Team::Radiant, Team::Dire, Team::Spectator]
            .into_iter()
            .find(|&team| self.staged(team).iter().any(|p| p.steam_id == steam_id))
    }

    /// Forced hero of a staged Radiant or Dire player.
    pub fn staged_hero(&self, steam_id: SteamId) -> Option<&str> {
        self.radiant
            .iter()
            .chain(self.dire.iter())
            .find(|p| p.steam_id == steam_id)
            .and_then(|p| p.hero.as_deref())
    }

    pub fn players_without_hero(&self) -> Vec<SteamId> {
        self.lobby
            .members
            .iter()
            .filter(|m| m.hero_id == 0)
            .map(|m| m.id)
            .collect()
    }

    pub fn member_id_from_account_id(&self, account_id: u32) -> Option<SteamId> {
        self.lobby
            .members
            .iter()
            .find(|m| m.account_id() == account_id)
            .map(|m| m.id)
    }

    /// Human-readable summary of staging and match settings.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (label, team) in [
            ("Radiant", Team::Radiant),
            ("Dire", Team::Dire),
            ("Spectator", Team::Spectator),
        ] {
            let _ = writeln!(out, "{label} players:");
            for p in self.staged(team) {
                let _ = writeln!(
                    out,
                    "- {} [U:{}:{}]\t({})",
                    p.steam_id,
                    p.steam_id >> 56,
                    p.steam_id & 0xFFFF_FFFF,
                    p.name
                );
            }
        }
        let _ = writeln!(out, "Match ID: \"{}\"", self.settings.match_id);
        let _ = writeln!(out, "Lobby type: {}", self.settings.lobby_type);
        let _ = writeln!(out, "Game mode: {}", self.settings.game_mode);
        let _ = writeln!(
            out,
            "State: {} (version {}, injected {})",
            self.lobby.state.name(),
            self.version,
            self.injected
        );
        out
    }
}
