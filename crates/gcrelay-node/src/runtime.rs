//! Relay runtime -- wires the bridge, interception rules, lobby session and
//! lifecycle to the host's hook points.
//!
//! The host calls in from its main loop only; nothing here is shared across
//! threads. Delivery attempts complete on the tokio runtime and are observed
//! through the in-flight count.

use std::time::Instant;

use gcrelay_lifecycle::{Delivery, Lifecycle, LifecycleActions};
use gcrelay_lobby::{LobbyError, LobbySession, MatchOutcome, Team};
use gcrelay_protocol::messages::GameState;
use gcrelay_protocol::{ProtocolError, SteamId};
use gcrelay_relay::{
    CallbackPump, Coordinator, GcResult, InboundVerdict, InterceptionRules, NotificationBridge,
    OutboundVerdict, RelayEvent, Retrieved,
};

use crate::config::{PlayerEntry, RelayConfig};
use crate::host::{self, ClientInfo, HostConnectivity, HostServer};

/// Failures that keep the relay from activating at all.
#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    #[error("callback pump interception point not available")]
    MissingCallbackPump,
    #[error("coordinator interception point not available")]
    MissingCoordinator,
    #[error("handshake envelope: {0}")]
    Handshake(#[from] ProtocolError),
    #[error("lobby staging: {0}")]
    Staging(#[from] LobbyError),
}

pub struct RelayRuntime {
    config: RelayConfig,
    pump: Box<dyn CallbackPump>,
    coordinator: Option<Box<dyn Coordinator>>,
    bridge: NotificationBridge,
    rules: InterceptionRules,
    lobby: LobbySession,
    lifecycle: Lifecycle,
    host: Box<dyn HostServer>,
    delivery: Box<dyn Delivery>,
}

impl RelayRuntime {
    /// Build the runtime and stage the configured lobby. Fails when the
    /// callback pump cannot be intercepted.
    pub fn new(
        config: RelayConfig,
        pump: Option<Box<dyn CallbackPump>>,
        host: Box<dyn HostServer>,
        delivery: Box<dyn Delivery>,
    ) -> Result<Self, ActivationError> {
        let pump = pump.ok_or(ActivationError::MissingCallbackPump)?;

        let lobby = build_lobby(&config)?;

        tracing::info!(
            match_id = lobby.match_id(),
            radiant = config.lobby.radiant.len(),
            dire = config.lobby.dire.len(),
            spectators = config.lobby.spectators.len(),
            "runtime: lobby staged"
        );

        Ok(Self {
            lifecycle: Lifecycle::new(config.lifecycle_config()),
            config,
            pump,
            coordinator: None,
            bridge: NotificationBridge::new(),
            rules: InterceptionRules::new(),
            lobby,
            host,
            delivery,
        })
    }

    // ---- activation ----------------------------------------------------

    /// The host's Steam API came up. Installs the coordinator and injects
    /// the server welcome. Only the first activation takes effect.
    pub fn on_steam_api_activated(
        &mut self,
        coordinator: Option<Box<dyn Coordinator>>,
    ) -> Result<(), ActivationError> {
        if self.coordinator.is_some() {
            tracing::warn!("runtime: already activated, ignoring repeat activation");
            return Ok(());
        }
        let coordinator = coordinator.ok_or(ActivationError::MissingCoordinator)?;
        self.coordinator = Some(coordinator);
        self.rules.inject_welcome(&mut self.bridge)?;

        let relay = &self.config.relay;
        if let Err(e) = self
            .lifecycle
            .on_startup(&relay.server_ip, relay.server_port, self.delivery.as_mut())
        {
            tracing::warn!("runtime: startup notice failed: {e}");
        }
        Ok(())
    }

    /// Inject the lobby once the server is ready for it. `connect` is the
    /// address clients are told to join.
    pub fn finish_lobby_setup(&mut self, connect: &str) -> Result<bool, LobbyError> {
        let server_id = self.host.server_steam_id();
        self.lobby.inject_session(server_id, connect, &mut self.bridge)
    }

    // ---- callback pump -------------------------------------------------

    pub fn get_callback(&mut self) -> bool {
        self.bridge.poll(self.pump.as_mut()).available()
    }

    pub fn free_last_callback(&mut self) {
        self.bridge.acknowledge(self.pump.as_mut());
    }

    // ---- coordinator ---------------------------------------------------

    pub fn is_message_available(&mut self) -> Option<u32> {
        let coordinator = self.coordinator.as_deref_mut()?;
        self.bridge.peek_available_size(coordinator)
    }

    /// Injected envelopes first, then real traffic; inbound rules apply to
    /// whatever the host is about to see.
    pub fn retrieve_message(&mut self, dest: &mut [u8]) -> Retrieved {
        let Some(coordinator) = self.coordinator.as_deref_mut() else {
            return Retrieved {
                result: GcResult::NotLoggedOn,
                msg_type: 0,
                size: 0,
            };
        };

        let mut got = self.bridge.take_next(dest, coordinator);
        if got.result != GcResult::Ok {
            return got;
        }

        if self.rules.on_retrieved(got.msg_type) {
            if let Some(cfg) = &self.config.relay.exec_config {
                tracing::info!(config = %cfg, "runtime: executing server config");
                self.host.server_command(&format!("exec {cfg}"));
            }
        }

        match self.rules.on_inbound(got.msg_type, dest, got.size) {
            Ok(InboundVerdict::Suppressed) => Retrieved::no_message(),
            Ok(InboundVerdict::Rewritten(len)) => {
                got.size = len;
                got
            }
            Ok(InboundVerdict::PassThrough) => got,
            Err(ProtocolError::BufferTooSmall { needed, .. }) => Retrieved {
                result: GcResult::BufferTooSmall,
                msg_type: got.msg_type,
                size: needed,
            },
            Err(e) => {
                tracing::warn!("runtime: inbound rule failed, passing through: {e}");
                got
            }
        }
    }

    /// Server -> GC. Intercepted traffic reports success without reaching
    /// the coordinator.
    pub fn send_message(&mut self, msg_type: u32, data: &[u8]) -> GcResult {
        let match_id = self.lobby.match_id();
        match self.rules.on_outbound(msg_type, data, match_id, &mut self.bridge) {
            OutboundVerdict::Intercepted(Some(event)) => {
                self.dispatch(event);
                GcResult::Ok
            }
            OutboundVerdict::Intercepted(None) => GcResult::Ok,
            OutboundVerdict::PassThrough => match self.coordinator.as_deref_mut() {
                Some(coordinator) => coordinator.send_message(msg_type, data),
                None => GcResult::NotLoggedOn,
            },
        }
    }

    fn dispatch(&mut self, event: RelayEvent) {
        let match_id = self.lobby.match_id();
        let result = match event {
            RelayEvent::LiveScoreboard(record) => self
                .lifecycle
                .on_live_stats(&record, match_id, self.delivery.as_mut())
                .map_err(|e| e.to_string()),
            RelayEvent::PlayersFailedToConnect(record) => self
                .lifecycle
                .on_all_players_failed_to_load(
                    &record,
                    &mut self.lobby,
                    &mut self.bridge,
                    self.delivery.as_mut(),
                )
                .map_err(|e| e.to_string()),
            RelayEvent::ConnectedPlayers(record) => self
                .lobby
                .apply_roster_delta(&record, &mut self.bridge)
                .map_err(|e| e.to_string()),
            RelayEvent::MatchSignOut(record) => {
                let outcome = MatchOutcome::from_good_guys_win(record.good_guys_win);
                if let Err(e) = self.lobby.enter_post_game(outcome, &mut self.bridge) {
                    tracing::warn!("runtime: post-game broadcast failed: {e}");
                }
                self.lifecycle
                    .on_match_signout(&record, match_id, Instant::now(), self.delivery.as_mut())
                    .map_err(|e| e.to_string())
            }
        };

        if let Err(e) = result {
            tracing::warn!("runtime: event handling failed: {e}");
        }
    }

    // ---- game hooks ----------------------------------------------------

    /// Per-frame tick. Returns true once the lifecycle asks to terminate.
    pub fn on_game_frame(&mut self) -> bool {
        let actions = {
            let connectivity = HostConnectivity(&*self.host);
            self.lifecycle
                .tick(&self.lobby, self.delivery.as_mut(), &connectivity)
        };
        self.apply(actions)
    }

    pub fn on_game_state_changed(&mut self, new_state: GameState) {
        let actions = self
            .lifecycle
            .on_game_state_changed(new_state, self.lobby.match_id());
        self.apply(actions);
    }

    /// Hibernation ended: the match is starting.
    pub fn on_hibernation_end(&mut self) {
        if let Err(e) = self.lobby.finalize(&mut self.bridge) {
            tracing::warn!("runtime: finalize failed: {e}");
        }
    }

    pub fn on_client_connected(&mut self, client: &ClientInfo) {
        self.on_client_change(client, true);
    }

    pub fn on_client_disconnected(&mut self, client: &ClientInfo) {
        self.on_client_change(client, false);
    }

    fn on_client_change(&mut self, client: &ClientInfo, connected: bool) {
        if client.is_bot() {
            return;
        }

        let known = if connected {
            self.lobby.on_player_connected(client.steam_id)
        } else {
            self.lobby.on_player_disconnected(client.steam_id)
        };
        tracing::info!(steam_id = client.steam_id, connected, known, "runtime: client");

        if let Some(line) = self.lifecycle.player_notice(&client.name, connected, &self.lobby) {
            host::say(self.host.as_mut(), &line);
        }
    }

    /// Rename a lobby member and broadcast the change.
    pub fn rename_player(&mut self, steam_id: SteamId, name: &str) -> Result<bool, LobbyError> {
        self.lobby.update_player_name(steam_id, name, &mut self.bridge)
    }

    fn apply(&mut self, actions: LifecycleActions) -> bool {
        for line in &actions.say {
            host::say(self.host.as_mut(), line);
        }
        for cmd in &actions.commands {
            self.host.server_command(cmd);
        }
        if actions.terminate {
            self.host.server_command("quit");
        }
        actions.terminate
    }

    // ---- queries -------------------------------------------------------

    pub fn lobby(&self) -> &LobbySession {
        &self.lobby
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn bridge(&self) -> &NotificationBridge {
        &self.bridge
    }

    pub fn rules(&self) -> &InterceptionRules {
        &self.rules
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// Lobby session with the configured rosters and custom overrides staged.
pub fn build_lobby(config: &RelayConfig) -> Result<LobbySession, LobbyError> {
    let mut lobby = LobbySession::new(config.lobby_settings());
    stage_team(&mut lobby, Team::Radiant, &config.lobby.radiant)?;
    stage_team(&mut lobby, Team::Dire, &config.lobby.dire)?;
    stage_team(&mut lobby, Team::Spectator, &config.lobby.spectators)?;
    lobby.set_custom(config.lobby.custom.clone())?;
    Ok(lobby)
}

fn stage_team(lobby: &mut LobbySession, team: Team, entries: &[PlayerEntry]) -> Result<(), LobbyError> {
    for p in entries {
        lobby.stage_player(team, p.steam_id, &p.name, p.hero.as_deref())?;
    }
    Ok(())
}
