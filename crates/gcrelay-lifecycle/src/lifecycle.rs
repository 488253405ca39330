//! Shutdown state machine and match reporting.

use std::path::PathBuf;
use std::time::Instant;

use gcrelay_lobby::{EnvelopeSink, LobbySession};
use gcrelay_protocol::messages::{GameMatchSignOut, GameState, LiveScoreboardUpdate, PlayerFailedToConnect};
use serde_json::Value;

use crate::{reports, Delivery, LifecycleConfig, PlayerConnectivity, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ShutdownState {
    #[default]
    None,
    PreShutdown,
    ShuttingDown,
    Terminated,
}

impl ShutdownState {
    pub fn name(&self) -> &'static str {
        match self {
            ShutdownState::None => "none",
            ShutdownState::PreShutdown => "pre_shutdown",
            ShutdownState::ShuttingDown => "shutting_down",
            ShutdownState::Terminated => "terminated",
        }
    }
}

/// What the host should do after a lifecycle step.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LifecycleActions {
    /// Chat lines to broadcast to players.
    pub say: Vec<String>,
    /// Console commands to run.
    pub commands: Vec<String>,
    /// Stop the server process.
    pub terminate: bool,
}

impl LifecycleActions {
    pub fn is_empty(&self) -> bool {
        self.say.is_empty() && self.commands.is_empty() && !self.terminate
    }
}

pub struct Lifecycle {
    config: LifecycleConfig,
    state: ShutdownState,
    pre_shutdown_started_at: Option<Instant>,
    last_status_at: Option<Instant>,
    game_state: GameState,
}

impl Lifecycle {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            config,
            state: ShutdownState::None,
            pre_shutdown_started_at: None,
            last_status_at: None,
            game_state: GameState::Init,
        }
    }

    pub fn state(&self) -> ShutdownState {
        self.state
    }

    pub fn game_state(&self) -> GameState {
        self.game_state
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    // ---- notices -------------------------------------------------------

    pub fn on_startup(&self, ip: &str, port: u16, delivery: &mut dyn Delivery) -> Result<()> {
        let doc = reports::startup_notice(ip, port);
        tracing::info!(%doc, "lifecycle: startup notice");
        post_if_configured(&doc, delivery)
    }

    pub fn on_live_stats(
        &self,
        record: &LiveScoreboardUpdate,
        match_id: u64,
        delivery: &mut dyn Delivery,
    ) -> Result<()> {
        if !self.config.live_stats {
            return Ok(());
        }
        let doc = reports::live_update(record, match_id)?;
        tracing::debug!(%doc, "lifecycle: live update");
        post_if_configured(&doc, delivery)
    }

    // ---- trigger events ------------------------------------------------

    /// Report the final result and start the post-game wait.
    pub fn on_match_signout(
        &mut self,
        record: &GameMatchSignOut,
        match_id: u64,
        now: Instant,
        delivery: &mut dyn Delivery,
    ) -> Result<()> {
        match reports::signout_report(record, match_id) {
            Ok(doc) => self.send_match_data(&doc, match_id, delivery),
            Err(e) => tracing::warn!(match_id, "lifecycle: match report failed: {e}"),
        }

        if self.state < ShutdownState::PreShutdown {
            self.transition(ShutdownState::PreShutdown);
            self.pre_shutdown_started_at = Some(now);
        }
        Ok(())
    }

    /// Report a load failure, clear the lobby, and shut down without the
    /// post-game wait.
    pub fn on_all_players_failed_to_load(
        &mut self,
        record: &PlayerFailedToConnect,
        lobby: &mut LobbySession,
        sink: &mut dyn EnvelopeSink,
        delivery: &mut dyn Delivery,
    ) -> Result<()> {
        tracing::info!("lifecycle: timed out waiting for players to load");
        let match_id = lobby.match_id();
        let doc = reports::load_failed_report(record, lobby.roster(), match_id);
        self.send_match_data(&doc, match_id, delivery);

        if let Err(e) = lobby.remove_session(sink) {
            tracing::warn!(match_id, "lifecycle: lobby removal failed: {e}");
        }
        self.begin_shutdown(match_id, delivery)
    }

    /// Track the game rules state. Entering hero selection starts the
    /// replay recording.
    pub fn on_game_state_changed(&mut self, new_state: GameState, match_id: u64) -> LifecycleActions {
        let mut actions = LifecycleActions::default();
        tracing::debug!(from = ?self.game_state, to = ?new_state, "lifecycle: game state");
        self.game_state = new_state;

        if new_state == GameState::HeroSelection && match_id != 0 {
            let cmd = format!("tv_record \"replays/{match_id}\"");
            tracing::info!(command = %cmd, "lifecycle: recording replay");
            actions.commands.push(cmd);
        }
        actions
    }

    /// Chat line announcing a (dis)connect while players load. Bots are
    /// filtered by the caller.
    pub fn player_notice(&self, name: &str, connected: bool, lobby: &LobbySession) -> Option<String> {
        if lobby.game_state() != GameState::WaitForPlayersToLoad {
            return None;
        }
        let verb = if connected { "connected" } else { "disconnected" };
        Some(format!(
            "{} has {verb} [{}/{}]",
            name.replace(';', ":"),
            lobby.connected_count(),
            lobby.roster().len()
        ))
    }

    // ---- tick ----------------------------------------------------------

    pub fn tick(
        &mut self,
        lobby: &LobbySession,
        delivery: &mut dyn Delivery,
        connectivity: &dyn PlayerConnectivity,
    ) -> LifecycleActions {
        self.tick_at(Instant::now(), lobby, delivery, connectivity)
    }

    /// Run one game-frame step at `now`.
    pub fn tick_at(
        &mut self,
        now: Instant,
        lobby: &LobbySession,
        delivery: &mut dyn Delivery,
        connectivity: &dyn PlayerConnectivity,
    ) -> LifecycleActions {
        let mut actions = LifecycleActions::default();

        if self.game_state == GameState::WaitForPlayersToLoad {
            self.status_lines(now, lobby, &mut actions);
        }

        match self.state {
            ShutdownState::PreShutdown => self.pre_shutdown_tick(now, lobby, delivery, connectivity),
            ShutdownState::ShuttingDown => {
                if delivery.in_flight() == 0 {
                    tracing::info!("lifecycle: deliveries drained, terminating");
                    self.transition(ShutdownState::Terminated);
                    actions.terminate = true;
                }
            }
            ShutdownState::None | ShutdownState::Terminated => {}
        }

        actions
    }

    fn status_lines(&mut self, now: Instant, lobby: &LobbySession, actions: &mut LifecycleActions) {
        let due = self
            .last_status_at
            .map_or(true, |last| now.duration_since(last) >= self.config.status_interval);
        if !due {
            return;
        }

        let connected = lobby.connected_count();
        let total = lobby.roster().len();
        actions.say.push(format!("{connected}/{total} players connected"));
        if connected != total {
            actions.say.push(format!("Waiting for: {}", lobby.not_connected_names()));
        }
        self.last_status_at = Some(now);
    }

    fn pre_shutdown_tick(
        &mut self,
        now: Instant,
        lobby: &LobbySession,
        delivery: &mut dyn Delivery,
        connectivity: &dyn PlayerConnectivity,
    ) {
        if delivery.in_flight() > 0 {
            return;
        }
        let Some(started) = self.pre_shutdown_started_at else {
            return;
        };

        // Both bounds are measured past the broadcast delay
        let Some(elapsed) = now
            .saturating_duration_since(started)
            .checked_sub(self.config.broadcast_delay)
        else {
            return;
        };

        let reason = if elapsed >= self.config.max_shutdown {
            "reached maximum post-game time"
        } else if elapsed >= self.config.min_shutdown {
            "reached minimum post-game time"
        } else if connectivity.connected_player_count() == 0 {
            "no players still connected"
        } else {
            return;
        };

        tracing::info!(elapsed_secs = elapsed.as_secs(), reason, "lifecycle: shutting down");
        if let Err(e) = self.begin_shutdown(lobby.match_id(), delivery) {
            tracing::warn!("lifecycle: shutdown notice failed: {e}");
        }
    }

    fn begin_shutdown(&mut self, match_id: u64, delivery: &mut dyn Delivery) -> Result<()> {
        self.transition(ShutdownState::ShuttingDown);
        let doc = reports::shutdown_notice(match_id);
        tracing::info!(%doc, "lifecycle: shutdown notice");
        post_if_configured(&doc, delivery)
    }

    fn transition(&mut self, to: ShutdownState) {
        if to > self.state {
            tracing::info!(from = self.state.name(), to = to.name(), "lifecycle: state");
            self.state = to;
        }
    }

    /// Post the match document, or write it to `match_<id>.txt` when no
    /// endpoint is configured. A lost report never holds up the shutdown.
    fn send_match_data(&self, doc: &Value, match_id: u64, delivery: &mut dyn Delivery) {
        let bytes = match serde_json::to_vec(doc) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(match_id, "lifecycle: match data not serializable: {e}");
                return;
            }
        };
        tracing::info!(match_id, size = bytes.len(), "lifecycle: sending match data");

        if delivery.has_destination() {
            delivery.submit(bytes);
            return;
        }

        let path = self.result_path(match_id);
        tracing::info!(path = %path.display(), "lifecycle: match url not set, saving match result");
        if let Err(e) = std::fs::write(&path, bytes) {
            tracing::warn!(path = %path.display(), "lifecycle: could not save match result: {e}");
        }
    }

    pub fn result_path(&self, match_id: u64) -> PathBuf {
        self.config.results_dir.join(format!("match_{match_id}.txt"))
    }
}

fn post_if_configured(doc: &Value, delivery: &mut dyn Delivery) -> Result<()> {
    if delivery.has_destination() {
        delivery.submit(serde_json::to_vec(doc)?);
    }
    Ok(())
}
