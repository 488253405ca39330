//! Seam to the hosting game server process.

use gcrelay_lifecycle::PlayerConnectivity;
use gcrelay_protocol::SteamId;

/// Services the relay needs from the game server it is loaded into.
pub trait HostServer {
    /// Run a console command.
    fn server_command(&mut self, command: &str);
    /// Number of player slots with a connected client.
    fn connected_player_count(&self) -> usize;
    fn is_player_connected(&self, slot: usize) -> bool;
    /// Steam id of the dedicated server, once logged on.
    fn server_steam_id(&self) -> SteamId;
}

/// Broadcast a chat line to every player. The rest of the console line is
/// the message, so it goes out unquoted.
pub fn say(host: &mut dyn HostServer, line: &str) {
    host.server_command(&format!("say {line}"));
}

/// Exposes a host as the lifecycle's connectivity view.
pub struct HostConnectivity<'a>(pub &'a dyn HostServer);

impl PlayerConnectivity for HostConnectivity<'_> {
    fn connected_player_count(&self) -> usize {
        self.0.connected_player_count()
    }

    fn is_player_connected(&self, slot: usize) -> bool {
        self.0.is_player_connected(slot)
    }
}

/// A connecting client, as seen by the host.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub steam_id: SteamId,
    pub name: String,
    /// Network id string; `"BOT"` for bots.
    pub network_id: String,
    pub fake_player: bool,
}

impl ClientInfo {
    pub fn is_bot(&self) -> bool {
        self.fake_player || self.network_id.eq_ignore_ascii_case("BOT")
    }
}
