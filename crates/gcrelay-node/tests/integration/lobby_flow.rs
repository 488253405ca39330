//! Lobby injection, roster traffic and the load-failure path.

use gcrelay_lifecycle::ShutdownState;
use gcrelay_lobby::{LeaverStatus, LobbyState};
use gcrelay_node::ClientInfo;
use gcrelay_protocol::messages::{
    self, CacheSubscribed, ConnectedPlayer, ConnectedPlayers, DisconnectedPlayer, GameState,
    MultipleObjects, PlayerFailedToConnect,
};
use gcrelay_protocol::{emsg, ProtoHeader, LOBBY_VERSION_SEED};
use gcrelay_relay::{GcResult, NotifyState};

use crate::harness::{lobby_from_update, make_config, TestRelay, MATCH_ID, SERVER_STEAM_ID};

/// Activated relay with the lobby injected and every envelope retrieved.
fn make_injected(per_team: u64) -> TestRelay {
    let mut relay = TestRelay::start(make_config(per_team));
    relay.pump_once();
    relay.drain_messages();
    assert!(relay.runtime.finish_lobby_setup("10.0.0.5:27015").unwrap());
    relay.pump_once();
    relay.drain_messages();
    relay
}

fn make_client(steam_id: u64, name: &str) -> ClientInfo {
    ClientInfo {
        steam_id,
        name: name.to_string(),
        network_id: format!("STEAM_1:0:{steam_id}"),
        fake_player: false,
    }
}

#[test]
fn test_lobby_setup_sequence() {
    let mut relay = TestRelay::start(make_config(5));
    relay.pump_once();
    relay.drain_messages();

    assert!(relay.runtime.finish_lobby_setup("10.0.0.5:27015").unwrap());
    assert_eq!(relay.runtime.bridge().queued(), 3);
    assert_eq!(relay.runtime.bridge().state(), NotifyState::Announced);

    // One announcement covers the whole batch
    assert!(relay.pump_once());
    assert!(!relay.pump_once());

    let msgs = relay.drain_messages();
    let types: Vec<u32> = msgs.iter().map(|m| m.base_type()).collect();
    assert_eq!(
        types,
        vec![emsg::SO_CACHE_SUBSCRIBED, emsg::SO_CREATE, emsg::SO_UPDATE_MULTIPLE]
    );

    let snapshot: CacheSubscribed = messages::decode_body(&msgs[0]).unwrap();
    assert_eq!(snapshot.version, LOBBY_VERSION_SEED);

    let update: MultipleObjects = messages::decode_body(&msgs[2]).unwrap();
    assert_eq!(update.version, LOBBY_VERSION_SEED + 2);
    let lobby = lobby_from_update(&msgs[2]);
    assert_eq!(lobby.state, LobbyState::ServerSetup);
    assert_eq!(lobby.server_id, SERVER_STEAM_ID);
    assert_eq!(lobby.connect, "10.0.0.5:27015");
    assert_eq!(lobby.members.len(), 11);

    assert!(!relay.runtime.finish_lobby_setup("10.0.0.5:27015").unwrap());
    assert_eq!(relay.runtime.bridge().queued(), 0);
}

#[test]
fn test_hibernation_end_finalizes() {
    let mut relay = make_injected(5);
    relay.runtime.on_hibernation_end();

    let msgs = relay.drain_messages();
    assert_eq!(msgs.len(), 1);
    let lobby = lobby_from_update(&msgs[0]);
    assert_eq!(lobby.state, LobbyState::Run);
    assert_eq!(lobby.match_id, MATCH_ID);
    assert_eq!(relay.runtime.lobby().version(), LOBBY_VERSION_SEED + 3);
    assert_eq!(relay.runtime.lobby().roster().len(), 11);
}

#[test]
fn test_roster_delta_intercepted() {
    let mut relay = make_injected(2);
    let delta = ConnectedPlayers {
        connected_players: vec![ConnectedPlayer {
            steam_id: 1000,
            hero_id: 5,
        }],
        disconnected_players: vec![DisconnectedPlayer {
            steam_id: 2000,
            reason: 2,
        }],
        game_state: GameState::WaitForPlayersToLoad,
        ..Default::default()
    };

    assert_eq!(
        relay.send(emsg::CONNECTED_PLAYERS, &ProtoHeader::default(), &delta),
        GcResult::Ok
    );
    assert!(relay.coordinator.lock().unwrap().sent.is_empty());

    let msgs = relay.drain_messages();
    assert_eq!(msgs.len(), 1);
    let lobby = lobby_from_update(&msgs[0]);
    let radiant = lobby.members.iter().find(|m| m.id == 1000).unwrap();
    assert_eq!(radiant.leaver_status, LeaverStatus::Connected);
    assert_eq!(radiant.hero_id, 5);
    let dire = lobby.members.iter().find(|m| m.id == 2000).unwrap();
    assert_eq!(dire.leaver_status, LeaverStatus::Disconnected);
    assert_eq!(lobby.game_state, GameState::WaitForPlayersToLoad);
}

#[test]
fn test_client_connect_chat_while_loading() {
    let mut relay = make_injected(2);
    let before = relay.commands().len();

    // Not loading yet: no chat
    relay.runtime.on_client_connected(&make_client(1000, "radiant0"));
    assert_eq!(relay.commands().len(), before);

    let delta = ConnectedPlayers {
        game_state: GameState::WaitForPlayersToLoad,
        ..Default::default()
    };
    relay.send(emsg::CONNECTED_PLAYERS, &ProtoHeader::default(), &delta);

    relay.runtime.on_client_connected(&make_client(1001, "radi;ant1"));
    assert_eq!(
        relay.commands().last().unwrap(),
        "say radi:ant1 has connected [2/5]"
    );

    let mut bot = make_client(0, "Bot Axe");
    bot.network_id = "bot".into();
    let before = relay.commands().len();
    relay.runtime.on_client_connected(&bot);
    assert_eq!(relay.commands().len(), before);

    relay.runtime.on_client_disconnected(&make_client(1000, "radiant0"));
    assert_eq!(
        relay.commands().last().unwrap(),
        "say radiant0 has disconnected [1/5]"
    );
}

#[test]
fn test_status_lines_on_frame() {
    let mut relay = make_injected(1);
    relay.runtime.on_game_state_changed(GameState::WaitForPlayersToLoad);
    relay.runtime.on_client_connected(&make_client(1000, "radiant0"));

    assert!(!relay.runtime.on_game_frame());
    let commands = relay.commands();
    assert!(commands.contains(&"say 1/3 players connected".to_string()));
    assert!(commands.contains(&"say Waiting for: dire0,caster".to_string()));
}

#[test]
fn test_hero_selection_records_replay() {
    let mut relay = make_injected(1);
    relay.runtime.on_game_state_changed(GameState::HeroSelection);
    assert_eq!(
        relay.commands().last().unwrap(),
        "tv_record \"replays/4242\""
    );
}

#[test]
fn test_rename_player_broadcasts() {
    let mut relay = make_injected(1);
    assert!(relay.runtime.rename_player(2000, "renamed").unwrap());
    assert!(!relay.runtime.rename_player(9999, "nobody").unwrap());

    let msgs = relay.drain_messages();
    assert_eq!(msgs.len(), 1);
    let lobby = lobby_from_update(&msgs[0]);
    assert_eq!(lobby.members.iter().find(|m| m.id == 2000).unwrap().name, "renamed");
}

#[test]
fn test_all_players_failed_to_load() {
    let mut relay = make_injected(5);
    let ids: Vec<u64> = relay.runtime.lobby().roster().iter().map(|m| m.id).collect();
    let record = PlayerFailedToConnect {
        failed_loaders: vec![],
        abandoned_loaders: ids.clone(),
    };

    assert_eq!(
        relay.send(emsg::PLAYER_FAILED_TO_CONNECT, &ProtoHeader::default(), &record),
        GcResult::Ok
    );
    assert_eq!(relay.runtime.lifecycle().state(), ShutdownState::ShuttingDown);
    assert!(relay.runtime.lobby().is_cleared());

    let docs = relay.documents();
    let statuses: Vec<&str> = docs.iter().map(|d| d["status"].as_str().unwrap()).collect();
    assert_eq!(statuses, vec!["startup", "load_failed", "shutdown"]);
    assert_eq!(docs[1]["failed_players"].as_array().unwrap().len(), ids.len());

    // The lobby is published as removed
    let msgs = relay.drain_messages();
    assert_eq!(msgs.len(), 1);
    let update: MultipleObjects = messages::decode_body(&msgs[0]).unwrap();
    assert!(update.objects_modified.is_empty());
    assert_eq!(update.objects_removed.len(), 1);

    // Nothing in flight: the next frame terminates
    assert!(relay.runtime.on_game_frame());
    assert_eq!(relay.commands().last().unwrap(), "quit");
    assert_eq!(relay.runtime.lifecycle().state(), ShutdownState::Terminated);
}
