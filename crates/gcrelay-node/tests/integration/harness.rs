//! Test harness for in-process relay integration tests.
//!
//! Provides mock collaborators whose logs stay readable after they are
//! boxed into the runtime, and TestRelay, an activated runtime with helpers
//! for draining what the host would retrieve.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use gcrelay_lifecycle::Delivery;
use gcrelay_node::config::PlayerEntry;
use gcrelay_node::{HostServer, RelayConfig, RelayRuntime};
use gcrelay_protocol::{codec, messages, Envelope, ProtoHeader, SteamId};
use gcrelay_relay::{CallbackPump, Coordinator, GcResult, Retrieved};
use serde::Serialize;

pub const SERVER_STEAM_ID: SteamId = 90_071_992_547_409_921;
pub const MATCH_ID: u64 = 4242;

// ============================================================================
// Host
// ============================================================================

#[derive(Default)]
pub struct HostLog {
    pub commands: Vec<String>,
    pub connected: usize,
}

pub struct MockHost(pub Arc<Mutex<HostLog>>);

impl HostServer for MockHost {
    fn server_command(&mut self, command: &str) {
        self.0.lock().unwrap().commands.push(command.to_string());
    }

    fn connected_player_count(&self) -> usize {
        self.0.lock().unwrap().connected
    }

    fn is_player_connected(&self, slot: usize) -> bool {
        slot < self.0.lock().unwrap().connected
    }

    fn server_steam_id(&self) -> SteamId {
        SERVER_STEAM_ID
    }
}

// ============================================================================
// Callback pump
// ============================================================================

#[derive(Default)]
pub struct PumpLog {
    /// Genuine callbacks waiting to be polled.
    pub pending: usize,
    pub polls: usize,
    pub frees: usize,
}

pub struct MockPump(pub Arc<Mutex<PumpLog>>);

impl CallbackPump for MockPump {
    fn poll_callback(&mut self) -> bool {
        let mut log = self.0.lock().unwrap();
        log.polls += 1;
        log.pending > 0
    }

    fn free_last_callback(&mut self) {
        let mut log = self.0.lock().unwrap();
        log.frees += 1;
        log.pending = log.pending.saturating_sub(1);
    }
}

// ============================================================================
// Coordinator
// ============================================================================

#[derive(Default)]
pub struct CoordinatorLog {
    /// Real GC -> server traffic waiting to be retrieved.
    pub inbound: VecDeque<Vec<u8>>,
    /// Messages that actually reached the coordinator.
    pub sent: Vec<(u32, Vec<u8>)>,
}

pub struct MockCoordinator(pub Arc<Mutex<CoordinatorLog>>);

impl Coordinator for MockCoordinator {
    fn is_message_available(&mut self) -> Option<u32> {
        self.0.lock().unwrap().inbound.front().map(|m| m.len() as u32)
    }

    fn retrieve_message(&mut self, dest: &mut [u8]) -> Retrieved {
        let mut log = self.0.lock().unwrap();
        let Some(front) = log.inbound.front() else {
            return Retrieved::no_message();
        };
        let msg_type = codec::peek_type(front).unwrap_or_default();
        let size = front.len();
        if size > dest.len() {
            return Retrieved {
                result: GcResult::BufferTooSmall,
                msg_type,
                size,
            };
        }
        dest[..size].copy_from_slice(front);
        log.inbound.pop_front();
        Retrieved {
            result: GcResult::Ok,
            msg_type,
            size,
        }
    }

    fn send_message(&mut self, msg_type: u32, data: &[u8]) -> GcResult {
        self.0.lock().unwrap().sent.push((msg_type, data.to_vec()));
        GcResult::Ok
    }
}

// ============================================================================
// Delivery
// ============================================================================

#[derive(Default)]
pub struct DeliveryLog {
    pub documents: Vec<serde_json::Value>,
    pub in_flight: usize,
}

pub struct MockDelivery(pub Arc<Mutex<DeliveryLog>>);

impl Delivery for MockDelivery {
    fn has_destination(&self) -> bool {
        true
    }

    fn submit(&mut self, document: Vec<u8>) {
        let doc = serde_json::from_slice(&document).unwrap();
        self.0.lock().unwrap().documents.push(doc);
    }

    fn in_flight(&self) -> usize {
        self.0.lock().unwrap().in_flight
    }
}

// ============================================================================
// TestRelay
// ============================================================================

/// An activated runtime plus handles onto every mock it owns.
pub struct TestRelay {
    pub runtime: RelayRuntime,
    pub host: Arc<Mutex<HostLog>>,
    pub pump: Arc<Mutex<PumpLog>>,
    pub coordinator: Arc<Mutex<CoordinatorLog>>,
    pub delivery: Arc<Mutex<DeliveryLog>>,
}

#[allow(dead_code)]
impl TestRelay {
    /// Runtime with mock delivery, activated (welcome injected).
    pub fn start(config: RelayConfig) -> Self {
        let delivery = Arc::new(Mutex::new(DeliveryLog::default()));
        Self::start_with_delivery(config, Box::new(MockDelivery(delivery.clone())), delivery)
    }

    /// Runtime with a caller-provided delivery. `delivery_log` is only
    /// populated when `delivery` is a `MockDelivery` sharing it.
    pub fn start_with_delivery(
        config: RelayConfig,
        delivery: Box<dyn Delivery>,
        delivery_log: Arc<Mutex<DeliveryLog>>,
    ) -> Self {
        let host = Arc::new(Mutex::new(HostLog::default()));
        let pump = Arc::new(Mutex::new(PumpLog::default()));
        let coordinator = Arc::new(Mutex::new(CoordinatorLog::default()));

        let mut runtime = RelayRuntime::new(
            config,
            Some(Box::new(MockPump(pump.clone()))),
            Box::new(MockHost(host.clone())),
            delivery,
        )
        .unwrap();
        runtime
            .on_steam_api_activated(Some(Box::new(MockCoordinator(coordinator.clone()))))
            .unwrap();

        Self {
            runtime,
            host,
            pump,
            coordinator,
            delivery: delivery_log,
        }
    }

    /// One host poll/free cycle. Returns whether a callback was available.
    pub fn pump_once(&mut self) -> bool {
        let available = self.runtime.get_callback();
        if available {
            self.runtime.free_last_callback();
        }
        available
    }

    /// Retrieve everything the host can see right now, injected or real.
    pub fn drain_messages(&mut self) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Some(size) = self.runtime.is_message_available() {
            let mut buf = vec![0u8; size as usize + 256];
            let got = self.runtime.retrieve_message(&mut buf);
            match got.result {
                GcResult::Ok => out.push(Envelope::decode(&buf[..got.size]).unwrap()),
                GcResult::NoMessage => {}
                other => panic!("unexpected retrieve result {other:?}"),
            }
        }
        out
    }

    /// Server -> GC through the runtime.
    pub fn send<T: Serialize>(&mut self, id: u32, header: &ProtoHeader, body: &T) -> GcResult {
        let payload = messages::encode_structured(id, header, body).unwrap();
        let msg_type = codec::peek_type(&payload).unwrap();
        self.runtime.send_message(msg_type, &payload)
    }

    /// Queue real GC -> server traffic.
    pub fn push_inbound<T: Serialize>(&mut self, id: u32, body: &T) {
        let payload = messages::encode_structured(id, &ProtoHeader::default(), body).unwrap();
        self.coordinator.lock().unwrap().inbound.push_back(payload);
    }

    pub fn commands(&self) -> Vec<String> {
        self.host.lock().unwrap().commands.clone()
    }

    pub fn documents(&self) -> Vec<serde_json::Value> {
        self.delivery.lock().unwrap().documents.clone()
    }
}

/// Config with `per_team` players on Radiant and Dire plus one spectator.
pub fn make_config(per_team: u64) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.lobby.match_id = MATCH_ID;
    config.relay.exec_config = Some("league.cfg".into());
    config.relay.server_ip = "10.0.0.5".into();
    config.relay.server_port = 27015;
    for i in 0..per_team {
        config.lobby.radiant.push(make_player(1000 + i, &format!("radiant{i}")));
        config.lobby.dire.push(make_player(2000 + i, &format!("dire{i}")));
    }
    config.lobby.spectators.push(make_player(3000, "caster"));
    config
}

pub fn make_player(steam_id: SteamId, name: &str) -> PlayerEntry {
    PlayerEntry {
        steam_id,
        name: name.to_string(),
        hero: None,
    }
}

/// Decode the lobby object carried by a shared-object update envelope.
pub fn lobby_from_update(env: &Envelope) -> gcrelay_lobby::LobbyObject {
    let update: messages::MultipleObjects = messages::decode_body(env).unwrap();
    let object = update
        .objects_modified
        .first()
        .or(update.objects_removed.first())
        .unwrap();
    serde_json::from_slice(&object.object_data).unwrap()
}
