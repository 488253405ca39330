//! Activation, welcome handshake and inbound filtering.

use std::sync::{Arc, Mutex};

use gcrelay_node::{ActivationError, RelayRuntime};
use gcrelay_protocol::messages::{self, ClientWelcome, SignOutPermissionResponse};
use gcrelay_protocol::{emsg, ProtoHeader};
use gcrelay_relay::{GcResult, NotifyState};
use serde_json::json;

use crate::harness::{
    make_config, CoordinatorLog, DeliveryLog, HostLog, MockCoordinator, MockDelivery, MockHost,
    MockPump, PumpLog, TestRelay,
};

#[test]
fn test_activation_injects_welcome() {
    let mut relay = TestRelay::start(make_config(1));
    assert_eq!(relay.runtime.bridge().queued(), 1);
    assert_eq!(relay.runtime.bridge().state(), NotifyState::Announced);
    assert!(relay.runtime.rules().welcome_injected());

    // Synthetic callback never touches the real pump
    assert!(relay.pump_once());
    {
        let pump = relay.pump.lock().unwrap();
        assert_eq!(pump.polls, 0);
        assert_eq!(pump.frees, 0);
    }

    let msgs = relay.drain_messages();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].base_type(), emsg::SERVER_WELCOME);
    assert!(msgs[0].is_structured());
    assert_eq!(relay.commands(), vec!["exec league.cfg".to_string()]);

    let docs = relay.documents();
    assert_eq!(
        docs[0],
        json!({ "match_id": 0, "status": "startup", "ip": "10.0.0.5", "port": 27015 })
    );
}

#[test]
fn test_exec_config_only_on_first_welcome() {
    let mut relay = TestRelay::start(make_config(1));
    relay.drain_messages();

    relay.push_inbound(emsg::SERVER_WELCOME, &ClientWelcome { version: 2 });
    let msgs = relay.drain_messages();
    assert_eq!(msgs.len(), 1);

    let execs = relay.commands().iter().filter(|c| c.starts_with("exec")).count();
    assert_eq!(execs, 1);
}

#[test]
fn test_real_callbacks_pass_through_after_synthetic() {
    let mut relay = TestRelay::start(make_config(1));
    assert!(relay.pump_once());
    assert_eq!(relay.runtime.bridge().state(), NotifyState::Idle);

    // Nothing pending on the real pump
    assert!(!relay.pump_once());

    relay.pump.lock().unwrap().pending = 1;
    assert!(relay.pump_once());
    let pump = relay.pump.lock().unwrap();
    assert_eq!(pump.polls, 2);
    assert_eq!(pump.frees, 1);
}

#[test]
fn test_inbound_noise_suppressed() {
    let mut relay = TestRelay::start(make_config(1));
    relay.drain_messages();

    relay.push_inbound(emsg::GC_TO_RELAY_CONNECT, &json!({}));
    relay.push_inbound(emsg::GC_TO_SERVER_CONSOLE_COMMAND, &json!({ "command": "quit" }));
    relay.push_inbound(
        emsg::REQUEST_BATCH_PLAYER_RESOURCES_RESPONSE,
        &json!({ "results": [{ "account_id": 1, "rank": 3 }] }),
    );

    let msgs = relay.drain_messages();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].base_type(), emsg::REQUEST_BATCH_PLAYER_RESOURCES_RESPONSE);
    assert!(relay.coordinator.lock().unwrap().inbound.is_empty());
}

#[test]
fn test_permission_response_forced_granted() {
    let mut relay = TestRelay::start(make_config(1));
    relay.drain_messages();

    relay.push_inbound(
        emsg::GAME_MATCH_SIGN_OUT_PERMISSION_RESPONSE,
        &json!({ "permission_granted": false, "retry_delay_seconds": 30, "abandon_signout": false }),
    );

    let msgs = relay.drain_messages();
    assert_eq!(msgs.len(), 1);
    let response: SignOutPermissionResponse = messages::decode_body(&msgs[0]).unwrap();
    assert!(response.permission_granted);
    assert_eq!(response.retry_delay_seconds, None);
    assert_eq!(response.extra["abandon_signout"], json!(false));
}

#[test]
fn test_unintercepted_outbound_reaches_coordinator() {
    let mut relay = TestRelay::start(make_config(1));
    let result = relay.send(
        emsg::REQUEST_BATCH_PLAYER_RESOURCES,
        &ProtoHeader::default(),
        &json!({ "account_ids": [1, 2] }),
    );
    assert_eq!(result, GcResult::Ok);

    let coordinator = relay.coordinator.lock().unwrap();
    assert_eq!(coordinator.sent.len(), 1);
    assert_eq!(
        coordinator.sent[0].0,
        emsg::REQUEST_BATCH_PLAYER_RESOURCES | gcrelay_protocol::STRUCTURED_FLAG
    );
}

#[test]
fn test_missing_interception_points_block_activation() {
    let host = Arc::new(Mutex::new(HostLog::default()));
    let delivery = Arc::new(Mutex::new(DeliveryLog::default()));

    let result = RelayRuntime::new(
        make_config(1),
        None,
        Box::new(MockHost(host.clone())),
        Box::new(MockDelivery(delivery.clone())),
    );
    assert!(matches!(result, Err(ActivationError::MissingCallbackPump)));

    let pump = Arc::new(Mutex::new(PumpLog::default()));
    let mut runtime = RelayRuntime::new(
        make_config(1),
        Some(Box::new(MockPump(pump))),
        Box::new(MockHost(host)),
        Box::new(MockDelivery(delivery.clone())),
    )
    .unwrap();
    let result = runtime.on_steam_api_activated(None);
    assert!(matches!(result, Err(ActivationError::MissingCoordinator)));
    assert_eq!(runtime.bridge().queued(), 0);
    assert!(delivery.lock().unwrap().documents.is_empty());

    // Not yet activated: reads see nothing, sends are refused
    assert_eq!(runtime.is_message_available(), None);
    assert_eq!(runtime.send_message(emsg::REQUEST_BATCH_PLAYER_RESOURCES, b""), GcResult::NotLoggedOn);

    let coordinator = Arc::new(Mutex::new(CoordinatorLog::default()));
    runtime
        .on_steam_api_activated(Some(Box::new(MockCoordinator(coordinator))))
        .unwrap();
    assert_eq!(runtime.bridge().queued(), 1);
}

#[test]
fn test_repeat_activation_ignored() {
    let mut relay = TestRelay::start(make_config(1));
    relay.drain_messages();

    let other = Arc::new(Mutex::new(CoordinatorLog::default()));
    relay
        .runtime
        .on_steam_api_activated(Some(Box::new(MockCoordinator(other.clone()))))
        .unwrap();
    assert_eq!(relay.runtime.bridge().queued(), 0);

    let startups = relay.documents().iter().filter(|d| d["status"] == "startup").count();
    assert_eq!(startups, 1);

    // Pass-through traffic still reaches the first coordinator
    assert_eq!(
        relay.runtime.send_message(emsg::REQUEST_BATCH_PLAYER_RESOURCES, b""),
        GcResult::Ok
    );
    assert_eq!(relay.coordinator.lock().unwrap().sent.len(), 1);
    assert!(other.lock().unwrap().sent.is_empty());
}
