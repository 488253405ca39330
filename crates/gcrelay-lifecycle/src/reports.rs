//! Report documents posted to the match endpoint.

use gcrelay_lobby::Member;
use gcrelay_protocol::emsg;
use gcrelay_protocol::messages::{GameMatchSignOut, LiveScoreboardUpdate, PlayerFailedToConnect};
use serde_json::{json, Map, Value};

/// Final match document built from a sign-out and its nested records.
pub fn signout_report(record: &GameMatchSignOut, match_id: u64) -> serde_json::Result<Value> {
    let mut additional = Vec::new();
    for nested in &record.additional_msgs {
        let kind = match nested.id {
            emsg::PLAYER_STATS_MATCH_SIGN_OUT => "PlayerStats",
            emsg::SIGN_OUT_COMMUNICATION_SUMMARY => "CommunicationSummary",
            other => {
                tracing::debug!(id = other, "report: skipping unknown nested sign-out record");
                continue;
            }
        };

        let mut entry = Map::new();
        entry.insert("MsgType".into(), kind.into());
        match serde_json::from_slice::<Value>(&nested.contents) {
            Ok(data) => {
                entry.insert("MsgData".into(), data);
            }
            Err(e) => tracing::warn!(kind, "report: unreadable nested record: {e}"),
        }
        additional.push(Value::Object(entry));
    }

    let mut stripped = record.clone();
    stripped.additional_msgs.clear();

    let mut doc = serde_json::to_value(&stripped)?;
    if let Value::Object(map) = &mut doc {
        map.insert("additional_msgs".into(), Value::Array(additional));
        map.insert("status".into(), "completed".into());
        map.insert("match_id".into(), match_id.into());
    }
    Ok(doc)
}

/// Minimal report when nobody managed to load.
///
/// `connected_players` carries the same ids as `failed_players`.
pub fn load_failed_report(record: &PlayerFailedToConnect, roster: &[Member], match_id: u64) -> Value {
    let failed: Vec<u64> = roster
        .iter()
        .filter(|m| {
            record.abandoned_loaders.contains(&m.id) || record.failed_loaders.contains(&m.id)
        })
        .map(|m| m.id)
        .collect();

    json!({
        "match_id": match_id,
        "status": "load_failed",
        "failed_players": failed,
        "connected_players": failed,
    })
}

pub fn live_update(record: &LiveScoreboardUpdate, match_id: u64) -> serde_json::Result<Value> {
    let mut doc = serde_json::to_value(record)?;
    if let Value::Object(map) = &mut doc {
        map.insert("status".into(), "update".into());
        map.insert("match_id".into(), match_id.into());
    }
    Ok(doc)
}

pub fn startup_notice(ip: &str, port: u16) -> Value {
    json!({ "match_id": 0, "status": "startup", "ip": ip, "port": port })
}

pub fn shutdown_notice(match_id: u64) -> Value {
    json!({ "match_id": match_id, "status": "shutdown" })
}
