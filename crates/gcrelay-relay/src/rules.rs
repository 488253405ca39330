//! Interception and rewrite rules for relayed GC traffic.
//!
//! Outbound (server -> GC): match-flow reports are consumed locally and
//! surfaced as [`RelayEvent`]s; nothing about them reaches the coordinator.
//! Inbound (GC -> server): coordinator noise is hidden, and the sign-out
//! permission response is rewritten in place to always grant.

use gcrelay_protocol::messages::{
    self, BatchPlayerResourcesResponse, ClientWelcome, ConnectedPlayers, GameMatchSignOut,
    GameMatchSignOutResponse, LiveScoreboardUpdate, PlayerFailedToConnect,
    SignOutPermissionResponse,
};
use gcrelay_protocol::{codec, emsg, Envelope, ProtoHeader, ProtocolError};

use crate::bridge::NotificationBridge;

/// A consumed outbound message, for the lobby and lifecycle to act on.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    LiveScoreboard(LiveScoreboardUpdate),
    PlayersFailedToConnect(PlayerFailedToConnect),
    ConnectedPlayers(ConnectedPlayers),
    /// The reply has already been injected when this is emitted.
    MatchSignOut(GameMatchSignOut),
}

#[derive(Debug, Clone)]
pub enum OutboundVerdict {
    /// Report success to the host without transmitting. `None` when the
    /// payload could not be decoded.
    Intercepted(Option<RelayEvent>),
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundVerdict {
    /// Hide the message from the host.
    Suppressed,
    /// Message rewritten in place; new total length.
    Rewritten(usize),
    PassThrough,
}

#[derive(Debug, Default)]
pub struct InterceptionRules {
    welcome_injected: bool,
    welcome_received: bool,
}

impl InterceptionRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn welcome_injected(&self) -> bool {
        self.welcome_injected
    }

    /// Inject the synthetic server welcome. Only the first call injects.
    pub fn inject_welcome(&mut self, bridge: &mut NotificationBridge) -> Result<bool, ProtocolError> {
        if self.welcome_injected {
            return Ok(false);
        }

        let welcome = messages::encode_structured(
            emsg::SERVER_WELCOME,
            &ProtoHeader::default(),
            &ClientWelcome { version: 1 },
        )?;
        bridge.inject(welcome);
        self.welcome_injected = true;

        tracing::info!("relay: server welcome injected");
        Ok(true)
    }

    /// Post-retrieve hook. True only for the first server welcome seen.
    pub fn on_retrieved(&mut self, msg_type: u32) -> bool {
        if codec::base_type(msg_type) != emsg::SERVER_WELCOME {
            return false;
        }
        tracing::info!("relay: received GC welcome");

        let first = !self.welcome_received;
        self.welcome_received = true;
        first
    }

    /// Server -> GC. `payload` is the full envelope handed to send.
    pub fn on_outbound(
        &mut self,
        msg_type: u32,
        payload: &[u8],
        match_id: u64,
        bridge: &mut NotificationBridge,
    ) -> OutboundVerdict {
        let id = codec::base_type(msg_type);
        match id {
            emsg::LIVE_SCOREBOARD_UPDATE => {
                tracing::debug!("relay: intercepted scoreboard update");
                intercept(id, payload, |env| {
                    Ok(RelayEvent::LiveScoreboard(messages::decode_body(env)?))
                })
            }
            emsg::PLAYER_FAILED_TO_CONNECT => {
                tracing::info!("relay: intercepted player failed to connect");
                intercept(id, payload, |env| {
                    Ok(RelayEvent::PlayersFailedToConnect(messages::decode_body(env)?))
                })
            }
            emsg::CONNECTED_PLAYERS => intercept(id, payload, |env| {
                let msg: ConnectedPlayers = messages::decode_body(env)?;
                tracing::info!(
                    send_reason = msg.send_reason,
                    connected = msg.connected_players.len(),
                    disconnected = msg.disconnected_players.len(),
                    "relay: intercepted connected players"
                );
                Ok(RelayEvent::ConnectedPlayers(msg))
            }),
            emsg::GAME_MATCH_SIGN_OUT => {
                tracing::info!(match_id, "relay: intercepted match sign-out");
                intercept(id, payload, |env| {
                    let header = ProtoHeader::from_bytes(&env.header)?;
                    let msg: GameMatchSignOut = messages::decode_body(env)?;

                    let reply_header = ProtoHeader {
                        job_id_source: None,
                        job_id_target: header.job_id_source,
                    };
                    let reply = messages::encode_structured(
                        emsg::GAME_MATCH_SIGN_OUT_RESPONSE,
                        &reply_header,
                        &GameMatchSignOutResponse { match_id },
                    )?;
                    bridge.inject(reply);

                    Ok(RelayEvent::MatchSignOut(msg))
                })
            }
            _ => OutboundVerdict::PassThrough,
        }
    }

    /// GC -> server. `buf` is the host's destination buffer (its length is
    /// the capacity) holding a message of `len` bytes.
    ///
    /// Only `BufferTooSmall` is returned as an error; a message that fails
    /// to parse is logged and passed through.
    pub fn on_inbound(
        &mut self,
        msg_type: u32,
        buf: &mut [u8],
        len: usize,
    ) -> Result<InboundVerdict, ProtocolError> {
        let id = codec::base_type(msg_type);
        match id {
            emsg::GC_TO_RELAY_CONNECT | emsg::GC_TO_SERVER_CONSOLE_COMMAND => {
                tracing::debug!(msg = emsg::name(id), "relay: suppressed inbound message");
                Ok(InboundVerdict::Suppressed)
            }
            emsg::REQUEST_BATCH_PLAYER_RESOURCES_RESPONSE => {
                match Envelope::decode(&buf[..len])
                    .and_then(|env| messages::decode_body::<BatchPlayerResourcesResponse>(&env))
                {
                    Ok(msg) => {
                        tracing::info!(results = msg.results.len(), "relay: batch player resources");
                        for result in &msg.results {
                            tracing::debug!(%result, "relay: batch player resource");
                        }
                    }
                    Err(e) => tracing::warn!("relay: unreadable batch player resources: {e}"),
                }
                Ok(InboundVerdict::PassThrough)
            }
            emsg::GAME_MATCH_SIGN_OUT_PERMISSION_RESPONSE => grant_permission(buf, len),
            _ => Ok(InboundVerdict::PassThrough),
        }
    }
}

fn intercept<F>(id: u32, payload: &[u8], handle: F) -> OutboundVerdict
where
    F: FnOnce(&Envelope) -> Result<RelayEvent, ProtocolError>,
{
    let event = Envelope::decode(payload).and_then(|env| handle(&env));
    match event {
        Ok(event) => OutboundVerdict::Intercepted(Some(event)),
        Err(e) => {
            tracing::warn!(msg = emsg::name(id), "relay: dropped undecodable outbound message: {e}");
            OutboundVerdict::Intercepted(None)
        }
    }
}

fn grant_permission(buf: &mut [u8], len: usize) -> Result<InboundVerdict, ProtocolError> {
    let parsed = Envelope::decode(&buf[..len]).and_then(|env| {
        let msg: SignOutPermissionResponse = messages::decode_body(&env)?;
        Ok((env.header, msg))
    });
    let (header, mut msg) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("relay: failed to parse sign-out permission response: {e}");
            return Ok(InboundVerdict::PassThrough);
        }
    };

    msg.permission_granted = true;
    msg.retry_delay_seconds = None;
    let body = serde_json::to_vec(&msg)?;

    let new_len = codec::rewrite_in_place(buf, &header, &body)?;
    tracing::info!(new_len, "relay: sign-out permission forced to granted");
    Ok(InboundVerdict::Rewritten(new_len))
}
