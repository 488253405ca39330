//! gcrelay Relay -- notification bridge and interception rules.
//!
//! The host talks to the game coordinator through two mechanisms: a callback
//! pump (poll / free) that announces pending traffic, and the coordinator
//! interface itself (is-available / retrieve / send). Both are abstracted as
//! traits here so the relay can sit in front of whatever interception
//! capability the host process offers.

pub mod bridge;
pub mod rules;

pub use bridge::{CallbackPoll, InjectionQueue, NotificationBridge, NotifyState};
pub use rules::{InboundVerdict, InterceptionRules, OutboundVerdict, RelayEvent};

/// Result codes of the coordinator interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcResult {
    Ok,
    NoMessage,
    BufferTooSmall,
    NotLoggedOn,
    InvalidMessage,
}

/// Outcome of a retrieve call. `size` is the full message size, also when
/// the destination was too small.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retrieved {
    pub result: GcResult,
    pub msg_type: u32,
    pub size: usize,
}

impl Retrieved {
    pub fn no_message() -> Self {
        Self {
            result: GcResult::NoMessage,
            msg_type: 0,
            size: 0,
        }
    }
}

/// The host's real callback mechanism.
pub trait CallbackPump {
    /// Poll for a pending callback. True when one is available.
    fn poll_callback(&mut self) -> bool;
    /// Release the callback returned by the last successful poll.
    fn free_last_callback(&mut self);
}

/// The host's real coordinator interface.
pub trait Coordinator {
    /// Size of the next pending message, if any.
    fn is_message_available(&mut self) -> Option<u32>;
    /// Copy the next pending message into `dest` (capacity `dest.len()`).
    fn retrieve_message(&mut self, dest: &mut [u8]) -> Retrieved;
    /// Transmit a message to the coordinator.
    fn send_message(&mut self, msg_type: u32, data: &[u8]) -> GcResult;
}
