//! Notification bridge -- makes injected envelopes look like genuine GC traffic.
//!
//! The host's callback pump follows a strict one-announce / one-free
//! handshake per event. Any number of injected envelopes is covered by a
//! single synthetic announcement; the queue itself is drained through the
//! coordinator read path, which always prefers injected envelopes.

use std::collections::VecDeque;

use gcrelay_protocol::codec;

use crate::{CallbackPump, Coordinator, GcResult, Retrieved};

/// Synthetic-callback state. Independent of queue contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyState {
    #[default]
    Idle,
    Announced,
    Delivered,
}

impl NotifyState {
    pub fn name(&self) -> &'static str {
        match self {
            NotifyState::Idle => "idle",
            NotifyState::Announced => "announced",
            NotifyState::Delivered => "delivered",
        }
    }
}

/// Result of a callback poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackPoll {
    /// Fabricated "message available" callback.
    Synthetic,
    /// Result of the real pump, unmodified.
    Passthrough(bool),
}

impl CallbackPoll {
    pub fn available(&self) -> bool {
        match self {
            CallbackPoll::Synthetic => true,
            CallbackPoll::Passthrough(available) => *available,
        }
    }
}

/// FIFO of fully encoded envelopes waiting to be retrieved by the host.
#[derive(Debug, Default)]
pub struct InjectionQueue {
    items: VecDeque<Vec<u8>>,
}

impl InjectionQueue {
    pub fn push(&mut self, envelope: Vec<u8>) {
        self.items.push_back(envelope);
    }

    pub fn front(&self) -> Option<&[u8]> {
        self.items.front().map(Vec::as_slice)
    }

    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct NotificationBridge {
    state: NotifyState,
    queue: InjectionQueue,
}

impl NotificationBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NotifyState {
        self.state
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Queue an envelope. Arms the synthetic announcement only from `Idle`.
    pub fn inject(&mut self, envelope: Vec<u8>) {
        let msg_type = codec::peek_type(&envelope).unwrap_or_default();
        tracing::debug!(
            msg_type = codec::base_type(msg_type),
            size = envelope.len(),
            queued = self.queue.len() + 1,
            "relay: injected message"
        );

        self.queue.push(envelope);
        if self.state == NotifyState::Idle {
            self.state = NotifyState::Announced;
        }
    }

    /// Host poll for a callback.
    pub fn poll(&mut self, pump: &mut dyn CallbackPump) -> CallbackPoll {
        if self.state == NotifyState::Announced {
            self.state = NotifyState::Delivered;
            tracing::trace!("relay: synthetic callback delivered");
            return CallbackPoll::Synthetic;
        }
        CallbackPoll::Passthrough(pump.poll_callback())
    }

    /// Host release of the last callback. The real free is suppressed for
    /// the synthetic one.
    pub fn acknowledge(&mut self, pump: &mut dyn CallbackPump) {
        if self.state == NotifyState::Delivered {
            self.state = NotifyState::Idle;
            tracing::trace!("relay: synthetic callback released");
            return;
        }
        pump.free_last_callback();
    }

    /// Size of the next message. Injected envelopes take precedence.
    pub fn peek_available_size(&self, coordinator: &mut dyn Coordinator) -> Option<u32> {
        match self.queue.front() {
            Some(front) => Some(front.len() as u32),
            None => coordinator.is_message_available(),
        }
    }

    /// Retrieve the next message into `dest`. Injected envelopes take
    /// precedence; one that does not fit stays queued.
    pub fn take_next(&mut self, dest: &mut [u8], coordinator: &mut dyn Coordinator) -> Retrieved {
        let Some(front) = self.queue.front() else {
            return coordinator.retrieve_message(dest);
        };

        let msg_type = codec::peek_type(front).unwrap_or_default();
        let size = front.len();
        if size > dest.len() {
            tracing::debug!(
                msg_type = codec::base_type(msg_type),
                size,
                capacity = dest.len(),
                "relay: injected message does not fit"
            );
            return Retrieved {
                result: GcResult::BufferTooSmall,
                msg_type,
                size,
            };
        }

        dest[..size].copy_from_slice(front);
        self.queue.pop();

        Retrieved {
            result: GcResult::Ok,
            msg_type,
            size,
        }
    }
}
