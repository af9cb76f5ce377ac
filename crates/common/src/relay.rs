//! Group message relay: deliver to every live session except the sender

use std::sync::Arc;

use chrono::Utc;

use crate::events::{MessageReceived, OutboundEvent};
use crate::hub::EventSink;
use crate::session::{ConnectionId, SessionStore};

#[derive(Clone)]
pub struct Relay {
    sessions: SessionStore,
    sink: Arc<dyn EventSink>,
}

impl Relay {
    pub fn new(sessions: SessionStore, sink: Arc<dyn EventSink>) -> Self {
        Self { sessions, sink }
    }

    /// Route `message` from `sender` to all other live sessions.
    ///
    /// Senders without a live session are ignored. Returns the number of
    /// recipients the message was handed to; recipients whose connection has
    /// gone stale are skipped without affecting the rest.
    pub fn route(&self, sender: ConnectionId, message: &str) -> usize {
        let snapshot = self.sessions.snapshot();
        let Some(from) = snapshot.iter().find(|s| s.connection_id == sender) else {
            tracing::debug!(connection = %sender, "RELAY: ignoring message from unauthenticated connection");
            return 0;
        };

        let payload = MessageReceived::new(from.username.clone(), message, Utc::now());

        let mut delivered = 0;
        for recipient in snapshot.iter().filter(|s| s.connection_id != sender) {
            let event = OutboundEvent::MessageReceived(payload.clone());
            if self.sink.send_to(recipient.connection_id, event) {
                delivered += 1;
            }
        }

        tracing::info!(
            "RELAY: message from {} delivered to {} users",
            from.username,
            delivered
        );
        delivered
    }
}
