//! Connection lifecycle facade
//!
//! The [`Lobby`] owns the ledger, session store, hub, relay and handshake
//! coordinator, and wires them together for the three things a connection can
//! do: join, send a message, and go away.
//!
//! Every population change (join or disconnect) runs the sequence
//! "mutate store, broadcast `userListUpdate`, evaluate handshake" under one
//! membership lock. Combined with FIFO per-connection channels this gives every
//! connection the same, mutation-ordered view of the user list.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::credentials::{CredentialError, CredentialLedger};
use crate::events::{InboundEvent, JoinErrorPayload, JoinSuccess, OutboundEvent};
use crate::handshake::{HandshakeConfig, HandshakeCoordinator};
use crate::hub::{EventReceiver, EventSink, Hub};
use crate::relay::Relay;
use crate::session::{ConnectionId, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("connection closed before join completed")]
    Disconnected,
}

impl JoinError {
    /// Message shown to the requesting client. Internal detail stays in the logs.
    pub fn client_message(&self) -> &'static str {
        match self {
            JoinError::Credentials(CredentialError::InvalidCredentialFormat) => {
                "Invalid username or password"
            }
            JoinError::Credentials(CredentialError::InvalidPassword) => "Invalid password",
            JoinError::Credentials(CredentialError::AuthenticationFailure(_))
            | JoinError::Disconnected => "Authentication failed",
        }
    }
}

#[derive(Clone)]
pub struct Lobby {
    ledger: CredentialLedger,
    sessions: SessionStore,
    hub: Hub,
    relay: Relay,
    coordinator: HandshakeCoordinator,
    membership: Arc<Mutex<()>>,
}

impl Lobby {
    pub fn new(ledger: CredentialLedger, handshake: HandshakeConfig) -> Self {
        let sessions = SessionStore::new();
        let hub = Hub::new();
        let sink: Arc<dyn EventSink> = Arc::new(hub.clone());
        Self {
            ledger,
            relay: Relay::new(sessions.clone(), sink.clone()),
            coordinator: HandshakeCoordinator::new(handshake, sink),
            sessions,
            hub,
            membership: Arc::new(Mutex::new(())),
        }
    }

    pub fn ledger(&self) -> &CredentialLedger {
        &self.ledger
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn coordinator(&self) -> &HandshakeCoordinator {
        &self.coordinator
    }

    /// Number of authenticated sessions
    pub fn live_count(&self) -> usize {
        self.sessions.len()
    }

    /// Accept a new transport connection and return its outbound event stream
    pub fn connect(&self) -> (ConnectionId, EventReceiver) {
        let connection_id = ConnectionId::new();
        let rx = self.hub.register(connection_id);
        tracing::info!("New connection: {}", connection_id);
        (connection_id, rx)
    }

    /// Dispatch one inbound event
    pub async fn handle(&self, connection_id: ConnectionId, event: InboundEvent) {
        match event {
            InboundEvent::Join(req) => {
                // failures are already reported to the client and logged
                let _ = self.join(connection_id, &req.username, &req.password).await;
            }
            InboundEvent::SendMessage(req) => {
                self.send_message(connection_id, &req.message);
            }
        }
    }

    /// Parse and dispatch a raw text frame. Malformed frames are logged and dropped.
    pub async fn handle_frame(&self, connection_id: ConnectionId, frame: &str) {
        match serde_json::from_str::<InboundEvent>(frame) {
            Ok(event) => self.handle(connection_id, event).await,
            Err(e) => {
                tracing::warn!(connection = %connection_id, "ignoring malformed frame: {}", e);
            }
        }
    }

    /// Authenticate a connection and open its session.
    ///
    /// On success the requester receives `joinSuccess` and everybody receives
    /// the new `userListUpdate`; on failure only the requester hears about it.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        username: &str,
        password: &str,
    ) -> Result<JoinSuccess, JoinError> {
        tracing::info!("Join request: {}", username);

        let admission = match self.ledger.admit(username, password).await {
            Ok(admission) => admission,
            Err(e) => return Err(self.reject(connection_id, e.into())),
        };

        let _membership = self.membership.lock();
        if !self.hub.is_registered(connection_id) {
            return Err(self.reject(connection_id, JoinError::Disconnected));
        }

        let session = self.sessions.create_session(connection_id, username);
        let success = JoinSuccess {
            username: session.username.clone(),
            is_new_user: admission.is_new_user(),
            public_key: session.public_key(),
        };
        tracing::info!(
            "User authenticated: {} (new user: {})",
            username,
            success.is_new_user
        );

        self.hub
            .send_to(connection_id, OutboundEvent::JoinSuccess(success.clone()));
        self.publish_population();

        Ok(success)
    }

    /// Relay a message from an authenticated connection to everybody else
    pub fn send_message(&self, connection_id: ConnectionId, message: &str) -> usize {
        self.relay.route(connection_id, message)
    }

    /// Tear down a connection. Only connections with a session trigger a
    /// `userListUpdate`; the departing connection receives nothing.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        let _membership = self.membership.lock();
        self.hub.unregister(connection_id);

        match self.sessions.remove_session(connection_id) {
            Some(session) => {
                tracing::info!("User disconnected: {} ({})", session.username, connection_id);
                self.publish_population();
            }
            None => tracing::info!("Connection closed: {}", connection_id),
        }
    }

    /// Caller must hold the membership lock
    fn publish_population(&self) {
        let snapshot = self.sessions.snapshot();
        let users = snapshot.iter().map(|s| s.to_public()).collect();
        self.hub.broadcast(OutboundEvent::UserListUpdate(users));

        if snapshot.len() >= 2 && self.coordinator.on_population_changed(&snapshot).is_some() {
            tracing::info!("Starting handshake between users");
        }
    }

    fn reject(&self, connection_id: ConnectionId, error: JoinError) -> JoinError {
        match &error {
            JoinError::Credentials(CredentialError::AuthenticationFailure(detail)) => {
                tracing::error!(connection = %connection_id, "Join error: {}", detail);
            }
            other => tracing::warn!(connection = %connection_id, "Join rejected: {}", other),
        }
        self.hub.send_to(
            connection_id,
            OutboundEvent::JoinError(JoinErrorPayload {
                message: error.client_message().to_string(),
            }),
        );
        error
    }
}
