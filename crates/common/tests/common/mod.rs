//! Shared helpers for lobby integration tests
#![allow(dead_code)]

use common::credentials::CredentialLedger;
use common::events::{HandshakeStepEvent, OutboundEvent};
use common::handshake::HandshakeConfig;
use common::hub::EventReceiver;
use common::lobby::Lobby;
use common::session::ConnectionId;

/// A lobby with cheap password hashing and default handshake pacing
pub fn setup_lobby() -> Lobby {
    setup_lobby_with(HandshakeConfig::default())
}

pub fn setup_lobby_with(handshake: HandshakeConfig) -> Lobby {
    let ledger = CredentialLedger::with_cost(1024, 1).unwrap();
    Lobby::new(ledger, handshake)
}

/// A connected client: its id and outbound event stream
pub struct TestClient {
    pub id: ConnectionId,
    pub rx: EventReceiver,
}

impl TestClient {
    pub fn connect(lobby: &Lobby) -> Self {
        let (id, rx) = lobby.connect();
        Self { id, rx }
    }

    /// Connect and join with a fixed password
    pub async fn join(lobby: &Lobby, username: &str) -> Self {
        let client = Self::connect(lobby);
        lobby.join(client.id, username, "secret1").await.unwrap();
        client
    }

    pub fn drain(&self) -> Vec<OutboundEvent> {
        self.rx.try_iter().collect()
    }

    /// Usernames of every userListUpdate received so far
    pub fn user_lists(&self) -> Vec<Vec<String>> {
        self.drain()
            .into_iter()
            .filter_map(|e| match e {
                OutboundEvent::UserListUpdate(users) => {
                    Some(users.into_iter().map(|u| u.username).collect())
                }
                _ => None,
            })
            .collect()
    }

    /// Wait for the next handshakeStep, skipping other events
    pub async fn next_handshake_step(&self) -> HandshakeStepEvent {
        loop {
            match self.rx.recv_async().await.unwrap() {
                OutboundEvent::HandshakeStep(step) => return step,
                _ => continue,
            }
        }
    }
}

pub fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
