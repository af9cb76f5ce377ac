//! Live session bookkeeping
//!
//! The [`SessionStore`] is the single source of truth for which connections are
//! authenticated and which key material they hold. Iteration order is the order in
//! which connections first joined; it drives both the `userListUpdate` broadcast and
//! handshake participant selection.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::KeyPair;

/// Opaque handle identifying one transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated state bound to one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub username: String,
    pub key_pair: KeyPair,
}

impl Session {
    pub fn public_key(&self) -> u64 {
        self.key_pair.public_key()
    }

    /// The only view of a session that may be shown to other connections
    pub fn to_public(&self) -> PublicSession {
        PublicSession {
            username: self.username.clone(),
            public_key: self.key_pair.public_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSession {
    pub username: String,
    pub public_key: u64,
}

/// Insertion-ordered map of live sessions keyed by connection id
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Vec<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session with fresh key material.
    ///
    /// An existing session for the same connection is overwritten in place: it
    /// keeps its position in iteration order but gets an entirely new key pair.
    pub fn create_session(&self, connection_id: ConnectionId, username: &str) -> Session {
        let session = Session {
            connection_id,
            username: username.to_string(),
            key_pair: KeyPair::generate(),
        };

        let mut sessions = self.inner.write();
        match sessions
            .iter_mut()
            .find(|s| s.connection_id == connection_id)
        {
            Some(existing) => {
                tracing::debug!(
                    connection = %connection_id,
                    previous = %existing.username,
                    "SESSIONS: replacing session"
                );
                *existing = session.clone();
            }
            None => sessions.push(session.clone()),
        }

        session
    }

    /// Remove the session for a connection. Removing an absent id is a no-op.
    pub fn remove_session(&self, connection_id: ConnectionId) -> Option<Session> {
        let mut sessions = self.inner.write();
        let index = sessions
            .iter()
            .position(|s| s.connection_id == connection_id)?;
        Some(sessions.remove(index))
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<Session> {
        self.inner
            .read()
            .iter()
            .find(|s| s.connection_id == connection_id)
            .cloned()
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.inner
            .read()
            .iter()
            .any(|s| s.connection_id == connection_id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// All live sessions in insertion order
    pub fn snapshot(&self) -> Vec<Session> {
        self.inner.read().clone()
    }

    /// Public projection of [`Self::snapshot`]
    pub fn public_snapshot(&self) -> Vec<PublicSession> {
        self.inner.read().iter().map(Session::to_public).collect()
    }
}
