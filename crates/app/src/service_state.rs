use std::sync::Arc;

use common::credentials::CredentialLedger;
use common::lobby::Lobby;
use tokio::sync::watch;

use super::service_config::Config;

/// Main service state, shared by every HTTP and WebSocket handler
#[derive(Clone)]
pub struct State {
    lobby: Lobby,
    draining: Arc<watch::Sender<bool>>,
}

impl State {
    pub fn from_config(config: &Config) -> Self {
        tracing::debug!(
            start_delay = ?config.handshake.start_delay,
            step_delay = ?config.handshake.step_delay,
            "ServiceState::from_config - building lobby"
        );
        Self::with_lobby(Lobby::new(CredentialLedger::new(), config.handshake))
    }

    pub fn with_lobby(lobby: Lobby) -> Self {
        let (draining, _) = watch::channel(false);
        Self {
            lobby,
            draining: Arc::new(draining),
        }
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    /// Flag the service as draining. Readiness checks start failing and open
    /// WebSocket connections are asked to close.
    pub fn begin_shutdown(&self) {
        self.draining.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.draining.borrow()
    }

    /// Resolves once [`State::begin_shutdown`] has been called
    pub async fn drained(&self) {
        let mut rx = self.draining.subscribe();
        // cannot fail: the sender is owned by self
        let _ = rx.wait_for(|draining| *draining).await;
    }
}

impl AsRef<Lobby> for State {
    fn as_ref(&self) -> &Lobby {
        &self.lobby
    }
}
