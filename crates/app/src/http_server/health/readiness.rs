use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::version::build_info;
use crate::ServiceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayStatus {
    /// Accepting connections
    Ready,
    /// Shutdown has begun, open sockets are being closed
    Draining,
}

/// Body of `GET /_status/readyz`, returned with 200 when ready and 503 when
/// draining
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub status: RelayStatus,
    pub version: String,
    /// Open WebSocket connections, joined or not
    pub connections: usize,
    /// Authenticated sessions
    pub users: usize,
    pub handshake_running: bool,
    pub completed_handshakes: u64,
}

impl Readiness {
    pub fn of(state: &ServiceState) -> Self {
        let lobby = state.lobby();
        let status = if state.is_shutting_down() {
            RelayStatus::Draining
        } else {
            RelayStatus::Ready
        };
        Self {
            status,
            version: build_info().version.to_string(),
            connections: lobby.hub().connection_count(),
            users: lobby.live_count(),
            handshake_running: lobby.coordinator().is_running(),
            completed_handshakes: lobby.coordinator().completed_runs(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == RelayStatus::Ready
    }
}

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Response {
    let readiness = Readiness::of(&state);
    let code = if readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(readiness)).into_response()
}
