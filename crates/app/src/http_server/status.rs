use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use common::events::iso_timestamp;

use crate::ServiceState;

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    /// Authenticated sessions right now
    pub users: usize,
    pub timestamp: String,
}

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Response {
    let body = StatusResponse {
        status: "ok".to_string(),
        users: state.lobby().live_count(),
        timestamp: iso_timestamp(Utc::now()),
    };
    (StatusCode::OK, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use common::credentials::CredentialLedger;
    use common::handshake::HandshakeConfig;
    use common::lobby::Lobby;

    use super::*;

    async fn read_status(response: Response) -> StatusResponse {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_handler_direct() {
        let lobby = Lobby::new(
            CredentialLedger::with_cost(1024, 1).unwrap(),
            HandshakeConfig::default(),
        );
        let state = ServiceState::with_lobby(lobby.clone());

        let response = handler(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let status = read_status(response).await;
        assert_eq!(status.status, "ok");
        assert_eq!(status.users, 0);
        assert!(status.timestamp.ends_with('Z'));

        // connected but not joined does not count
        let (pending, _rx_pending) = lobby.connect();
        let (joined, _rx_joined) = lobby.connect();
        lobby.join(joined, "alice", "secret1").await.unwrap();

        let status = read_status(handler(State(state.clone())).await).await;
        assert_eq!(status.users, 1);

        lobby.disconnect(joined);
        lobby.disconnect(pending);
        let status = read_status(handler(State(state)).await).await;
        assert_eq!(status.users, 0);
    }
}
