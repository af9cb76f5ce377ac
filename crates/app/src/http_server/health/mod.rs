//! Probes under `/_status`
//!
//! `livez` answers as long as the process serves HTTP. `readyz` reports the
//! relay's own condition and turns 503 once shutdown has begun, so a load
//! balancer stops sending new WebSocket upgrades while open sockets drain.

use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;

use crate::ServiceState;

pub mod readiness;

pub const LIVEZ_PATH: &str = "/livez";
pub const READYZ_PATH: &str = "/readyz";

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route(LIVEZ_PATH, get(livez))
        .route(READYZ_PATH, get(readiness::handler))
        .with_state(state)
}

#[tracing::instrument]
async fn livez() -> Response {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
}
