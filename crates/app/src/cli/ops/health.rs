use std::convert::Infallible;

use clap::Args;

use securetalk::http_server::health::readiness::{Readiness, RelayStatus};
use securetalk::http_server::health::{LIVEZ_PATH, READYZ_PATH};
use securetalk::http_server::status::StatusResponse;
use securetalk::http_server::{HEALTH_PATH, STATUS_PREFIX};
use securetalk::state::AppState;

use crate::cli::op::OpContext;

#[derive(Args, Debug, Clone)]
pub struct Health;

impl Health {
    async fn probe(ctx: &OpContext, path: &str) -> String {
        match ctx.client.get(ctx.endpoint(path)).send().await {
            Ok(resp) if resp.status().is_success() => "OK".to_string(),
            Ok(resp) => format!("UNHEALTHY ({})", resp.status()),
            Err(_) => "NOT REACHABLE".to_string(),
        }
    }

    /// The readiness body is sent with both 200 and 503
    async fn readiness(ctx: &OpContext) -> Result<Readiness, reqwest::Error> {
        ctx.client
            .get(ctx.endpoint(&format!("{}{}", STATUS_PREFIX, READYZ_PATH)))
            .send()
            .await?
            .json()
            .await
    }

    async fn status(ctx: &OpContext) -> Result<StatusResponse, reqwest::Error> {
        ctx.client
            .get(ctx.endpoint(HEALTH_PATH))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = Infallible;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        // 1. Check config directory
        lines.push("Config:".to_string());
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                lines.push(format!("  directory:   {}", state.app_dir.display()));
                lines.push("  config.toml: OK".to_string());
                lines.push(format!("  listen_port: {}", state.config.listen_port));
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        // 2. Check relay liveness and readiness
        lines.push(String::new());
        lines.push(format!("Relay ({}):", ctx.remote));
        let livez = format!("{}{}", STATUS_PREFIX, LIVEZ_PATH);
        lines.push(format!("  livez:  {}", Self::probe(ctx, &livez).await));
        match Self::readiness(ctx).await {
            Ok(readiness) => {
                let verdict = match readiness.status {
                    RelayStatus::Ready => "OK",
                    RelayStatus::Draining => "DRAINING",
                };
                lines.push(format!("  readyz: {}", verdict));
                lines.push(format!("  version: {}", readiness.version));
                lines.push(format!("  connections: {}", readiness.connections));
                lines.push(format!(
                    "  handshake: {} ({} completed)",
                    if readiness.handshake_running { "running" } else { "idle" },
                    readiness.completed_handshakes
                ));
            }
            Err(e) if e.is_connect() || e.is_timeout() => {
                lines.push("  readyz: NOT REACHABLE".to_string())
            }
            Err(e) => lines.push(format!("  readyz: UNHEALTHY ({})", e)),
        }

        // 3. Report who is online
        match Self::status(ctx).await {
            Ok(status) => {
                lines.push(format!("  users:  {}", status.users));
                lines.push(format!("  as of:  {}", status.timestamp));
            }
            Err(e) => lines.push(format!("  health: {}", e)),
        }

        Ok(lines.join("\n"))
    }
}
