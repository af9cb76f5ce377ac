use clap::Args;

use securetalk::state::{AppConfig, AppState, DEFAULT_LISTEN_PORT};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Port the relay listens on
    #[arg(long, default_value_t = DEFAULT_LISTEN_PORT)]
    pub port: u16,

    /// Milliseconds between two users being online and the first handshake step
    #[arg(long, default_value_t = 1000)]
    pub handshake_start_delay_ms: u64,

    /// Milliseconds between handshake steps
    #[arg(long, default_value_t = 2000)]
    pub handshake_step_delay_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] securetalk::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            listen_port: self.port,
            handshake_start_delay_ms: self.handshake_start_delay_ms,
            handshake_step_delay_ms: self.handshake_step_delay_ms,
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        Ok(format!(
            "Initialized securetalk directory at: {}\n\
             - Config: {}\n\
             - Listen port: {}\n\
             - Handshake delays: start {}ms, step {}ms",
            state.app_dir.display(),
            state.config_path.display(),
            state.config.listen_port,
            state.config.handshake_start_delay_ms,
            state.config.handshake_step_delay_ms,
        ))
    }
}
