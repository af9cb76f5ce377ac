use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use securetalk::state::{AppConfig, AppState};
use securetalk::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Serve {
    /// Override the configured listen port
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Write daily-rotated log files to this directory as well as stdout
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value_t = tracing::Level::INFO)]
    pub log_level: tracing::Level,
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("state error: {0}")]
    StateError(#[from] securetalk::state::StateError),

    #[error("relay failed: {0}")]
    Failed(#[from] std::io::Error),
}

impl Serve {
    fn service_config(&self, config: &AppConfig) -> ServiceConfig {
        let port = self.port.unwrap_or(config.listen_port);
        ServiceConfig {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            handshake: config.handshake(),
            log_level: self.log_level,
            log_dir: self.log_dir.clone(),
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Serve {
    type Error = ServeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        // an uninitialized directory just means defaults
        let config = AppState::load_or_default(ctx.config_path.clone())?;
        let service_config = self.service_config(&config);

        spawn_service(&service_config).await?;
        Ok("relay stopped".to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn serve(port: Option<u16>) -> Serve {
        Serve {
            port,
            log_dir: None,
            log_level: tracing::Level::DEBUG,
        }
    }

    #[test]
    fn test_port_override() {
        let config = AppConfig {
            listen_port: 4000,
            handshake_start_delay_ms: 5,
            handshake_step_delay_ms: 7,
        };

        let from_config = serve(None).service_config(&config);
        assert_eq!(from_config.listen_addr.port(), 4000);
        assert_eq!(from_config.handshake.start_delay, Duration::from_millis(5));
        assert_eq!(from_config.handshake.step_delay, Duration::from_millis(7));
        assert_eq!(from_config.log_level, tracing::Level::DEBUG);

        let overridden = serve(Some(5000)).service_config(&config);
        assert_eq!(overridden.listen_addr.port(), 5000);
    }
}
