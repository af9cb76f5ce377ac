use std::net::SocketAddr;
use std::path::PathBuf;

use common::handshake::HandshakeConfig;

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// Address the relay listens on for WebSocket and HTTP traffic
    pub listen_addr: SocketAddr,

    // handshake pacing
    pub handshake: HandshakeConfig,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Relay on `0.0.0.0:<port>` with default pacing and logging
    pub fn new(port: u16) -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            handshake: HandshakeConfig::default(),
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }
}
