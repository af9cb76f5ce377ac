pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "securetalk")]
#[command(about = "Password-gated chat relay with a visible key exchange")]
pub struct Args {
    /// Relay to talk to (defaults to localhost on the configured port)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the securetalk config directory (defaults to ~/.securetalk)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
