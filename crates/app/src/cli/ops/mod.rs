pub mod health;
pub mod init;
pub mod serve;
pub mod version;

pub use health::Health;
pub use init::Init;
pub use serve::Serve;
pub use version::Version;
