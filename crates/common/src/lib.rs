/**
 * Password-backed credential ledger.
 *  First use of a username registers it,
 *  later uses verify against the stored hash.
 */
pub mod credentials;
/**
 * Key agreement arithmetic.
 *  - Private/public key generation
 *  - Shared secret derivation
 */
pub mod crypto;
pub mod events;
/**
 * Three-step, time-paced handshake
 *  between the first two live sessions.
 */
pub mod handshake;
/**
 * Push/subscribe boundary towards the transport.
 */
pub mod hub;
pub mod lobby;
pub mod relay;
pub mod session;

pub mod prelude {
    pub use crate::credentials::{Admission, CredentialError, CredentialLedger};
    pub use crate::crypto::{KeyAgreementError, KeyPair};
    pub use crate::events::{InboundEvent, OutboundEvent};
    pub use crate::handshake::{HandshakeConfig, HandshakeCoordinator, HandshakeStep};
    pub use crate::hub::{EventReceiver, EventSink, Hub};
    pub use crate::lobby::{JoinError, Lobby};
    pub use crate::relay::Relay;
    pub use crate::session::{ConnectionId, PublicSession, Session, SessionStore};
}
