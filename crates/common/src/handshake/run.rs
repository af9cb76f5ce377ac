use crate::crypto::KeyAgreementError;
use crate::events::{HandshakeParticipant, HandshakeStepEvent};
use crate::session::Session;

/// Steps of a handshake run, numbered as observers see them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandshakeStep {
    GenerateKeys = 1,
    ExchangeKeys = 2,
    DeriveSecret = 3,
}

impl HandshakeStep {
    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn description(&self) -> &'static str {
        match self {
            HandshakeStep::GenerateKeys => "Generating keys",
            HandshakeStep::ExchangeKeys => "Exchanging keys",
            HandshakeStep::DeriveSecret => "Secure channel established",
        }
    }

    fn next(&self) -> Option<HandshakeStep> {
        match self {
            HandshakeStep::GenerateKeys => Some(HandshakeStep::ExchangeKeys),
            HandshakeStep::ExchangeKeys => Some(HandshakeStep::DeriveSecret),
            HandshakeStep::DeriveSecret => None,
        }
    }
}

/// One announce/exchange/derive sequence between two captured sessions.
///
/// Participants are copies taken when the run starts. Later changes to the
/// session population, including either participant leaving, do not reach an
/// in-flight run.
#[derive(Debug, Clone)]
pub struct HandshakeRun {
    participant_a: Session,
    participant_b: Session,
    current_step: HandshakeStep,
    shared_secret: Option<u64>,
}

impl HandshakeRun {
    pub fn new(participant_a: Session, participant_b: Session) -> Self {
        Self {
            participant_a,
            participant_b,
            current_step: HandshakeStep::GenerateKeys,
            shared_secret: None,
        }
    }

    pub fn current_step(&self) -> HandshakeStep {
        self.current_step
    }

    pub fn participants(&self) -> (&Session, &Session) {
        (&self.participant_a, &self.participant_b)
    }

    pub fn shared_secret(&self) -> Option<u64> {
        self.shared_secret
    }

    pub fn is_complete(&self) -> bool {
        self.current_step == HandshakeStep::DeriveSecret && self.shared_secret.is_some()
    }

    /// Move to the next step. Entering `DeriveSecret` computes the shared
    /// secret from B's public key and A's private key.
    ///
    /// Returns `Ok(None)` once the run is terminal.
    pub fn advance(&mut self) -> Result<Option<HandshakeStep>, KeyAgreementError> {
        let Some(next) = self.current_step.next() else {
            return Ok(None);
        };

        if next == HandshakeStep::DeriveSecret {
            let secret = self
                .participant_a
                .key_pair
                .shared_secret(self.participant_b.public_key())?;
            self.shared_secret = Some(secret);
        }

        self.current_step = next;
        Ok(Some(next))
    }

    /// The `handshakeStep` payload announcing the current step
    pub fn event(&self) -> HandshakeStepEvent {
        let step = self.current_step;
        match step {
            HandshakeStep::GenerateKeys | HandshakeStep::ExchangeKeys => HandshakeStepEvent {
                step: step.number(),
                description: step.description().to_string(),
                user1: Some(participant(&self.participant_a)),
                user2: Some(participant(&self.participant_b)),
                shared_secret: None,
            },
            HandshakeStep::DeriveSecret => HandshakeStepEvent {
                step: step.number(),
                description: step.description().to_string(),
                user1: None,
                user2: None,
                shared_secret: self.shared_secret,
            },
        }
    }
}

fn participant(session: &Session) -> HandshakeParticipant {
    HandshakeParticipant {
        username: session.username.clone(),
        public_key: session.public_key(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::session::ConnectionId;

    fn session(username: &str, private_key: u64) -> Session {
        Session {
            connection_id: ConnectionId::new(),
            username: username.into(),
            key_pair: KeyPair::from_private_key(private_key).unwrap(),
        }
    }

    #[test]
    fn test_steps_progress_in_order() {
        let mut run = HandshakeRun::new(session("alice", 6), session("bob", 15));
        assert_eq!(run.current_step(), HandshakeStep::GenerateKeys);
        assert_eq!(run.shared_secret(), None);

        assert_eq!(run.advance().unwrap(), Some(HandshakeStep::ExchangeKeys));
        assert_eq!(run.shared_secret(), None);

        assert_eq!(run.advance().unwrap(), Some(HandshakeStep::DeriveSecret));
        assert!(run.is_complete());

        assert_eq!(run.advance().unwrap(), None);
        assert_eq!(run.current_step(), HandshakeStep::DeriveSecret);
    }

    #[test]
    fn test_secret_matches_both_sides() {
        let alice = session("alice", 6);
        let bob = session("bob", 15);
        let mut run = HandshakeRun::new(alice.clone(), bob.clone());
        run.advance().unwrap();
        run.advance().unwrap();

        let expected = bob.key_pair.shared_secret(alice.public_key()).unwrap();
        assert_eq!(run.shared_secret(), Some(expected));
        // 5^(6*15) mod p, computed independently
        assert_eq!(expected, crate::crypto::mod_pow(5, 90, crate::crypto::PRIME));
    }

    #[test]
    fn test_events_per_step() {
        let mut run = HandshakeRun::new(session("alice", 6), session("bob", 1));

        let first = run.event();
        assert_eq!(first.step, 1);
        assert_eq!(first.description, "Generating keys");
        assert_eq!(first.user1.as_ref().unwrap().username, "alice");
        assert_eq!(first.user1.as_ref().unwrap().public_key, 15625);
        assert_eq!(first.user2.as_ref().unwrap().public_key, 5);
        assert_eq!(first.shared_secret, None);

        run.advance().unwrap();
        let second = run.event();
        assert_eq!(second.step, 2);
        assert_eq!(second.description, "Exchanging keys");
        assert_eq!(second.user1, first.user1);
        assert_eq!(second.user2, first.user2);

        run.advance().unwrap();
        let third = run.event();
        assert_eq!(third.step, 3);
        assert!(third.user1.is_none() && third.user2.is_none());
        // B's public key (5) raised to A's private key (6)
        assert_eq!(third.shared_secret, Some(15625));
    }
}
