use std::fmt;

use rand::Rng;

/// Prime modulus of the key agreement group (2^31 - 1)
pub const PRIME: u64 = 2_147_483_647;
/// Generator used to derive public keys
pub const BASE: u64 = 5;
/// Smallest private key ever generated
pub const PRIVATE_KEY_MIN: u64 = 1;
/// Largest private key ever generated
pub const PRIVATE_KEY_MAX: u64 = 1_000_000;

/// Errors that can occur during key agreement arithmetic
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyAgreementError {
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
}

/// Modular exponentiation by repeated squaring.
///
/// Intermediates are widened to `u128` so any `u64` modulus is safe.
pub fn mod_pow(base: u64, exponent: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }

    let modulus = modulus as u128;
    let mut result: u128 = 1;
    let mut base = base as u128 % modulus;
    let mut exponent = exponent;

    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result * base % modulus;
        }
        base = base * base % modulus;
        exponent >>= 1;
    }

    result as u64
}

/// Sample a fresh private key, uniform in `[PRIVATE_KEY_MIN, PRIVATE_KEY_MAX]`
pub fn generate_private_key() -> u64 {
    rand::rng().random_range(PRIVATE_KEY_MIN..=PRIVATE_KEY_MAX)
}

/// Compute `BASE^private_key mod PRIME`
pub fn derive_public_key(private_key: u64) -> Result<u64, KeyAgreementError> {
    if private_key == 0 {
        return Err(KeyAgreementError::InvalidKeyMaterial(
            "private key must be positive".into(),
        ));
    }
    Ok(mod_pow(BASE, private_key, PRIME))
}

/// Compute `other_public_key^own_private_key mod PRIME`
///
/// # Errors
///
/// Returns `InvalidKeyMaterial` if the private key is zero or the public key
/// does not belong to the group (`>= PRIME`).
pub fn derive_shared_secret(
    other_public_key: u64,
    own_private_key: u64,
) -> Result<u64, KeyAgreementError> {
    if own_private_key == 0 {
        return Err(KeyAgreementError::InvalidKeyMaterial(
            "private key must be positive".into(),
        ));
    }
    if other_public_key >= PRIME {
        return Err(KeyAgreementError::InvalidKeyMaterial(format!(
            "public key {} out of range",
            other_public_key
        )));
    }
    Ok(mod_pow(other_public_key, own_private_key, PRIME))
}

/// A private/public key pair owned by exactly one session.
///
/// The private half is never printed by `Debug` and never serialized; only
/// `public_key` is meant to leave the process.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    private_key: u64,
    public_key: u64,
}

impl KeyPair {
    /// Generate a fresh key pair from the thread RNG
    pub fn generate() -> Self {
        let private_key = generate_private_key();
        Self {
            private_key,
            public_key: mod_pow(BASE, private_key, PRIME),
        }
    }

    /// Build a key pair from a known private key
    pub fn from_private_key(private_key: u64) -> Result<Self, KeyAgreementError> {
        let public_key = derive_public_key(private_key)?;
        Ok(Self {
            private_key,
            public_key,
        })
    }

    pub fn private_key(&self) -> u64 {
        self.private_key
    }

    pub fn public_key(&self) -> u64 {
        self.public_key
    }

    /// Derive the shared secret with a peer's public key
    pub fn shared_secret(&self, other_public_key: u64) -> Result<u64, KeyAgreementError> {
        derive_shared_secret(other_public_key, self.private_key)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Power-then-reduce, only usable while `base^exponent` fits in a u128
    fn naive_pow_mod(base: u64, exponent: u32, modulus: u64) -> u64 {
        ((base as u128).pow(exponent) % modulus as u128) as u64
    }

    #[test]
    fn test_known_public_key_vector() {
        assert_eq!(derive_public_key(6).unwrap(), 15625);
        assert_eq!(derive_public_key(1).unwrap(), 5);
    }

    #[test]
    fn test_mod_pow_matches_naive_for_small_exponents() {
        for exponent in 1..=30u32 {
            assert_eq!(
                mod_pow(BASE, exponent as u64, PRIME),
                naive_pow_mod(BASE, exponent, PRIME),
                "exponent {}",
                exponent
            );
        }
    }

    #[test]
    fn test_mod_pow_edge_cases() {
        assert_eq!(mod_pow(5, 0, PRIME), 1);
        assert_eq!(mod_pow(0, 5, PRIME), 0);
        assert_eq!(mod_pow(7, 3, 1), 0);
        // Fermat: a^(p-1) = 1 mod p
        assert_eq!(mod_pow(BASE, PRIME - 1, PRIME), 1);
    }

    #[test]
    fn test_public_key_in_range_for_large_exponents() {
        for private_key in [PRIVATE_KEY_MAX, PRIVATE_KEY_MAX - 1, 999_983, 500_000] {
            let public_key = derive_public_key(private_key).unwrap();
            assert!(public_key < PRIME);
        }
    }

    #[test]
    fn test_generated_private_keys_in_range() {
        for _ in 0..1_000 {
            let key = generate_private_key();
            assert!((PRIVATE_KEY_MIN..=PRIVATE_KEY_MAX).contains(&key));
        }
    }

    #[test]
    fn test_shared_secret_commutes() {
        let pairs = [(6, 15), (1, 2), (123_456, 654_321), (PRIVATE_KEY_MAX, 1)];
        for (a, b) in pairs {
            let alice = KeyPair::from_private_key(a).unwrap();
            let bob = KeyPair::from_private_key(b).unwrap();
            assert_eq!(
                alice.shared_secret(bob.public_key()).unwrap(),
                bob.shared_secret(alice.public_key()).unwrap(),
            );
        }
    }

    #[test]
    fn test_shared_secret_commutes_for_random_pairs() {
        for _ in 0..100 {
            let alice = KeyPair::generate();
            let bob = KeyPair::generate();
            let secret_a = derive_shared_secret(bob.public_key(), alice.private_key()).unwrap();
            let secret_b = derive_shared_secret(alice.public_key(), bob.private_key()).unwrap();
            assert_eq!(secret_a, secret_b);
            assert!(secret_a < PRIME);
        }
    }

    #[test]
    fn test_invalid_key_material() {
        assert!(matches!(
            derive_public_key(0),
            Err(KeyAgreementError::InvalidKeyMaterial(_))
        ));
        assert!(matches!(
            derive_shared_secret(15625, 0),
            Err(KeyAgreementError::InvalidKeyMaterial(_))
        ));
        assert!(matches!(
            derive_shared_secret(PRIME, 6),
            Err(KeyAgreementError::InvalidKeyMaterial(_))
        ));
        assert!(KeyPair::from_private_key(0).is_err());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let pair = KeyPair::from_private_key(424_242).unwrap();
        let printed = format!("{:?}", pair);
        assert!(!printed.contains("424242"));
        assert!(printed.contains("<redacted>"));
    }
}
