//! Key agreement primitives for SecureTalk
//!
//! This module implements the small Diffie–Hellman-style scheme used to establish a
//! shared secret between two connected peers:
//!
//! - **Private keys**: uniformly sampled integers in `[1, 1_000_000]`
//! - **Public keys**: `BASE^private mod PRIME`
//! - **Shared secret**: `other_public^own_private mod PRIME`
//!
//! # Security Model
//!
//! The group is tiny (`PRIME = 2^31 - 1`) and private keys are drawn from the
//! thread RNG, not hardened for adversarial use. The scheme exists to demonstrate
//! the exchange, and every public value it produces is broadcast to all observers.
//!
//! ## Arithmetic
//! All exponentiation is done by repeated squaring with `u128` intermediates, so
//! exponents up to `PRIVATE_KEY_MAX` never overflow. For small exponents the
//! result matches the naive power-then-reduce formula.

mod key_agreement;

pub use key_agreement::{
    derive_public_key, derive_shared_secret, generate_private_key, mod_pow, KeyAgreementError,
    KeyPair, BASE, PRIME, PRIVATE_KEY_MAX, PRIVATE_KEY_MIN,
};
