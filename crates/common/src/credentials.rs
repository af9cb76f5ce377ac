//! Process-lifetime credential ledger
//!
//! The first successful join for a username registers it; every later join with the
//! same username must present the same password. Passwords are stored as Argon2id
//! PHC strings with a random salt. Nothing is ever removed.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

/// Minimum username length, in UTF-16 code units
pub const MIN_USERNAME_LEN: usize = 2;
/// Minimum password length, in UTF-16 code units
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a successful admission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First use of this username, the credential was just registered
    Created,
    /// Known username, password matched
    Verified,
}

impl Admission {
    pub fn is_new_user(&self) -> bool {
        matches!(self, Admission::Created)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("username must be at least 2 and password at least 6 characters")]
    InvalidCredentialFormat,
    #[error("password does not match")]
    InvalidPassword,
    #[error("authentication failure: {0}")]
    AuthenticationFailure(String),
}

/// Username -> credential map with per-username registration locks
#[derive(Debug, Clone)]
pub struct CredentialLedger {
    inner: Arc<CredentialLedgerInner>,
}

#[derive(Debug)]
struct CredentialLedgerInner {
    credentials: RwLock<HashMap<String, Credential>>,
    /// Serializes concurrent admissions for the same username
    username_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    params: Params,
}

impl Default for CredentialLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialLedger {
    /// Ledger using the Argon2id default cost
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    /// Ledger with an explicit hashing cost. Tests use a cheap one.
    pub fn with_params(params: Params) -> Self {
        Self {
            inner: Arc::new(CredentialLedgerInner {
                credentials: RwLock::new(HashMap::new()),
                username_locks: Mutex::new(HashMap::new()),
                params,
            }),
        }
    }

    /// Ledger with an explicit memory cost (KiB) and iteration count
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, CredentialError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| CredentialError::AuthenticationFailure(e.to_string()))?;
        Ok(Self::with_params(params))
    }

    /// Register `username` on first use, verify the password otherwise.
    ///
    /// Format rules are checked before any lookup. Hashing runs on the blocking
    /// pool so a slow hash never stalls other connections.
    pub async fn admit(&self, username: &str, password: &str) -> Result<Admission, CredentialError> {
        validate_format(username, password)?;

        let lock = self.username_lock(username);
        let _guard = lock.lock().await;

        let existing = self.inner.credentials.read().get(username).cloned();
        match existing {
            Some(credential) => {
                tracing::debug!("LEDGER: verifying existing user {}", username);
                let matches = self
                    .run_blocking(password, move |argon, password| {
                        verify_password(&argon, password, &credential.password_hash)
                    })
                    .await??;
                if matches {
                    Ok(Admission::Verified)
                } else {
                    Err(CredentialError::InvalidPassword)
                }
            }
            None => {
                tracing::debug!("LEDGER: registering new user {}", username);
                let password_hash = self
                    .run_blocking(password, |argon, password| hash_password(&argon, password))
                    .await??;
                let credential = Credential {
                    username: username.to_string(),
                    password_hash,
                    created_at: Utc::now(),
                };
                self.inner
                    .credentials
                    .write()
                    .insert(username.to_string(), credential);
                Ok(Admission::Created)
            }
        }
    }

    pub fn get(&self, username: &str) -> Option<Credential> {
        self.inner.credentials.read().get(username).cloned()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.inner.credentials.read().contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.inner.credentials.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.credentials.read().is_empty()
    }

    /// Store a credential as-is, bypassing hashing
    #[cfg(test)]
    pub(crate) fn insert_raw(&self, username: &str, password_hash: &str) {
        self.inner.credentials.write().insert(
            username.to_string(),
            Credential {
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                created_at: Utc::now(),
            },
        );
    }

    fn username_lock(&self, username: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.inner
            .username_locks
            .lock()
            .entry(username.to_string())
            .or_default()
            .clone()
    }

    async fn run_blocking<T, F>(&self, password: &str, f: F) -> Result<T, CredentialError>
    where
        T: Send + 'static,
        F: FnOnce(Argon2<'static>, String) -> T + Send + 'static,
    {
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.inner.params.clone());
        let password = password.to_string();
        tokio::task::spawn_blocking(move || f(argon, password))
            .await
            .map_err(|e| CredentialError::AuthenticationFailure(format!("hash task failed: {}", e)))
    }
}

/// Length in UTF-16 code units. A character outside the BMP counts as two.
fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

fn validate_format(username: &str, password: &str) -> Result<(), CredentialError> {
    if utf16_len(username) < MIN_USERNAME_LEN || utf16_len(password) < MIN_PASSWORD_LEN {
        return Err(CredentialError::InvalidCredentialFormat);
    }
    Ok(())
}

fn hash_password(argon: &Argon2<'_>, password: String) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    argon
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::AuthenticationFailure(e.to_string()))
}

fn verify_password(
    argon: &Argon2<'_>,
    password: String,
    stored: &str,
) -> Result<bool, CredentialError> {
    let parsed =
        PasswordHash::new(stored).map_err(|e| CredentialError::AuthenticationFailure(e.to_string()))?;
    match argon.verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CredentialError::AuthenticationFailure(e.to_string())),
    }
}
