//! Key management error types.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use ledgerseal_crypto::CryptoError;
use thiserror::Error;

/// Result type for key management operations.
pub type KeyResult<T> = Result<T, KeyError>;

/// Errors that can occur in key lifecycle, directory and envelope operations.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The recipient has never published a public key.
    ///
    /// Recoverable: the caller decides between rejecting the write and an
    /// explicit plaintext fallback.
    #[error("no public key published for user {0}")]
    NotFound(UserId),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("key store error: {0}")]
    KeyStore(String),

    #[error("directory request failed: {0}")]
    Directory(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The local private key does not belong to the published public key.
    #[error("local private key for user {0} does not match the published public key")]
    KeyMismatch(UserId),

    /// This device has no private key but the user already published one,
    /// typically from another device.
    #[error(
        "user {user_id} already has a public key published at {last_updated_at}; import the private key or rotate explicitly"
    )]
    ExistingRemoteKey {
        user_id: UserId,
        last_updated_at: DateTime<Utc>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl KeyError {
    /// True when a record cannot be read with the supplied key: wrong key,
    /// corrupted or tampered ciphertext. Retrying cannot succeed.
    pub fn is_unreadable_record(&self) -> bool {
        matches!(self, KeyError::Crypto(CryptoError::Decryption))
    }
}
