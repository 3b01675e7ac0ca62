//! Shared types for key management and envelopes.

use chrono::{DateTime, Utc};
use ledgerseal_crypto::{CryptoResult, HybridCiphertext};
use serde::{Deserialize, Serialize};
use std::fmt;

/// User identity supplied by the external identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The current public key of a user, as held by the directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    pub user_id: UserId,
    /// PEM-encoded SPKI public key.
    pub public_key: String,
    pub last_updated_at: DateTime<Utc>,
}

impl PublicKeyRecord {
    /// SHA-256 fingerprint of the public key, safe to log or display.
    pub fn fingerprint(&self) -> CryptoResult<String> {
        ledgerseal_crypto::fingerprint(&self.public_key)
    }
}

/// A payload encrypted for exactly one recipient.
///
/// Immutable once created; persisted by the caller alongside the record it
/// protects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    ciphertext: String,
    sender_id: UserId,
    recipient_id: UserId,
}

impl EncryptedEnvelope {
    pub(crate) fn new(ciphertext: String, sender_id: UserId, recipient_id: UserId) -> Self {
        Self {
            ciphertext,
            sender_id,
            recipient_id,
        }
    }

    /// Rebuilds an envelope loaded from the caller's datastore.
    pub fn from_stored(ciphertext: impl Into<String>, sender_id: UserId, recipient_id: UserId) -> Self {
        Self::new(ciphertext.into(), sender_id, recipient_id)
    }

    /// Base64 RSA-OAEP ciphertext.
    pub fn ciphertext(&self) -> &str {
        &self.ciphertext
    }

    pub fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    pub fn recipient_id(&self) -> &UserId {
        &self.recipient_id
    }
}

/// A large payload sealed for one recipient under an RSA-wrapped data key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridEnvelope {
    sealed: HybridCiphertext,
    sender_id: UserId,
    recipient_id: UserId,
}

impl HybridEnvelope {
    pub(crate) fn new(sealed: HybridCiphertext, sender_id: UserId, recipient_id: UserId) -> Self {
        Self {
            sealed,
            sender_id,
            recipient_id,
        }
    }

    pub fn sealed(&self) -> &HybridCiphertext {
        &self.sealed
    }

    pub fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    pub fn recipient_id(&self) -> &UserId {
        &self.recipient_id
    }
}

/// What to do when the recipient has no published public key.
///
/// There is deliberately no default: every call site picks one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingKeyPolicy {
    /// Propagate [`crate::KeyError::NotFound`].
    Reject,
    /// Return the payload unencrypted and log a warning.
    AllowPlaintext,
}

/// Result of [`crate::EncryptionOrchestrator::seal_for`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SealedRecord {
    Encrypted(EncryptedEnvelope),
    /// Stored without encryption because the recipient had no key and the
    /// caller chose [`MissingKeyPolicy::AllowPlaintext`].
    Plaintext {
        payload: serde_json::Value,
        sender_id: UserId,
        recipient_id: UserId,
    },
}

impl SealedRecord {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, SealedRecord::Encrypted(_))
    }
}
