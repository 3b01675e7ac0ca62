//! Per-recipient envelope orchestration.
//!
//! Resolves a recipient to their current public key through the directory,
//! then hands the payload to the envelope cipher. Public keys are looked up
//! on every call and never cached, so a rotated key takes effect for the
//! next envelope.

use crate::directory::PublicKeyDirectory;
use crate::error::{KeyError, KeyResult};
use crate::types::{EncryptedEnvelope, HybridEnvelope, MissingKeyPolicy, SealedRecord, UserId};
use ledgerseal_crypto::{cipher, hybrid};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Encrypts records for a recipient and decrypts records sent to us.
pub struct EncryptionOrchestrator {
    directory: Arc<dyn PublicKeyDirectory>,
}

impl EncryptionOrchestrator {
    pub fn new(directory: Arc<dyn PublicKeyDirectory>) -> Self {
        Self { directory }
    }

    /// Encrypts `payload` to the recipient's current public key.
    ///
    /// Propagates [`KeyError::NotFound`] when the recipient never published a
    /// key, and `PayloadTooLarge` when the serialized payload exceeds OAEP
    /// capacity.
    pub async fn encrypt_for<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        sender_id: &UserId,
        recipient_id: &UserId,
    ) -> KeyResult<EncryptedEnvelope> {
        let record = self.directory.lookup(recipient_id).await?;
        let ciphertext = cipher::encrypt(payload, &record.public_key)?;

        debug!("sealed envelope {sender_id} -> {recipient_id}");
        Ok(EncryptedEnvelope::new(
            ciphertext,
            sender_id.clone(),
            recipient_id.clone(),
        ))
    }

    /// Decrypts an envelope with the caller's private key.
    ///
    /// Does not check that the caller is `envelope.recipient_id()`; access
    /// control belongs to the surrounding application.
    pub fn decrypt_as<T: DeserializeOwned>(
        &self,
        envelope: &EncryptedEnvelope,
        private_key: &str,
    ) -> KeyResult<T> {
        Ok(cipher::decrypt(envelope.ciphertext(), private_key)?)
    }

    /// Encrypts `payload`, applying `policy` if the recipient has no key.
    pub async fn seal_for<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        sender_id: &UserId,
        recipient_id: &UserId,
        policy: MissingKeyPolicy,
    ) -> KeyResult<SealedRecord> {
        match self.encrypt_for(payload, sender_id, recipient_id).await {
            Ok(envelope) => Ok(SealedRecord::Encrypted(envelope)),
            Err(KeyError::NotFound(user)) if policy == MissingKeyPolicy::AllowPlaintext => {
                warn!("{user} has no published key; storing record from {sender_id} unencrypted");
                Ok(SealedRecord::Plaintext {
                    payload: serde_json::to_value(payload)?,
                    sender_id: sender_id.clone(),
                    recipient_id: recipient_id.clone(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Seals a payload of any size to the recipient's current public key.
    pub async fn encrypt_large_for<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        sender_id: &UserId,
        recipient_id: &UserId,
    ) -> KeyResult<HybridEnvelope> {
        let record = self.directory.lookup(recipient_id).await?;
        let sealed = hybrid::seal(payload, &record.public_key)?;

        debug!("sealed hybrid envelope {sender_id} -> {recipient_id}");
        Ok(HybridEnvelope::new(
            sealed,
            sender_id.clone(),
            recipient_id.clone(),
        ))
    }

    pub fn decrypt_large_as<T: DeserializeOwned>(
        &self,
        envelope: &HybridEnvelope,
        private_key: &str,
    ) -> KeyResult<T> {
        Ok(hybrid::open(envelope.sealed(), private_key)?)
    }
}
