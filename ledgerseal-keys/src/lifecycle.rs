//! Key pair lifecycle for one user on one device.
//!
//! ```text
//! Uninitialized ──> Generating ──> Publishing ──> Ready
//!                       │               │
//!                       └──> Failed <───┘
//! ```
//!
//! The private key is always stored locally before its public half is
//! published, so the directory never points at a key nobody can use. Failures
//! are reported, never retried; calling again restarts from `Uninitialized`.
//!
//! Key loss is surfaced rather than papered over: a device without a private
//! key will not silently replace a key the user already published elsewhere.
//! The caller either imports the existing key or rotates explicitly.

use crate::config::KeysConfig;
use crate::directory::PublicKeyDirectory;
use crate::error::{KeyError, KeyResult};
use crate::keystore::{FileKeyStore, KeyStore, MemoryKeyStore};
use crate::types::{PublicKeyRecord, UserId};
use ledgerseal_crypto::{
    CryptoError, CryptoResult, KeyPair, KeySize, PassphraseProtectedKey, protect_private_key,
    public_key_from_private, public_keys_equal, unprotect_private_key,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Produces a key pair of the requested size.
pub type KeyGenerator = fn(KeySize) -> CryptoResult<KeyPair>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Generating,
    Publishing,
    Ready,
    Failed,
}

/// What a lifecycle call did. Every variant other than `AlreadyReady` and
/// `Verified` changed key material somewhere and is worth telling the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// Already `Ready`; nothing happened.
    AlreadyReady,
    /// The local key matches the published record.
    Verified(PublicKeyRecord),
    /// First key pair for this user.
    Generated(PublicKeyRecord),
    /// A stored but unpublished key was published.
    Republished(PublicKeyRecord),
    /// The key pair was replaced. Envelopes sealed to `previous` can no
    /// longer be opened on this device.
    Rotated {
        previous: Option<PublicKeyRecord>,
        current: PublicKeyRecord,
    },
    /// A private key exported from another device was installed.
    Imported(PublicKeyRecord),
}

/// Drives key generation, local storage and publication for one user.
pub struct KeyLifecycleManager {
    user_id: UserId,
    key_store: Arc<dyn KeyStore>,
    directory: Arc<dyn PublicKeyDirectory>,
    key_size: KeySize,
    generator: KeyGenerator,
    state: RwLock<LifecycleState>,
    /// Serializes lifecycle operations so two calls never generate two keys.
    op_lock: Mutex<()>,
}

impl KeyLifecycleManager {
    pub fn new(
        user_id: UserId,
        key_store: Arc<dyn KeyStore>,
        directory: Arc<dyn PublicKeyDirectory>,
    ) -> Self {
        Self {
            user_id,
            key_store,
            directory,
            key_size: KeySize::default(),
            generator: ledgerseal_crypto::generate_with_size,
            state: RwLock::new(LifecycleState::Uninitialized),
            op_lock: Mutex::new(()),
        }
    }

    /// Builds a manager whose key store and key size come from `config`.
    pub fn from_config(
        user_id: UserId,
        config: &KeysConfig,
        directory: Arc<dyn PublicKeyDirectory>,
    ) -> Self {
        let key_store: Arc<dyn KeyStore> = match &config.key_store_dir {
            Some(dir) => Arc::new(FileKeyStore::for_user(dir, &user_id)),
            None => Arc::new(MemoryKeyStore::new()),
        };
        Self::new(user_id, key_store, directory).with_key_size(config.key_size)
    }

    pub fn with_key_size(mut self, key_size: KeySize) -> Self {
        self.key_size = key_size;
        self
    }

    /// Replaces the key pair generator (e.g. to simulate entropy failure).
    pub fn with_generator(mut self, generator: KeyGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// The private key held on this device, for decrypting envelopes.
    pub fn private_key(&self) -> KeyResult<Option<Zeroizing<String>>> {
        self.key_store.get()
    }

    /// Brings this device to `Ready` on first authenticated use.
    ///
    /// No-op when already `Ready`. Fails with
    /// [`KeyError::ExistingRemoteKey`] instead of generating when the user
    /// has a published key but this device has no private key, and with
    /// [`KeyError::KeyMismatch`] when the local key is not the published one.
    pub async fn initialize(&self) -> KeyResult<LifecycleOutcome> {
        let _guard = self.op_lock.lock().await;

        if self.state().await == LifecycleState::Ready {
            debug!("key lifecycle for {} already ready", self.user_id);
            return Ok(LifecycleOutcome::AlreadyReady);
        }
        self.set_state(LifecycleState::Uninitialized).await;

        let result = match self.key_store.get() {
            Ok(Some(private_key)) => self.reconcile_local_key(&private_key).await,
            Ok(None) => self.initialize_fresh().await,
            Err(e) => Err(e),
        };
        self.finish(result).await
    }

    /// Replaces the user's key pair and supersedes the published record.
    ///
    /// If the new key cannot be stored or published, the previous local key
    /// is put back so the record still in the directory stays readable.
    pub async fn rotate(&self) -> KeyResult<LifecycleOutcome> {
        let _guard = self.op_lock.lock().await;

        let previous = match self.directory.lookup(&self.user_id).await {
            Ok(record) => Some(record),
            Err(KeyError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let previous_key = self.key_store.get()?;

        let result = match self.generate_and_publish().await {
            Ok(current) => {
                warn!(
                    "rotated key pair for {}; envelopes sealed to the previous key are no longer readable",
                    self.user_id
                );
                Ok(LifecycleOutcome::Rotated { previous, current })
            }
            Err(e) => {
                self.restore_after_failed_rotation(previous_key, previous.is_some());
                Err(e)
            }
        };
        self.finish(result).await
    }

    /// Puts the key store back the way it was before a rotation, so the
    /// still-published record keeps a private half on this device.
    ///
    /// Without a previous local key the unpublished new key is kept only when
    /// the directory had no record; otherwise it could never match.
    fn restore_after_failed_rotation(
        &self,
        previous_key: Option<Zeroizing<String>>,
        had_record: bool,
    ) {
        let restored = match previous_key {
            Some(key) => self.key_store.store(&key),
            None if had_record => self.key_store.clear(),
            None => return,
        };
        match restored {
            Ok(()) => info!("restored previous key for {} after failed rotation", self.user_id),
            Err(e) => warn!(
                "could not restore previous key for {} after failed rotation: {e}",
                self.user_id
            ),
        }
    }

    /// Exports the local private key under a passphrase for another device.
    pub fn export_private_key(&self, passphrase: &str) -> KeyResult<PassphraseProtectedKey> {
        let private_key = self
            .key_store
            .get()?
            .ok_or_else(|| KeyError::KeyStore(format!("no private key stored for {}", self.user_id)))?;
        Ok(protect_private_key(&private_key, passphrase)?)
    }

    /// Installs a private key exported from another device.
    ///
    /// The key must match the user's current published record.
    pub async fn import_private_key(
        &self,
        protected: &PassphraseProtectedKey,
        passphrase: &str,
    ) -> KeyResult<LifecycleOutcome> {
        let _guard = self.op_lock.lock().await;

        let private_key = unprotect_private_key(protected, passphrase)?;
        let public_key = public_key_from_private(&private_key)?;

        let record = self.directory.lookup(&self.user_id).await?;
        if !public_keys_equal(&record.public_key, &public_key)? {
            warn!("imported key for {} is not the published key", self.user_id);
            return Err(KeyError::KeyMismatch(self.user_id.clone()));
        }

        self.key_store.store(&private_key)?;
        self.set_state(LifecycleState::Ready).await;
        info!("imported private key for {}", self.user_id);
        Ok(LifecycleOutcome::Imported(record))
    }

    /// Clears the local private key and returns to `Uninitialized`.
    pub async fn sign_out(&self) -> KeyResult<()> {
        let _guard = self.op_lock.lock().await;
        self.key_store.clear()?;
        self.set_state(LifecycleState::Uninitialized).await;
        debug!("cleared local key for {}", self.user_id);
        Ok(())
    }

    async fn initialize_fresh(&self) -> KeyResult<LifecycleOutcome> {
        match self.directory.lookup(&self.user_id).await {
            Ok(existing) => {
                warn!(
                    "{} has a published key but none on this device; refusing to regenerate",
                    self.user_id
                );
                Err(KeyError::ExistingRemoteKey {
                    user_id: self.user_id.clone(),
                    last_updated_at: existing.last_updated_at,
                })
            }
            Err(KeyError::NotFound(_)) => self
                .generate_and_publish()
                .await
                .map(LifecycleOutcome::Generated),
            Err(e) => Err(e),
        }
    }

    async fn reconcile_local_key(&self, private_key: &str) -> KeyResult<LifecycleOutcome> {
        let public_key = public_key_from_private(private_key)?;

        match self.directory.lookup(&self.user_id).await {
            Ok(record) if public_keys_equal(&record.public_key, &public_key)? => {
                debug!("local key for {} matches directory", self.user_id);
                Ok(LifecycleOutcome::Verified(record))
            }
            Ok(_) => {
                warn!("local key for {} differs from the published key", self.user_id);
                Err(KeyError::KeyMismatch(self.user_id.clone()))
            }
            Err(KeyError::NotFound(_)) => {
                self.set_state(LifecycleState::Publishing).await;
                let record = self.directory.publish(&self.user_id, &public_key).await?;
                info!("published stored key for {}", self.user_id);
                Ok(LifecycleOutcome::Republished(record))
            }
            Err(e) => Err(e),
        }
    }

    async fn generate_and_publish(&self) -> KeyResult<PublicKeyRecord> {
        self.set_state(LifecycleState::Generating).await;
        info!("generating {}-bit key pair for {}", self.key_size.bits(), self.user_id);

        let generator = self.generator;
        let key_size = self.key_size;
        let pair = tokio::task::spawn_blocking(move || generator(key_size))
            .await
            .map_err(|e| CryptoError::KeyGeneration(format!("generator task failed: {e}")))??;

        self.key_store.store(pair.private_key())?;

        self.set_state(LifecycleState::Publishing).await;
        let record = self.directory.publish(&self.user_id, pair.public_key()).await?;

        info!(
            "published key {} for {}",
            record.fingerprint().unwrap_or_default(),
            self.user_id
        );
        Ok(record)
    }

    async fn finish(&self, result: KeyResult<LifecycleOutcome>) -> KeyResult<LifecycleOutcome> {
        let mut state = self.state.write().await;
        match &result {
            Ok(_) => *state = LifecycleState::Ready,
            Err(e) => {
                if matches!(*state, LifecycleState::Generating | LifecycleState::Publishing) {
                    warn!("key lifecycle for {} failed in {:?}: {e}", self.user_id, *state);
                    *state = LifecycleState::Failed;
                }
            }
        }
        result
    }

    async fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.write().await;
        debug!("key lifecycle for {}: {:?} -> {next:?}", self.user_id, *state);
        *state = next;
    }
}
