//! Shared fakes and fixtures for key management tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ledgerseal_crypto::{KeyPair, generate};
use ledgerseal_keys::{
    KeyError, KeyResult, KeyStore, MemoryDirectory, PublicKeyDirectory, PublicKeyRecord, UserId,
};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use zeroize::Zeroizing;

pub fn fixture_key() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| generate().expect("key generation must succeed"))
}

pub fn user(id: &str) -> UserId {
    UserId::new(id)
}

/// Key store whose writes always fail.
#[derive(Default)]
pub struct FailingKeyStore;

impl KeyStore for FailingKeyStore {
    fn store(&self, _private_key: &str) -> KeyResult<()> {
        Err(KeyError::KeyStore("disk full".to_string()))
    }

    fn get(&self) -> KeyResult<Option<Zeroizing<String>>> {
        Ok(None)
    }

    fn clear(&self) -> KeyResult<()> {
        Ok(())
    }
}

/// In-memory directory that counts calls and can be told to fail.
#[derive(Default)]
pub struct RecordingDirectory {
    pub inner: MemoryDirectory,
    publish_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    fail_publish: AtomicBool,
    fail_lookup: AtomicBool,
}

impl RecordingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_calls(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_lookup(&self, fail: bool) {
        self.fail_lookup.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PublicKeyDirectory for RecordingDirectory {
    async fn publish(&self, user_id: &UserId, public_key: &str) -> KeyResult<PublicKeyRecord> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(KeyError::Directory("connection reset".to_string()));
        }
        self.inner.publish(user_id, public_key).await
    }

    async fn lookup(&self, user_id: &UserId) -> KeyResult<PublicKeyRecord> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(KeyError::Directory("request timed out".to_string()));
        }
        self.inner.lookup(user_id).await
    }
}
