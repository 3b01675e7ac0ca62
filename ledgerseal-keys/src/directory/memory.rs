use super::{PublicKeyDirectory, next_update_time};
use crate::error::{KeyError, KeyResult};
use crate::types::{PublicKeyRecord, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Thread-safe in-memory directory.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    records: Arc<RwLock<HashMap<UserId, PublicKeyRecord>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of users with a published key.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if no keys are published.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PublicKeyDirectory for MemoryDirectory {
    async fn publish(&self, user_id: &UserId, public_key: &str) -> KeyResult<PublicKeyRecord> {
        ledgerseal_crypto::validate_public_key(public_key)?;

        let mut records = self.records.write().await;
        let previous = records.get(user_id).map(|r| r.last_updated_at);
        let record = PublicKeyRecord {
            user_id: user_id.clone(),
            public_key: public_key.to_string(),
            last_updated_at: next_update_time(previous),
        };
        records.insert(user_id.clone(), record.clone());

        debug!("published public key for {user_id}");
        Ok(record)
    }

    async fn lookup(&self, user_id: &UserId) -> KeyResult<PublicKeyRecord> {
        self.records
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| KeyError::NotFound(user_id.clone()))
    }
}
