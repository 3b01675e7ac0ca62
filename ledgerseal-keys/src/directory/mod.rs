//! Public-key directory: user identity → current public key.
//!
//! The directory is an external keyed store. Backends:
//! - [`MemoryDirectory`] for tests and single-process use
//! - [`SqliteDirectory`] for a local or embedded datastore
//! - [`HttpDirectory`] for the hosted directory API
//!
//! Publishing is an upsert with last-writer-wins semantics. Nothing here
//! retries; lookup and publish are fallible I/O and the caller owns the
//! retry policy.

mod http;
mod memory;
mod sqlite;

pub use http::HttpDirectory;
pub use memory::MemoryDirectory;
pub use sqlite::SqliteDirectory;

use crate::error::KeyResult;
use crate::types::{PublicKeyRecord, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Keyed store of each user's current public key.
#[async_trait]
pub trait PublicKeyDirectory: Send + Sync {
    /// Upserts the public key for `user_id`, replacing any previous record.
    ///
    /// `last_updated_at` of the returned record is strictly later than that
    /// of the record it replaces.
    async fn publish(&self, user_id: &UserId, public_key: &str) -> KeyResult<PublicKeyRecord>;

    /// Returns the current record, or [`crate::KeyError::NotFound`].
    async fn lookup(&self, user_id: &UserId) -> KeyResult<PublicKeyRecord>;
}

/// Publish timestamp at microsecond precision, strictly after `previous`.
pub(crate) fn next_update_time(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    let now = DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now);
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}
