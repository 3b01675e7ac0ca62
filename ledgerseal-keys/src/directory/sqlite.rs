use super::{PublicKeyDirectory, next_update_time};
use crate::error::{KeyError, KeyResult};
use crate::types::{PublicKeyRecord, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Directory persisted in a SQLite database.
///
/// Timestamps are stored as microseconds since the Unix epoch. Every query
/// runs on the blocking pool.
pub struct SqliteDirectory {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDirectory {
    /// Opens (or creates) a directory database at `path`.
    pub fn open(path: &Path) -> KeyResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> KeyResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> KeyResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS public_keys (
                user_id TEXT PRIMARY KEY,
                public_key TEXT NOT NULL,
                last_updated_at INTEGER NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> KeyResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> KeyResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            op(&mut guard)
        })
        .await
        .map_err(|e| KeyError::Directory(format!("directory task failed: {e}")))?
    }
}

fn lock(conn: &Mutex<Connection>) -> KeyResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| KeyError::Directory(format!("connection lock poisoned: {e}")))
}

fn publish_blocking(
    conn: &mut Connection,
    user_id: &UserId,
    public_key: &str,
) -> KeyResult<PublicKeyRecord> {
    let tx = conn.transaction()?;

    let previous: Option<i64> = tx
        .query_row(
            "SELECT last_updated_at FROM public_keys WHERE user_id = ?1",
            params![user_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    let previous = previous.map(from_micros).transpose()?;
    let last_updated_at = next_update_time(previous);

    tx.execute(
        "INSERT INTO public_keys (user_id, public_key, last_updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
            public_key = excluded.public_key,
            last_updated_at = excluded.last_updated_at",
        params![user_id.as_str(), public_key, last_updated_at.timestamp_micros()],
    )?;
    tx.commit()?;

    Ok(PublicKeyRecord {
        user_id: user_id.clone(),
        public_key: public_key.to_string(),
        last_updated_at,
    })
}

fn lookup_blocking(conn: &Connection, user_id: &UserId) -> KeyResult<PublicKeyRecord> {
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT public_key, last_updated_at FROM public_keys WHERE user_id = ?1",
            params![user_id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (public_key, micros) = row.ok_or_else(|| KeyError::NotFound(user_id.clone()))?;
    Ok(PublicKeyRecord {
        user_id: user_id.clone(),
        public_key,
        last_updated_at: from_micros(micros)?,
    })
}

fn from_micros(micros: i64) -> KeyResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| KeyError::Directory(format!("invalid stored timestamp: {micros}")))
}

#[async_trait]
impl PublicKeyDirectory for SqliteDirectory {
    async fn publish(&self, user_id: &UserId, public_key: &str) -> KeyResult<PublicKeyRecord> {
        ledgerseal_crypto::validate_public_key(public_key)?;

        let owner = user_id.clone();
        let key = public_key.to_string();
        let record = self
            .with_conn(move |conn| publish_blocking(conn, &owner, &key))
            .await?;

        debug!("published public key for {user_id}");
        Ok(record)
    }

    async fn lookup(&self, user_id: &UserId) -> KeyResult<PublicKeyRecord> {
        let owner = user_id.clone();
        self.with_conn(move |conn| lookup_blocking(conn, &owner)).await
    }
}
