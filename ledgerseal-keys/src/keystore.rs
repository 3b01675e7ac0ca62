//! Device-local private key storage.
//!
//! A [`KeyStore`] holds one user's private key on one device. It never
//! transmits the key; the lifecycle manager writes to it and callers read
//! from it to decrypt. `clear()` runs on sign-out.

use crate::error::{KeyError, KeyResult};
use crate::types::UserId;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use zeroize::Zeroizing;

/// Capability boundary for a user's private key on this device.
pub trait KeyStore: Send + Sync {
    /// Stores the PKCS#8 PEM private key, replacing any previous key.
    fn store(&self, private_key: &str) -> KeyResult<()>;

    /// Returns the stored private key, if any.
    fn get(&self) -> KeyResult<Option<Zeroizing<String>>>;

    /// Removes the stored private key. Succeeds when nothing is stored.
    fn clear(&self) -> KeyResult<()>;
}

/// Session-only key store. The key is gone when the process exits.
#[derive(Default)]
pub struct MemoryKeyStore {
    key: RwLock<Option<Zeroizing<String>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn store(&self, private_key: &str) -> KeyResult<()> {
        let mut key = self.key.write().map_err(|e| KeyError::KeyStore(e.to_string()))?;
        *key = Some(Zeroizing::new(private_key.to_string()));
        Ok(())
    }

    fn get(&self) -> KeyResult<Option<Zeroizing<String>>> {
        let key = self.key.read().map_err(|e| KeyError::KeyStore(e.to_string()))?;
        Ok(key.clone())
    }

    fn clear(&self) -> KeyResult<()> {
        let mut key = self.key.write().map_err(|e| KeyError::KeyStore(e.to_string()))?;
        *key = None;
        Ok(())
    }
}

/// Key store backed by one PEM file per user in a device-local directory.
///
/// Writes go through a temporary file and a rename, so a crash never leaves
/// a half-written key. On Unix the file is readable by the owner only.
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    /// Key store for `user_id` under `dir`. The file name is a hash of the
    /// user id, so arbitrary ids map to safe, distinct paths.
    pub fn for_user(dir: impl AsRef<Path>, user_id: &UserId) -> Self {
        let name = hex::encode(Sha256::digest(user_id.as_str().as_bytes()));
        Self {
            path: dir.as_ref().join(format!("{name}.pem")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("pem.tmp")
    }
}

impl KeyStore for FileKeyStore {
    fn store(&self, private_key: &str) -> KeyResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| KeyError::KeyStore(format!("create {}: {e}", parent.display())))?;
        }

        let tmp = self.temp_path();
        let mut file = open_private_file(&tmp)
            .map_err(|e| KeyError::KeyStore(format!("open {}: {e}", tmp.display())))?;
        file.write_all(private_key.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| KeyError::KeyStore(format!("write {}: {e}", tmp.display())))?;
        drop(file);

        fs::rename(&tmp, &self.path)
            .map_err(|e| KeyError::KeyStore(format!("rename to {}: {e}", self.path.display())))
    }

    fn get(&self) -> KeyResult<Option<Zeroizing<String>>> {
        match fs::read_to_string(&self.path) {
            Ok(pem) => Ok(Some(Zeroizing::new(pem))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KeyError::KeyStore(format!("read {}: {e}", self.path.display()))),
        }
    }

    fn clear(&self) -> KeyResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KeyError::KeyStore(format!("remove {}: {e}", self.path.display()))),
        }
    }
}

#[cfg(unix)]
fn open_private_file(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private_file(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
