//! Key management configuration.

use crate::error::{KeyError, KeyResult};
use ledgerseal_crypto::KeySize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the directory client and key lifecycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Base URL of the public-key directory API (e.g., "https://api.ledgerseal.app").
    pub directory_base_url: String,

    /// Per-request timeout for directory calls, in seconds.
    pub request_timeout_secs: u64,

    /// RSA modulus size for newly generated key pairs.
    #[serde(default)]
    pub key_size: KeySize,

    /// Device-local directory for private key files. `None` keeps keys in
    /// memory for the session only.
    #[serde(default)]
    pub key_store_dir: Option<PathBuf>,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            directory_base_url: "https://api.ledgerseal.app".to_string(),
            request_timeout_secs: 30,
            key_size: KeySize::Bits2048,
            key_store_dir: None,
        }
    }
}

impl KeysConfig {
    /// Checks the values that would otherwise fail at first use.
    pub fn validate(&self) -> KeyResult<()> {
        let url = self.directory_base_url.trim();
        if url.is_empty() {
            return Err(KeyError::Config("directory_base_url is empty".to_string()));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(KeyError::Config(format!(
                "directory_base_url must be an http(s) URL, got {url}"
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(KeyError::Config("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}
