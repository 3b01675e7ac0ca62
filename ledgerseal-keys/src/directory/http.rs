//! HTTP client for the hosted public-key directory.
//!
//! Endpoints:
//! - `GET  {base}/api/keys/public/{user_id}` → record, 404 when absent
//! - `PUT  {base}/api/keys/public/{user_id}` with `{public_key, fingerprint}`
//!   → stored record

use super::PublicKeyDirectory;
use crate::config::KeysConfig;
use crate::error::{KeyError, KeyResult};
use crate::types::{PublicKeyRecord, UserId};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Serialize)]
struct PublishRequest<'a> {
    public_key: &'a str,
    fingerprint: String,
}

/// Directory backed by the REST API of the external datastore.
pub struct HttpDirectory {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpDirectory {
    pub fn new(config: &KeysConfig) -> KeyResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.directory_base_url.trim().trim_end_matches('/').to_string(),
            access_token: None,
        })
    }

    /// Attaches the identity provider's access token to every request.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn key_url(&self, user_id: &UserId) -> String {
        format!(
            "{}/api/keys/public/{}",
            self.base_url,
            urlencoding::encode(user_id.as_str())
        )
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn check_user(user_id: &UserId, record: &PublicKeyRecord) -> KeyResult<()> {
        if &record.user_id != user_id {
            return Err(KeyError::Directory(format!(
                "directory returned record for {} when asked for {user_id}",
                record.user_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PublicKeyDirectory for HttpDirectory {
    async fn publish(&self, user_id: &UserId, public_key: &str) -> KeyResult<PublicKeyRecord> {
        let fingerprint = ledgerseal_crypto::fingerprint(public_key)?;

        let resp = self
            .authorize(self.client.put(self.key_url(user_id)))
            .json(&PublishRequest {
                public_key,
                fingerprint: fingerprint.clone(),
            })
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                warn!("publishing public key for {user_id} failed: {e}");
                KeyError::Directory(e.to_string())
            })?;

        let record: PublicKeyRecord = resp.json().await?;
        Self::check_user(user_id, &record)?;
        if !ledgerseal_crypto::public_keys_equal(&record.public_key, public_key)? {
            warn!("directory stored a different key than published for {user_id}");
            return Err(KeyError::Directory(format!(
                "directory returned a different public key for {user_id}"
            )));
        }

        debug!("published public key {fingerprint} for {user_id}");
        Ok(record)
    }

    async fn lookup(&self, user_id: &UserId) -> KeyResult<PublicKeyRecord> {
        let resp = self
            .authorize(self.client.get(self.key_url(user_id)))
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(KeyError::NotFound(user_id.clone()));
        }

        let record: PublicKeyRecord = resp
            .error_for_status()
            .map_err(|e| KeyError::Directory(e.to_string()))?
            .json()
            .await?;
        Self::check_user(user_id, &record)?;
        Ok(record)
    }
}
