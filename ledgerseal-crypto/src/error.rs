//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in key handling and envelope encryption.
///
/// None of these are retryable: repeating the same call with the same
/// inputs fails the same way.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A PEM key could not be parsed or is below the minimum modulus size.
    #[error("invalid key format: {0}")]
    KeyFormat(String),

    #[error("payload too large: {size} bytes exceeds OAEP capacity of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Entropy or environment failure while generating a key pair.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Wrong key, corrupted ciphertext or tampered data. Carries no detail.
    #[error("decryption failed")]
    Decryption,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
