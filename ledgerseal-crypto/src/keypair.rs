//! RSA key pair generation and PEM key handling.
//!
//! Public keys travel as PEM-encoded SPKI, private keys as PEM-encoded
//! PKCS#8. Private key PEM is held in zeroizing buffers and never appears in
//! `Debug` output.

use crate::error::{CryptoError, CryptoResult};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

/// Smallest RSA modulus accepted for encryption or publication.
pub const MIN_KEY_BITS: usize = 2048;

/// Supported RSA modulus sizes.
///
/// Larger keys raise the OAEP payload capacity at the cost of slower
/// generation and decryption.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum KeySize {
    #[default]
    Bits2048,
    Bits3072,
    Bits4096,
}

impl KeySize {
    pub fn bits(self) -> usize {
        match self {
            KeySize::Bits2048 => 2048,
            KeySize::Bits3072 => 3072,
            KeySize::Bits4096 => 4096,
        }
    }
}

impl TryFrom<usize> for KeySize {
    type Error = CryptoError;

    fn try_from(bits: usize) -> CryptoResult<Self> {
        match bits {
            2048 => Ok(KeySize::Bits2048),
            3072 => Ok(KeySize::Bits3072),
            4096 => Ok(KeySize::Bits4096),
            other => Err(CryptoError::KeyFormat(format!(
                "unsupported key size: {other} bits (expected 2048, 3072 or 4096)"
            ))),
        }
    }
}

impl From<KeySize> for usize {
    fn from(size: KeySize) -> usize {
        size.bits()
    }
}

/// A freshly generated RSA key pair.
///
/// Both halves are created together and only exposed by reference; the
/// private half is meant to stay on the device that generated it.
pub struct KeyPair {
    public_key: String,
    private_key: Zeroizing<String>,
}

impl KeyPair {
    /// PEM-encoded SPKI public key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// PEM-encoded PKCS#8 private key.
    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    /// SHA-256 fingerprint of the public key.
    pub fn fingerprint(&self) -> CryptoResult<String> {
        fingerprint(&self.public_key)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Generates a 2048-bit RSA key pair from the OS CSPRNG.
pub fn generate() -> CryptoResult<KeyPair> {
    generate_with_size(KeySize::default())
}

/// Generates an RSA key pair of the given size from the OS CSPRNG.
pub fn generate_with_size(size: KeySize) -> CryptoResult<KeyPair> {
    let private = RsaPrivateKey::new(&mut rand::rngs::OsRng, size.bits())
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    let public = RsaPublicKey::from(&private);

    let public_key = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGeneration(format!("public key encoding failed: {e}")))?;
    let private_key = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGeneration(format!("private key encoding failed: {e}")))?;

    Ok(KeyPair {
        public_key,
        private_key,
    })
}

/// Checks that `pem` is an RSA public key of at least [`MIN_KEY_BITS`].
pub fn validate_public_key(pem: &str) -> CryptoResult<()> {
    parse_public_key(pem).map(|_| ())
}

/// Derives the PEM public key belonging to a PKCS#8 private key.
pub fn public_key_from_private(private_key_pem: &str) -> CryptoResult<String> {
    let private = parse_private_key(private_key_pem)?;
    RsaPublicKey::from(&private)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyFormat(format!("public key encoding failed: {e}")))
}

/// Compares two PEM public keys by value, ignoring encoding whitespace.
pub fn public_keys_equal(a: &str, b: &str) -> CryptoResult<bool> {
    Ok(parse_public_key(a)? == parse_public_key(b)?)
}

/// Hex SHA-256 of the DER-encoded SPKI public key.
pub fn fingerprint(public_key_pem: &str) -> CryptoResult<String> {
    let der = parse_public_key(public_key_pem)?
        .to_public_key_der()
        .map_err(|e| CryptoError::KeyFormat(format!("public key encoding failed: {e}")))?;
    Ok(hex::encode(Sha256::digest(der.as_bytes())))
}

pub(crate) fn parse_public_key(pem: &str) -> CryptoResult<RsaPublicKey> {
    let key = RsaPublicKey::from_public_key_pem(pem.trim())
        .map_err(|e| CryptoError::KeyFormat(format!("public key: {e}")))?;
    check_modulus(key.n().bits())?;
    Ok(key)
}

pub(crate) fn parse_private_key(pem: &str) -> CryptoResult<RsaPrivateKey> {
    let key = RsaPrivateKey::from_pkcs8_pem(pem.trim())
        .map_err(|e| CryptoError::KeyFormat(format!("private key: {e}")))?;
    check_modulus(key.n().bits())?;
    Ok(key)
}

fn check_modulus(bits: usize) -> CryptoResult<()> {
    if bits < MIN_KEY_BITS {
        return Err(CryptoError::KeyFormat(format!(
            "key is {bits} bits, minimum is {MIN_KEY_BITS}"
        )));
    }
    Ok(())
}
