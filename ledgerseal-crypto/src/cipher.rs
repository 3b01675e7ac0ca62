//! Envelope cipher: RSA-OAEP with SHA-256 over a base64 wire format.
//!
//! Payloads are serialized to UTF-8 JSON and encrypted directly under the
//! recipient's public key. The ciphertext is the raw RSA block, so its length
//! is fixed by the modulus and needs no framing.
//!
//! OAEP caps the plaintext at `k - 2 * hLen - 2` bytes: 190 bytes for a
//! 2048-bit key. Anything larger belongs in [`crate::hybrid`].

use crate::error::{CryptoError, CryptoResult};
use crate::keypair::{parse_private_key, parse_public_key};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPublicKey};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Output length of the OAEP hash (SHA-256).
pub const OAEP_HASH_LEN: usize = 32;

/// Maximum plaintext size for the given recipient public key.
pub fn max_plaintext_len(public_key_pem: &str) -> CryptoResult<usize> {
    parse_public_key(public_key_pem).map(|key| oaep_capacity(&key))
}

fn oaep_capacity(key: &RsaPublicKey) -> usize {
    key.size() - 2 * OAEP_HASH_LEN - 2
}

/// Serializes `payload` to JSON and encrypts it for the recipient.
pub fn encrypt<T: Serialize + ?Sized>(payload: &T, recipient_public_key: &str) -> CryptoResult<String> {
    let plaintext = Zeroizing::new(serde_json::to_vec(payload)?);
    encrypt_bytes(&plaintext, recipient_public_key)
}

/// Decrypts a ciphertext produced by [`encrypt`] and deserializes the payload.
pub fn decrypt<T: DeserializeOwned>(ciphertext: &str, private_key: &str) -> CryptoResult<T> {
    let plaintext = decrypt_bytes(ciphertext, private_key)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Encrypts raw bytes for the recipient, returning base64 ciphertext.
pub fn encrypt_bytes(plaintext: &[u8], recipient_public_key: &str) -> CryptoResult<String> {
    let key = parse_public_key(recipient_public_key)?;

    let max = oaep_capacity(&key);
    if plaintext.len() > max {
        return Err(CryptoError::PayloadTooLarge {
            size: plaintext.len(),
            max,
        });
    }

    let ciphertext = key
        .encrypt(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(STANDARD.encode(ciphertext))
}

/// Decrypts base64 ciphertext with a PKCS#8 private key.
///
/// Every failure after the key parses collapses into
/// [`CryptoError::Decryption`].
pub fn decrypt_bytes(ciphertext: &str, private_key: &str) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let key = parse_private_key(private_key)?;

    let raw = STANDARD
        .decode(ciphertext.trim())
        .map_err(|_| CryptoError::Decryption)?;
    if raw.len() != key.size() {
        return Err(CryptoError::Decryption);
    }

    key.decrypt(Oaep::new::<Sha256>(), &raw)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::Decryption)
}
