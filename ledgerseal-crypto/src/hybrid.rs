//! Hybrid sealing for payloads beyond OAEP capacity.
//!
//! A random 256-bit data key encrypts the payload with ChaCha20-Poly1305, and
//! only the data key goes through RSA-OAEP for the recipient.

use crate::cipher::{decrypt_bytes, encrypt_bytes};
use crate::error::{CryptoError, CryptoResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Data key size in bytes.
pub const DATA_KEY_SIZE: usize = 32;

/// ChaCha20-Poly1305 nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// Payload sealed under a per-message data key. All fields are base64.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridCiphertext {
    /// Data key encrypted with RSA-OAEP for the recipient.
    pub wrapped_key: String,
    pub nonce: String,
    /// ChaCha20-Poly1305 ciphertext including the tag.
    pub ciphertext: String,
}

/// Serializes `payload` to JSON and seals it for the recipient.
pub fn seal<T: Serialize + ?Sized>(
    payload: &T,
    recipient_public_key: &str,
) -> CryptoResult<HybridCiphertext> {
    let plaintext = Zeroizing::new(serde_json::to_vec(payload)?);
    seal_bytes(&plaintext, recipient_public_key)
}

/// Opens a [`HybridCiphertext`] and deserializes the payload.
pub fn open<T: DeserializeOwned>(sealed: &HybridCiphertext, private_key: &str) -> CryptoResult<T> {
    let plaintext = open_bytes(sealed, private_key)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Seals raw bytes of any length for the recipient.
pub fn seal_bytes(plaintext: &[u8], recipient_public_key: &str) -> CryptoResult<HybridCiphertext> {
    let mut data_key = Zeroizing::new([0u8; DATA_KEY_SIZE]);
    rand::rngs::OsRng.fill_bytes(&mut data_key[..]);

    let wrapped_key = encrypt_bytes(&data_key[..], recipient_public_key)?;

    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&data_key[..]));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("payload seal failed: {e}")))?;

    Ok(HybridCiphertext {
        wrapped_key,
        nonce: STANDARD.encode(nonce),
        ciphertext: STANDARD.encode(ciphertext),
    })
}

/// Opens a [`HybridCiphertext`] to raw bytes.
///
/// A wrong key, a swapped wrapped key, or any tampering yields
/// [`CryptoError::Decryption`].
pub fn open_bytes(sealed: &HybridCiphertext, private_key: &str) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let data_key = decrypt_bytes(&sealed.wrapped_key, private_key)?;
    if data_key.len() != DATA_KEY_SIZE {
        return Err(CryptoError::Decryption);
    }

    let nonce = STANDARD
        .decode(&sealed.nonce)
        .map_err(|_| CryptoError::Decryption)?;
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::Decryption);
    }
    let ciphertext = STANDARD
        .decode(&sealed.ciphertext)
        .map_err(|_| CryptoError::Decryption)?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&data_key));
    cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::Decryption)
}
