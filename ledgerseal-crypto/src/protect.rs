//! Passphrase-protected private keys for moving a key between devices.
//!
//! Argon2id derives a 256-bit key from the passphrase and a random salt;
//! ChaCha20-Poly1305 encrypts the PKCS#8 PEM. The salt travels with the
//! ciphertext so the passphrase is the only other input needed to open it.

use crate::error::{CryptoError, CryptoResult};
use crate::keypair::parse_private_key;
use argon2::Argon2;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

pub const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;

/// Minimum passphrase length in characters.
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// A private key encrypted under a passphrase. All fields are base64.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassphraseProtectedKey {
    pub salt: String,
    pub nonce: String,
    pub ciphertext: String,
}

/// Encrypts a PKCS#8 private key PEM with a passphrase.
pub fn protect_private_key(
    private_key_pem: &str,
    passphrase: &str,
) -> CryptoResult<PassphraseProtectedKey> {
    if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
        return Err(CryptoError::KeyDerivation(format!(
            "passphrase too short (min {MIN_PASSPHRASE_LEN} characters)"
        )));
    }
    parse_private_key(private_key_pem)?;

    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), private_key_pem.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("private key protection failed: {e}")))?;

    Ok(PassphraseProtectedKey {
        salt: STANDARD.encode(salt),
        nonce: STANDARD.encode(nonce),
        ciphertext: STANDARD.encode(ciphertext),
    })
}

/// Recovers the PKCS#8 private key PEM from a [`PassphraseProtectedKey`].
///
/// A wrong passphrase and a tampered blob both yield
/// [`CryptoError::Decryption`].
pub fn unprotect_private_key(
    protected: &PassphraseProtectedKey,
    passphrase: &str,
) -> CryptoResult<Zeroizing<String>> {
    let salt = STANDARD
        .decode(&protected.salt)
        .map_err(|_| CryptoError::Decryption)?;
    let nonce = STANDARD
        .decode(&protected.nonce)
        .map_err(|_| CryptoError::Decryption)?;
    let ciphertext = STANDARD
        .decode(&protected.ciphertext)
        .map_err(|_| CryptoError::Decryption)?;
    if salt.len() != SALT_SIZE || nonce.len() != NONCE_SIZE {
        return Err(CryptoError::Decryption);
    }

    let key = derive_key(passphrase, &salt)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| CryptoError::Decryption)?,
    );

    let pem = Zeroizing::new(
        String::from_utf8(plaintext.to_vec()).map_err(|_| CryptoError::Decryption)?,
    );
    parse_private_key(&pem)?;
    Ok(pem)
}

fn derive_key(passphrase: &str, salt: &[u8]) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}
