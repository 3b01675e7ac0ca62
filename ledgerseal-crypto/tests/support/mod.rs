//! Shared key pairs for crypto tests.
//!
//! RSA generation dominates test time, so each fixture key is generated once
//! per test binary.

#![allow(dead_code)]

use ledgerseal_crypto::{KeyPair, generate};
use std::sync::OnceLock;

pub fn alice() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| generate().expect("key generation must succeed"))
}

pub fn bob() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| generate().expect("key generation must succeed"))
}

/// A 1024-bit key, below the accepted minimum.
pub fn weak_public_key_pem() -> String {
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    let private = rsa::RsaPrivateKey::new(&mut rand::rngs::OsRng, 1024).unwrap();
    rsa::RsaPublicKey::from(&private)
        .to_public_key_pem(LineEnding::LF)
        .unwrap()
}
