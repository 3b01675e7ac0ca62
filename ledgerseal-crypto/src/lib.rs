//! Encryption primitives for LedgerSeal.
//!
//! Protects sensitive financial records (transactions, profile fields) for a
//! single designated recipient using:
//! - RSA key pairs (2048 bits minimum) exchanged as PEM
//! - RSA-OAEP with SHA-256 for per-recipient envelopes
//! - ChaCha20-Poly1305 under an RSA-wrapped data key for larger payloads
//! - Argon2id passphrase protection for moving a private key between devices
//!
//! # Architecture
//!
//! Everything here is a pure transform. Key storage, the public-key
//! directory and the key lifecycle live in `ledgerseal-keys`.
//!
//! 1. **Key pair**: generated on the user's device. The public half is
//!    published; the private half stays local.
//!
//! 2. **Envelope**: a payload serialized to JSON and encrypted directly to
//!    the recipient's public key. Only the matching private key opens it.

pub mod cipher;
mod error;
pub mod hybrid;
pub mod keypair;
pub mod protect;

pub use cipher::{OAEP_HASH_LEN, decrypt, decrypt_bytes, encrypt, encrypt_bytes, max_plaintext_len};
pub use error::{CryptoError, CryptoResult};
pub use hybrid::HybridCiphertext;
pub use keypair::{
    KeyPair, KeySize, MIN_KEY_BITS, fingerprint, generate, generate_with_size,
    public_key_from_private, public_keys_equal, validate_public_key,
};
pub use protect::{PassphraseProtectedKey, protect_private_key, unprotect_private_key};
