//! Key management and per-recipient envelopes for LedgerSeal.
//!
//! Provides:
//! - A device-local [`KeyStore`] for the user's private key
//! - A [`PublicKeyDirectory`] mapping user ids to current public keys
//!   (in-memory, SQLite and HTTP backends)
//! - [`KeyLifecycleManager`] for first-use generation, publication,
//!   rotation and cross-device import
//! - [`EncryptionOrchestrator`] for sealing records to a recipient by id
//!
//! Authentication, transport security and record persistence are provided
//! by the surrounding application.

pub mod config;
pub mod directory;
pub mod error;
pub mod keystore;
pub mod lifecycle;
pub mod orchestrator;
pub mod types;

pub use config::KeysConfig;
pub use directory::{HttpDirectory, MemoryDirectory, PublicKeyDirectory, SqliteDirectory};
pub use error::{KeyError, KeyResult};
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore};
pub use lifecycle::{KeyLifecycleManager, LifecycleOutcome, LifecycleState};
pub use orchestrator::EncryptionOrchestrator;
pub use types::*;
