//! Envelope orchestration tests: directory resolution, the missing-key
//! policy, and the effect of rotation on new and old envelopes.

mod support;

use ledgerseal_crypto::{CryptoError, generate};
use ledgerseal_keys::{
    EncryptedEnvelope, EncryptionOrchestrator, KeyError, KeyLifecycleManager, MemoryDirectory,
    MemoryKeyStore, MissingKeyPolicy, PublicKeyDirectory, SealedRecord,
};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use support::{fixture_key, user};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Transaction {
    amount: u64,
    memo: String,
}

fn rent() -> Transaction {
    Transaction {
        amount: 100,
        memo: "rent".to_string(),
    }
}

async fn directory_with_bob() -> Arc<MemoryDirectory> {
    let directory = Arc::new(MemoryDirectory::new());
    directory
        .publish(&user("bob"), fixture_key().public_key())
        .await
        .unwrap();
    directory
}

#[tokio::test]
async fn recipient_decrypts_record_sent_to_them() {
    let orchestrator = EncryptionOrchestrator::new(directory_with_bob().await);

    let envelope = orchestrator
        .encrypt_for(&rent(), &user("alice"), &user("bob"))
        .await
        .unwrap();

    assert_eq!(envelope.sender_id(), &user("alice"));
    assert_eq!(envelope.recipient_id(), &user("bob"));
    assert!(!envelope.ciphertext().contains("rent"));

    let opened: Transaction = orchestrator
        .decrypt_as(&envelope, fixture_key().private_key())
        .unwrap();
    assert_eq!(opened, rent());
}

#[tokio::test]
async fn other_keys_cannot_read_the_record() {
    let orchestrator = EncryptionOrchestrator::new(directory_with_bob().await);
    let envelope = orchestrator
        .encrypt_for(&rent(), &user("alice"), &user("bob"))
        .await
        .unwrap();

    let carol = generate().unwrap();
    let err = orchestrator
        .decrypt_as::<Transaction>(&envelope, carol.private_key())
        .unwrap_err();

    assert!(err.is_unreadable_record(), "got: {err:?}");
}

#[tokio::test]
async fn envelope_survives_storage_round_trip() {
    let orchestrator = EncryptionOrchestrator::new(directory_with_bob().await);
    let envelope = orchestrator
        .encrypt_for(&rent(), &user("alice"), &user("bob"))
        .await
        .unwrap();

    let stored = serde_json::to_string(&envelope).unwrap();
    let loaded: EncryptedEnvelope = serde_json::from_str(&stored).unwrap();
    assert_eq!(loaded, envelope);

    let rebuilt = EncryptedEnvelope::from_stored(
        envelope.ciphertext(),
        envelope.sender_id().clone(),
        envelope.recipient_id().clone(),
    );
    let opened: Transaction = orchestrator
        .decrypt_as(&rebuilt, fixture_key().private_key())
        .unwrap();
    assert_eq!(opened, rent());
}

#[tokio::test]
async fn tampered_envelope_is_unreadable() {
    let orchestrator = EncryptionOrchestrator::new(directory_with_bob().await);
    let envelope = orchestrator
        .encrypt_for(&rent(), &user("alice"), &user("bob"))
        .await
        .unwrap();

    let mut ciphertext = envelope.ciphertext().to_string();
    let flipped = if ciphertext.starts_with('A') { "B" } else { "A" };
    ciphertext.replace_range(0..1, flipped);
    let tampered = EncryptedEnvelope::from_stored(ciphertext, user("alice"), user("bob"));

    let err = orchestrator
        .decrypt_as::<Transaction>(&tampered, fixture_key().private_key())
        .unwrap_err();
    assert!(err.is_unreadable_record());
}

// ── Missing recipient key ──

#[tokio::test]
async fn missing_recipient_key_propagates_not_found() {
    let orchestrator = EncryptionOrchestrator::new(Arc::new(MemoryDirectory::new()));

    let err = orchestrator
        .encrypt_for(&rent(), &user("alice"), &user("carol"))
        .await
        .unwrap_err();

    assert!(matches!(err, KeyError::NotFound(id) if id == user("carol")));
}

#[tokio::test]
async fn reject_policy_refuses_plaintext() {
    let orchestrator = EncryptionOrchestrator::new(Arc::new(MemoryDirectory::new()));

    let err = orchestrator
        .seal_for(&rent(), &user("alice"), &user("carol"), MissingKeyPolicy::Reject)
        .await
        .unwrap_err();

    assert!(matches!(err, KeyError::NotFound(_)));
}

#[tokio::test]
async fn allow_plaintext_policy_stores_payload_unencrypted() {
    let orchestrator = EncryptionOrchestrator::new(Arc::new(MemoryDirectory::new()));

    let sealed = orchestrator
        .seal_for(
            &rent(),
            &user("alice"),
            &user("carol"),
            MissingKeyPolicy::AllowPlaintext,
        )
        .await
        .unwrap();

    assert!(!sealed.is_encrypted());
    assert_eq!(
        sealed,
        SealedRecord::Plaintext {
            payload: json!({"amount": 100, "memo": "rent"}),
            sender_id: user("alice"),
            recipient_id: user("carol"),
        }
    );
}

#[tokio::test]
async fn seal_for_encrypts_when_key_exists_regardless_of_policy() {
    let orchestrator = EncryptionOrchestrator::new(directory_with_bob().await);

    for policy in [MissingKeyPolicy::Reject, MissingKeyPolicy::AllowPlaintext] {
        let sealed = orchestrator
            .seal_for(&rent(), &user("alice"), &user("bob"), policy)
            .await
            .unwrap();

        let envelope = match sealed {
            SealedRecord::Encrypted(envelope) => envelope,
            other => panic!("{policy:?}: expected Encrypted, got: {other:?}"),
        };
        let opened: Transaction = orchestrator
            .decrypt_as(&envelope, fixture_key().private_key())
            .unwrap();
        assert_eq!(opened, rent());
    }
}

#[tokio::test]
async fn sealed_record_serializes_with_kind_tag() {
    let orchestrator = EncryptionOrchestrator::new(Arc::new(MemoryDirectory::new()));
    let sealed = orchestrator
        .seal_for(
            &rent(),
            &user("alice"),
            &user("carol"),
            MissingKeyPolicy::AllowPlaintext,
        )
        .await
        .unwrap();

    let value = serde_json::to_value(&sealed).unwrap();
    assert_eq!(value["kind"], "plaintext");
    assert_eq!(value["recipient_id"], "carol");
}

// ── Capacity ──

#[tokio::test]
async fn oversized_payload_is_rejected_before_encryption() {
    let orchestrator = EncryptionOrchestrator::new(directory_with_bob().await);
    let statement = "x".repeat(500);

    let err = orchestrator
        .encrypt_for(&statement, &user("alice"), &user("bob"))
        .await
        .unwrap_err();

    match err {
        KeyError::Crypto(CryptoError::PayloadTooLarge { size, max }) => {
            assert_eq!(size, 502);
            assert_eq!(max, 190);
        }
        other => panic!("expected PayloadTooLarge, got: {other:?}"),
    }
}

#[tokio::test]
async fn large_payload_uses_hybrid_envelope() {
    let orchestrator = EncryptionOrchestrator::new(directory_with_bob().await);
    let statement: Vec<Transaction> = (0..200)
        .map(|i| Transaction {
            amount: i,
            memo: format!("line item {i}"),
        })
        .collect();

    let envelope = orchestrator
        .encrypt_large_for(&statement, &user("alice"), &user("bob"))
        .await
        .unwrap();

    assert_eq!(envelope.sender_id(), &user("alice"));
    assert_eq!(envelope.recipient_id(), &user("bob"));

    let opened: Vec<Transaction> = orchestrator
        .decrypt_large_as(&envelope, fixture_key().private_key())
        .unwrap();
    assert_eq!(opened, statement);

    let carol = generate().unwrap();
    let err = orchestrator
        .decrypt_large_as::<Vec<Transaction>>(&envelope, carol.private_key())
        .unwrap_err();
    assert!(err.is_unreadable_record());
}

// ── Rotation ──

#[tokio::test]
async fn encryption_follows_rotated_key() {
    let directory = Arc::new(MemoryDirectory::new());
    let bob_store = Arc::new(MemoryKeyStore::new());
    let bob = KeyLifecycleManager::new(user("bob"), bob_store, directory.clone());
    bob.initialize().await.unwrap();
    let old_private = bob.private_key().unwrap().unwrap();

    let orchestrator = EncryptionOrchestrator::new(directory.clone());
    let before = orchestrator
        .encrypt_for(&rent(), &user("alice"), &user("bob"))
        .await
        .unwrap();

    bob.rotate().await.unwrap();
    let new_private = bob.private_key().unwrap().unwrap();

    let after = orchestrator
        .encrypt_for(&rent(), &user("alice"), &user("bob"))
        .await
        .unwrap();

    // New envelopes use the new key immediately.
    let opened: Transaction = orchestrator.decrypt_as(&after, &new_private).unwrap();
    assert_eq!(opened, rent());
    assert!(orchestrator
        .decrypt_as::<Transaction>(&after, &old_private)
        .unwrap_err()
        .is_unreadable_record());

    // Old envelopes stay sealed to the superseded key.
    let err = orchestrator
        .decrypt_as::<Transaction>(&before, &new_private)
        .unwrap_err();
    assert!(err.is_unreadable_record());
}
