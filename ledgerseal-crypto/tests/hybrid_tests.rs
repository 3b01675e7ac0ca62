mod support;

use ledgerseal_crypto::hybrid::{open, open_bytes, seal, seal_bytes};
use ledgerseal_crypto::CryptoError;
use pretty_assertions::assert_eq;
use serde_json::json;
use support::{alice, bob};

fn statement() -> serde_json::Value {
    let rows: Vec<_> = (0..40)
        .map(|i| json!({"date": format!("2024-03-{:02}", i % 28 + 1), "amount": i * 13, "memo": "card purchase"}))
        .collect();
    json!({"account": "checking", "rows": rows})
}

#[test]
fn payload_beyond_oaep_capacity_roundtrips() {
    let payload = statement();
    assert!(serde_json::to_vec(&payload).unwrap().len() > 190);

    let sealed = seal(&payload, alice().public_key()).unwrap();
    let recovered: serde_json::Value = open(&sealed, alice().private_key()).unwrap();

    assert_eq!(recovered, payload);
}

#[test]
fn wrong_recipient_cannot_open() {
    let sealed = seal(&statement(), alice().public_key()).unwrap();

    let err = open::<serde_json::Value>(&sealed, bob().private_key()).unwrap_err();
    assert!(matches!(err, CryptoError::Decryption));
}

#[test]
fn tampered_body_fails() {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let mut sealed = seal_bytes(&[1u8; 4096], alice().public_key()).unwrap();
    let mut body = STANDARD.decode(&sealed.ciphertext).unwrap();
    body[100] ^= 0x01;
    sealed.ciphertext = STANDARD.encode(&body);

    assert!(matches!(
        open_bytes(&sealed, alice().private_key()),
        Err(CryptoError::Decryption)
    ));
}

#[test]
fn swapped_wrapped_key_fails() {
    let first = seal_bytes(b"first record", alice().public_key()).unwrap();
    let mut second = seal_bytes(b"second record", alice().public_key()).unwrap();
    second.wrapped_key = first.wrapped_key.clone();

    assert!(matches!(
        open_bytes(&second, alice().private_key()),
        Err(CryptoError::Decryption)
    ));
}

#[test]
fn bad_nonce_fails() {
    let mut sealed = seal_bytes(b"record", alice().public_key()).unwrap();
    sealed.nonce = "AAAA".to_string();

    assert!(matches!(
        open_bytes(&sealed, alice().private_key()),
        Err(CryptoError::Decryption)
    ));
}

#[test]
fn sealed_form_serializes_as_json() {
    let sealed = seal_bytes(b"record", alice().public_key()).unwrap();
    let text = serde_json::to_string(&sealed).unwrap();
    let back: ledgerseal_crypto::HybridCiphertext = serde_json::from_str(&text).unwrap();

    assert_eq!(back, sealed);
    assert_eq!(open_bytes(&back, alice().private_key()).unwrap().as_slice(), b"record");
}
