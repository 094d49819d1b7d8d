//! Tampered and structurally broken envelopes must fail with the
//! received-input error taxonomy, never a panic or a misleading error.

mod common;

use common::*;
use didcomm_core::{pack_encrypted, pack_signed, PackEncryptedOptions};
use serde_json::Value;

fn direct_options() -> PackEncryptedOptions {
    PackEncryptedOptions {
        forward: false,
        ..PackEncryptedOptions::default()
    }
}

#[tokio::test]
async fn tampered_recipient_kid_breaks_apv_binding() {
    // Arrange
    let did_resolver = default_did_resolver();
    let alice_secrets = ExampleSecretsResolver::new(alice_secrets());
    let bob_secrets = ExampleSecretsResolver::new(bob_secrets());
    let (wire, _) = pack_encrypted(
        &sample_message(),
        BOB_DID,
        None,
        None,
        &did_resolver,
        &alice_secrets,
        &RawCrypto,
        &direct_options(),
    )
    .await
    .unwrap();

    // Act: swap one recipient kid for another valid one of bob's.
    let tampered = wire.replace("key-x25519-1", "key-x25519-9");
    let err = unpack(
        &tampered,
        &did_resolver,
        &bob_secrets,
        &RawCrypto,
        &UnpackOptions::default(),
    )
    .await
    .unwrap_err();

    // Assert
    assert!(matches!(err, Error::Malformed(Malformed::InvalidMessage)));
}

#[tokio::test]
async fn tampered_ciphertext_cannot_be_decrypted() {
    // Arrange
    let did_resolver = default_did_resolver();
    let alice_secrets = ExampleSecretsResolver::new(alice_secrets());
    let bob_secrets = ExampleSecretsResolver::new(bob_secrets());
    let (wire, _) = pack_encrypted(
        &sample_message(),
        BOB_DID,
        None,
        None,
        &did_resolver,
        &alice_secrets,
        &RawCrypto,
        &direct_options(),
    )
    .await
    .unwrap();

    // Act: flip the tag so AEAD verification fails for every key.
    let mut envelope: Value = serde_json::from_str(&wire).unwrap();
    envelope["tag"] = json!("AAAAAAAAAAAAAAAAAAAAAA");
    let err = unpack(
        &envelope.to_string(),
        &did_resolver,
        &bob_secrets,
        &RawCrypto,
        &UnpackOptions::default(),
    )
    .await
    .unwrap_err();

    // Assert
    assert!(matches!(err, Error::Malformed(Malformed::CanNotDecrypt)));
    assert!(err.is_malformed());
}

#[tokio::test]
async fn skid_differing_from_apu_is_rejected() {
    // Arrange
    let did_resolver = default_did_resolver();
    let alice_secrets = ExampleSecretsResolver::new(alice_secrets());
    let bob_secrets = ExampleSecretsResolver::new(bob_secrets());
    let (wire, _) = pack_encrypted(
        &sample_message(),
        BOB_DID,
        Some(ALICE_DID),
        None,
        &did_resolver,
        &alice_secrets,
        &RawCrypto,
        &direct_options(),
    )
    .await
    .unwrap();

    // Act: rewrite skid to another valid kid so it no longer matches apu.
    let mut envelope: Value = serde_json::from_str(&wire).unwrap();
    let protected_b64 = envelope["protected"].as_str().unwrap();
    let mut protected: Value =
        serde_json::from_slice(&base64_url::decode(protected_b64).unwrap()).unwrap();
    protected["skid"] = json!(format!("{}#key-p256-1", ALICE_DID));
    envelope["protected"] = json!(base64_url::encode(&protected.to_string()));
    let err = unpack(
        &envelope.to_string(),
        &did_resolver,
        &bob_secrets,
        &RawCrypto,
        &UnpackOptions::default(),
    )
    .await
    .unwrap_err();

    // Assert
    assert!(matches!(err, Error::Malformed(Malformed::InvalidMessage)));
}

#[tokio::test]
async fn apu_that_is_not_a_did_url_is_rejected() {
    // Arrange
    let did_resolver = default_did_resolver();
    let alice_secrets = ExampleSecretsResolver::new(alice_secrets());
    let bob_secrets = ExampleSecretsResolver::new(bob_secrets());
    let (wire, _) = pack_encrypted(
        &sample_message(),
        BOB_DID,
        Some(ALICE_DID),
        None,
        &did_resolver,
        &alice_secrets,
        &RawCrypto,
        &direct_options(),
    )
    .await
    .unwrap();

    // Act: apu must decode to a DID-URL naming the sender key.
    let mut envelope: Value = serde_json::from_str(&wire).unwrap();
    let protected_b64 = envelope["protected"].as_str().unwrap();
    let mut protected: Value =
        serde_json::from_slice(&base64_url::decode(protected_b64).unwrap()).unwrap();
    protected["apu"] = json!(base64_url::encode("alice-key-1"));
    envelope["protected"] = json!(base64_url::encode(&protected.to_string()));
    let err = unpack(
        &envelope.to_string(),
        &did_resolver,
        &bob_secrets,
        &RawCrypto,
        &UnpackOptions::default(),
    )
    .await
    .unwrap_err();

    // Assert
    assert!(matches!(err, Error::Malformed(Malformed::InvalidMessage)));
}

#[tokio::test]
async fn tampered_signed_payload_is_rejected() {
    // Arrange
    let did_resolver = default_did_resolver();
    let alice_secrets = ExampleSecretsResolver::new(alice_secrets());
    let bob_secrets = ExampleSecretsResolver::new(bob_secrets());
    let (wire, _) = pack_signed(
        &sample_message(),
        ALICE_DID,
        &did_resolver,
        &alice_secrets,
        &RawCrypto,
    )
    .await
    .unwrap();

    // Act: replace the signed payload with a different message.
    let mut envelope: Value = serde_json::from_str(&wire).unwrap();
    let other = sample_message().thid("other-thread");
    envelope["payload"] = json!(base64_url::encode(&other.to_wire().unwrap()));
    let err = unpack(
        &envelope.to_string(),
        &did_resolver,
        &bob_secrets,
        &RawCrypto,
        &UnpackOptions::default(),
    )
    .await
    .unwrap_err();

    // Assert
    assert!(matches!(err, Error::Malformed(Malformed::InvalidSignature)));
}

#[tokio::test]
async fn non_object_wire_input_is_invalid() {
    // Arrange
    let did_resolver = default_did_resolver();
    let bob_secrets = ExampleSecretsResolver::new(bob_secrets());

    for wire in ["[]", "42", "not json at all"] {
        // Act
        let err = unpack(
            wire,
            &did_resolver,
            &bob_secrets,
            &RawCrypto,
            &UnpackOptions::default(),
        )
        .await
        .unwrap_err();

        // Assert
        assert!(matches!(err, Error::Malformed(Malformed::InvalidMessage)));
    }
}

#[tokio::test]
async fn plaintext_with_wrong_typ_is_rejected() {
    // Arrange
    let did_resolver = default_did_resolver();
    let bob_secrets = ExampleSecretsResolver::new(bob_secrets());
    let wire = r#"{
        "id": "1234567890",
        "typ": "application/didcomm-signed+json",
        "type": "http://example.com/protocols/lets_do_lunch/1.0/proposal",
        "body": {}
    }"#;

    // Act
    let err = unpack(
        wire,
        &did_resolver,
        &bob_secrets,
        &RawCrypto,
        &UnpackOptions::default(),
    )
    .await
    .unwrap_err();

    // Assert
    assert!(matches!(err, Error::Malformed(Malformed::InvalidPlaintext)));
}
