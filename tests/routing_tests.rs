//! Forward wrapping on pack, mediator-side unwrapping, endpoint indirection
//! and re-wrapping transparency.

mod common;

use common::*;
use didcomm_core::{
    pack_encrypted, PackEncryptedOptions,
    routing::{resolve_did_comm_services_chain, unpack_forward, wrap_in_forward},
};

#[tokio::test]
async fn forward_is_wrapped_for_routing_keys() {
    // Arrange
    init_logging();
    let msg = sample_message();
    let did_resolver = default_did_resolver();
    let alice_secrets = ExampleSecretsResolver::new(alice_secrets());
    let mediator_secrets = ExampleSecretsResolver::new(mediator1_secrets());
    let bob_secrets = ExampleSecretsResolver::new(bob_secrets());

    // Act: default options enable forwarding, bob's service names mediator1.
    let (wire, pack_metadata) = pack_encrypted(
        &msg,
        BOB_DID,
        Some(ALICE_DID),
        None,
        &did_resolver,
        &alice_secrets,
        &RawCrypto,
        &PackEncryptedOptions::default(),
    )
    .await
    .unwrap();

    let service = pack_metadata.messaging_service.unwrap();
    assert_eq!(service.id, "did:example:bob#didcomm-1");
    assert_eq!(service.service_endpoint, "https://example.com/bob");

    // mediator1 peels its forward layer
    let (parsed, fwd_metadata) =
        unpack_forward(&wire, &did_resolver, &mediator_secrets, &RawCrypto)
            .await
            .unwrap();
    assert_eq!(parsed.next, BOB_DID);
    assert!(fwd_metadata.anonymous_sender);

    // bob unpacks what the mediator relays
    let relayed = serde_json::to_string(&parsed.forwarded_msg).unwrap();
    let (received, metadata) = unpack(
        &relayed,
        &did_resolver,
        &bob_secrets,
        &RawCrypto,
        &UnpackOptions::default(),
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(received, msg);
    assert!(metadata.authenticated);
    assert!(!metadata.re_wrapped_in_forward);
}

#[tokio::test]
async fn service_endpoint_indirection_is_followed_one_level() {
    // Arrange: erin's service endpoint is mediator2's DID.
    let did_resolver = default_did_resolver();

    // Act
    let chain = resolve_did_comm_services_chain(ERIN_DID, None, &did_resolver)
        .await
        .unwrap()
        .unwrap();

    // Assert
    assert_eq!(chain.service_id, "did:example:erin#didcomm-1");
    assert_eq!(chain.service_endpoint, "https://example.com/mediator2");
    assert_eq!(chain.routing_keys, vec![MEDIATOR2_DID.to_string()]);
}

#[tokio::test]
async fn mediated_delivery_through_endpoint_indirection() {
    // Arrange
    let msg = sample_message().to(vec![ERIN_DID.to_string()]);
    let did_resolver = default_did_resolver();
    let alice_secrets = ExampleSecretsResolver::new(alice_secrets());
    let mediator_secrets = ExampleSecretsResolver::new(mediator2_secrets());
    let erin_secrets = ExampleSecretsResolver::new(erin_secrets());

    // Act
    let (wire, _) = pack_encrypted(
        &msg,
        ERIN_DID,
        Some(ALICE_DID),
        None,
        &did_resolver,
        &alice_secrets,
        &RawCrypto,
        &PackEncryptedOptions::default(),
    )
    .await
    .unwrap();
    let (parsed, _) = unpack_forward(&wire, &did_resolver, &mediator_secrets, &RawCrypto)
        .await
        .unwrap();
    assert_eq!(parsed.next, ERIN_DID);

    let relayed = serde_json::to_string(&parsed.forwarded_msg).unwrap();
    let (received, metadata) = unpack(
        &relayed,
        &did_resolver,
        &erin_secrets,
        &RawCrypto,
        &UnpackOptions::default(),
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(received, msg);
    assert!(metadata.authenticated);
}

#[tokio::test]
async fn re_wrapping_forward_is_unwrapped_transparently() {
    // Arrange: a mediator re-wraps bob's message into a fresh forward
    // addressed to bob's own key.
    let msg = sample_message();
    let did_resolver = default_did_resolver();
    let alice_secrets = ExampleSecretsResolver::new(alice_secrets());
    let bob_secrets = ExampleSecretsResolver::new(bob_secrets());

    let (wire, _) = pack_encrypted(
        &msg,
        BOB_DID,
        Some(ALICE_DID),
        None,
        &did_resolver,
        &alice_secrets,
        &RawCrypto,
        &PackEncryptedOptions {
            forward: false,
            ..PackEncryptedOptions::default()
        },
    )
    .await
    .unwrap();
    let re_wrapped = wrap_in_forward(
        &wire,
        None,
        BOB_DID,
        &["did:example:bob#key-x25519-1".to_string()],
        Default::default(),
        &did_resolver,
        &RawCrypto,
    )
    .await
    .unwrap();

    // Act
    let (received, metadata) = unpack(
        &re_wrapped,
        &did_resolver,
        &bob_secrets,
        &RawCrypto,
        &UnpackOptions::default(),
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(received, msg);
    assert!(metadata.re_wrapped_in_forward);
    assert!(metadata.authenticated);
}

#[tokio::test]
async fn wrapping_without_routing_keys_returns_input_unchanged() {
    // Arrange
    let did_resolver = default_did_resolver();
    let alice_secrets = ExampleSecretsResolver::new(alice_secrets());
    let (wire, _) = pack_encrypted(
        &sample_message(),
        BOB_DID,
        None,
        None,
        &did_resolver,
        &alice_secrets,
        &RawCrypto,
        &PackEncryptedOptions {
            forward: false,
            ..PackEncryptedOptions::default()
        },
    )
    .await
    .unwrap();

    // Act
    let wrapped = wrap_in_forward(
        &wire,
        None,
        BOB_DID,
        &[],
        Default::default(),
        &did_resolver,
        &RawCrypto,
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(wrapped, wire);
}

#[tokio::test]
async fn forward_skipped_when_no_service_exists() {
    // Arrange: carol has no service entry at all.
    let msg = sample_message().to(vec![CAROL_DID.to_string()]);
    let did_resolver = default_did_resolver();
    let alice_secrets = ExampleSecretsResolver::new(alice_secrets());
    let carol_secrets = ExampleSecretsResolver::new(carol_secrets());

    // Act
    let (wire, pack_metadata) = pack_encrypted(
        &msg,
        CAROL_DID,
        None,
        None,
        &did_resolver,
        &alice_secrets,
        &RawCrypto,
        &PackEncryptedOptions::default(),
    )
    .await
    .unwrap();

    // Assert: no forward layer was added, carol unpacks directly.
    assert!(pack_metadata.messaging_service.is_none());
    let (received, _) = unpack(
        &wire,
        &did_resolver,
        &carol_secrets,
        &RawCrypto,
        &UnpackOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(received, msg);
}

#[tokio::test]
async fn unknown_pinned_service_id_fails() {
    // Arrange
    let msg = sample_message();
    let did_resolver = default_did_resolver();
    let alice_secrets = ExampleSecretsResolver::new(alice_secrets());

    // Act
    let err = pack_encrypted(
        &msg,
        BOB_DID,
        None,
        None,
        &did_resolver,
        &alice_secrets,
        &RawCrypto,
        &PackEncryptedOptions {
            messaging_service: Some("did:example:bob#nonexistent".to_string()),
            ..PackEncryptedOptions::default()
        },
    )
    .await
    .unwrap_err();

    // Assert
    assert!(matches!(err, Error::InvalidDidDoc(_)));
}

#[tokio::test]
async fn forward_headers_are_carried() {
    // Arrange
    let did_resolver = default_did_resolver();
    let mediator_secrets = ExampleSecretsResolver::new(mediator1_secrets());
    let mut headers = std::collections::HashMap::new();
    headers.insert("expires_time".to_string(), json!(1516385931));

    let wire = wrap_in_forward(
        r#"{"protected":"eyJ0eXAiOiJhcHBsaWNhdGlvbi9kaWRjb21tLWVuY3J5cHRlZCtqc29uIn0"}"#,
        Some(&headers),
        BOB_DID,
        &["did:example:mediator1#key-x25519-1".to_string()],
        Default::default(),
        &did_resolver,
        &RawCrypto,
    )
    .await
    .unwrap();

    // Act
    let (parsed, _) = unpack_forward(&wire, &did_resolver, &mediator_secrets, &RawCrypto)
        .await
        .unwrap();

    // Assert
    assert_eq!(parsed.next, BOB_DID);
    assert_eq!(parsed.msg.expires_time, Some(1516385931));
}
