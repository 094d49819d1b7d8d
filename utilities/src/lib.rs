//! Shared fixtures for tests and examples: a small cast of DIDs with
//! deterministic key material, plus in-memory resolver implementations.
//!
//! Every key pair is derived from a label so the fixtures stay reproducible
//! without hardcoding both halves of each pair.

use async_trait::async_trait;
use base64_url::encode;
use didcomm_core::dids::{
    DidDocument, DidResolver, Service, VerificationMaterial, VerificationMethod,
    VerificationMethodType, DIDCOMM_V2_PROFILE,
};
use didcomm_core::secrets::{Secret, SecretsResolver};
use didcomm_core::Result;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use serde_json::json;
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};

pub const ALICE_DID: &str = "did:example:alice";
pub const BOB_DID: &str = "did:example:bob";
pub const CAROL_DID: &str = "did:example:carol";
pub const DAVE_DID: &str = "did:example:dave";
pub const ERIN_DID: &str = "did:example:erin";
pub const MEDIATOR1_DID: &str = "did:example:mediator1";
pub const MEDIATOR2_DID: &str = "did:example:mediator2";

fn seed(label: &str) -> [u8; 32] {
    let digest = Sha256::digest(label.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

fn x25519_key(kid: &str, controller: &str) -> (VerificationMethod, Secret) {
    let sk = StaticSecret::from(seed(kid));
    let pk = PublicKey::from(&sk);
    let vm = VerificationMethod {
        id: kid.to_string(),
        type_: VerificationMethodType::JsonWebKey2020,
        controller: controller.to_string(),
        verification_material: VerificationMaterial::Jwk(json!({
            "kty": "OKP",
            "crv": "X25519",
            "x": encode(pk.as_bytes()),
        })),
    };
    let secret = Secret {
        id: kid.to_string(),
        type_: VerificationMethodType::JsonWebKey2020,
        secret_material: VerificationMaterial::Jwk(json!({
            "kty": "OKP",
            "crv": "X25519",
            "x": encode(pk.as_bytes()),
            "d": encode(&sk.to_bytes()),
        })),
    };
    (vm, secret)
}

fn ed25519_key(kid: &str, controller: &str) -> (VerificationMethod, Secret) {
    let sk = ed25519_dalek::SecretKey::from_bytes(&seed(kid)).expect("seed is 32 bytes");
    let pk = ed25519_dalek::PublicKey::from(&sk);
    let vm = VerificationMethod {
        id: kid.to_string(),
        type_: VerificationMethodType::JsonWebKey2020,
        controller: controller.to_string(),
        verification_material: VerificationMaterial::Jwk(json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "x": encode(pk.as_bytes()),
        })),
    };
    let secret = Secret {
        id: kid.to_string(),
        type_: VerificationMethodType::JsonWebKey2020,
        secret_material: VerificationMaterial::Jwk(json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "x": encode(pk.as_bytes()),
            "d": encode(sk.as_bytes()),
        })),
    };
    (vm, secret)
}

fn p256_key(kid: &str, controller: &str) -> (VerificationMethod, Secret) {
    // clear the top bit so the seed is always below the curve order
    let mut scalar = seed(kid);
    scalar[0] &= 0x7f;
    let sk = p256::SecretKey::from_bytes(&scalar).expect("seed is a valid P-256 scalar");
    let point = sk.public_key().to_encoded_point(false);
    let x = encode(point.x().expect("uncompressed point has x"));
    let y = encode(point.y().expect("uncompressed point has y"));
    let vm = VerificationMethod {
        id: kid.to_string(),
        type_: VerificationMethodType::JsonWebKey2020,
        controller: controller.to_string(),
        verification_material: VerificationMaterial::Jwk(json!({
            "kty": "EC",
            "crv": "P-256",
            "x": x,
            "y": y,
        })),
    };
    let secret = Secret {
        id: kid.to_string(),
        type_: VerificationMethodType::JsonWebKey2020,
        secret_material: VerificationMaterial::Jwk(json!({
            "kty": "EC",
            "crv": "P-256",
            "x": x,
            "y": y,
            "d": encode(&scalar),
        })),
    };
    (vm, secret)
}

/// P-384 verification method without a usable secret; exists only so key
/// selection has an incompatible curve to filter out.
fn p384_stub(kid: &str, controller: &str) -> VerificationMethod {
    VerificationMethod {
        id: kid.to_string(),
        type_: VerificationMethodType::JsonWebKey2020,
        controller: controller.to_string(),
        verification_material: VerificationMaterial::Jwk(json!({
            "kty": "EC",
            "crv": "P-384",
            "x": encode(&seed(kid)),
            "y": encode(&seed(controller)),
        })),
    }
}

fn alice_keys() -> Vec<(VerificationMethod, Secret)> {
    vec![
        x25519_key("did:example:alice#key-x25519-1", ALICE_DID),
        p256_key("did:example:alice#key-p256-1", ALICE_DID),
        ed25519_key("did:example:alice#key-ed25519-1", ALICE_DID),
        p256_key("did:example:alice#key-p256-2", ALICE_DID),
    ]
}

pub fn alice_did_doc() -> DidDocument {
    DidDocument {
        did: ALICE_DID.to_string(),
        key_agreement: vec![
            "did:example:alice#key-x25519-1".to_string(),
            "did:example:alice#key-p256-1".to_string(),
        ],
        authentication: vec![
            "did:example:alice#key-ed25519-1".to_string(),
            "did:example:alice#key-p256-2".to_string(),
        ],
        verification_method: alice_keys().into_iter().map(|(vm, _)| vm).collect(),
        service: vec![],
    }
}

pub fn alice_secrets() -> Vec<Secret> {
    alice_keys().into_iter().map(|(_, secret)| secret).collect()
}

fn bob_keys() -> Vec<(VerificationMethod, Secret)> {
    vec![
        x25519_key("did:example:bob#key-x25519-1", BOB_DID),
        x25519_key("did:example:bob#key-x25519-2", BOB_DID),
        x25519_key("did:example:bob#key-x25519-3", BOB_DID),
    ]
}

pub fn bob_did_doc() -> DidDocument {
    DidDocument {
        did: BOB_DID.to_string(),
        key_agreement: vec![
            "did:example:bob#key-x25519-1".to_string(),
            "did:example:bob#key-x25519-2".to_string(),
            "did:example:bob#key-x25519-3".to_string(),
        ],
        authentication: vec![],
        verification_method: bob_keys().into_iter().map(|(vm, _)| vm).collect(),
        service: vec![Service {
            id: "did:example:bob#didcomm-1".to_string(),
            service_endpoint: "https://example.com/bob".to_string(),
            accept: vec![DIDCOMM_V2_PROFILE.to_string()],
            routing_keys: vec!["did:example:mediator1#key-x25519-1".to_string()],
        }],
    }
}

pub fn bob_secrets() -> Vec<Secret> {
    bob_keys().into_iter().map(|(_, secret)| secret).collect()
}

fn carol_keys() -> Vec<(VerificationMethod, Secret)> {
    vec![
        x25519_key("did:example:carol#key-x25519-1", CAROL_DID),
        p256_key("did:example:carol#key-p256-1", CAROL_DID),
        x25519_key("did:example:carol#key-x25519-2", CAROL_DID),
    ]
}

/// Carol mixes X25519, P-256 and P-384 key agreement keys, in that kid order,
/// to exercise curve filtering during recipient selection.
pub fn carol_did_doc() -> DidDocument {
    let mut verification_method: Vec<VerificationMethod> =
        carol_keys().into_iter().map(|(vm, _)| vm).collect();
    verification_method.push(p384_stub("did:example:carol#key-p384-1", CAROL_DID));
    DidDocument {
        did: CAROL_DID.to_string(),
        key_agreement: vec![
            "did:example:carol#key-x25519-1".to_string(),
            "did:example:carol#key-p256-1".to_string(),
            "did:example:carol#key-x25519-2".to_string(),
            "did:example:carol#key-p384-1".to_string(),
        ],
        authentication: vec![],
        verification_method,
        service: vec![],
    }
}

pub fn carol_secrets() -> Vec<Secret> {
    carol_keys().into_iter().map(|(_, secret)| secret).collect()
}

/// Dave only holds a P-256 key agreement key, so authenticated encryption
/// from Dave to an X25519-only peer cannot find a compatible pairing.
pub fn dave_did_doc() -> DidDocument {
    let (vm, _) = p256_key("did:example:dave#key-p256-1", DAVE_DID);
    DidDocument {
        did: DAVE_DID.to_string(),
        key_agreement: vec!["did:example:dave#key-p256-1".to_string()],
        authentication: vec![],
        verification_method: vec![vm],
        service: vec![],
    }
}

pub fn dave_secrets() -> Vec<Secret> {
    let (_, secret) = p256_key("did:example:dave#key-p256-1", DAVE_DID);
    vec![secret]
}

/// Erin's service endpoint is a mediator DID rather than a URI, so routing
/// must follow one level of endpoint indirection.
pub fn erin_did_doc() -> DidDocument {
    let (vm, _) = x25519_key("did:example:erin#key-x25519-1", ERIN_DID);
    DidDocument {
        did: ERIN_DID.to_string(),
        key_agreement: vec!["did:example:erin#key-x25519-1".to_string()],
        authentication: vec![],
        verification_method: vec![vm],
        service: vec![Service {
            id: "did:example:erin#didcomm-1".to_string(),
            service_endpoint: MEDIATOR2_DID.to_string(),
            accept: vec![DIDCOMM_V2_PROFILE.to_string()],
            routing_keys: vec![],
        }],
    }
}

pub fn erin_secrets() -> Vec<Secret> {
    let (_, secret) = x25519_key("did:example:erin#key-x25519-1", ERIN_DID);
    vec![secret]
}

pub fn mediator1_did_doc() -> DidDocument {
    let (vm, _) = x25519_key("did:example:mediator1#key-x25519-1", MEDIATOR1_DID);
    DidDocument {
        did: MEDIATOR1_DID.to_string(),
        key_agreement: vec!["did:example:mediator1#key-x25519-1".to_string()],
        authentication: vec![],
        verification_method: vec![vm],
        service: vec![Service {
            id: "did:example:mediator1#didcomm-1".to_string(),
            service_endpoint: "https://example.com/mediator1".to_string(),
            accept: vec![DIDCOMM_V2_PROFILE.to_string()],
            routing_keys: vec![],
        }],
    }
}

pub fn mediator1_secrets() -> Vec<Secret> {
    let (_, secret) = x25519_key("did:example:mediator1#key-x25519-1", MEDIATOR1_DID);
    vec![secret]
}

pub fn mediator2_did_doc() -> DidDocument {
    let (vm, _) = x25519_key("did:example:mediator2#key-x25519-1", MEDIATOR2_DID);
    DidDocument {
        did: MEDIATOR2_DID.to_string(),
        key_agreement: vec!["did:example:mediator2#key-x25519-1".to_string()],
        authentication: vec![],
        verification_method: vec![vm],
        service: vec![Service {
            id: "did:example:mediator2#didcomm-1".to_string(),
            service_endpoint: "https://example.com/mediator2".to_string(),
            accept: vec![DIDCOMM_V2_PROFILE.to_string()],
            routing_keys: vec![],
        }],
    }
}

pub fn mediator2_secrets() -> Vec<Secret> {
    let (_, secret) = x25519_key("did:example:mediator2#key-x25519-1", MEDIATOR2_DID);
    vec![secret]
}

/// Resolver knowing every fixture DID document.
pub fn default_did_resolver() -> ExampleDidResolver {
    ExampleDidResolver::new(vec![
        alice_did_doc(),
        bob_did_doc(),
        carol_did_doc(),
        dave_did_doc(),
        erin_did_doc(),
        mediator1_did_doc(),
        mediator2_did_doc(),
    ])
}

#[derive(Debug, Clone)]
pub struct ExampleDidResolver {
    known: Vec<DidDocument>,
}

impl ExampleDidResolver {
    pub fn new(known: Vec<DidDocument>) -> Self {
        ExampleDidResolver { known }
    }
}

#[async_trait]
impl DidResolver for ExampleDidResolver {
    async fn resolve(&self, did: &str) -> Result<Option<DidDocument>> {
        Ok(self.known.iter().find(|doc| doc.did == did).cloned())
    }
}

#[derive(Debug, Clone)]
pub struct ExampleSecretsResolver {
    known: Vec<Secret>,
}

impl ExampleSecretsResolver {
    pub fn new(known: Vec<Secret>) -> Self {
        ExampleSecretsResolver { known }
    }

    /// Drops one secret from the store, for tests that need a partial key set.
    pub fn without(mut self, kid: &str) -> Self {
        self.known.retain(|secret| secret.id != kid);
        self
    }
}

#[async_trait]
impl SecretsResolver for ExampleSecretsResolver {
    async fn get_secret(&self, kid: &str) -> Result<Option<Secret>> {
        Ok(self.known.iter().find(|secret| secret.id == kid).cloned())
    }

    async fn find_secrets(&self, kids: &[String]) -> Result<Vec<String>> {
        Ok(self
            .known
            .iter()
            .filter(|secret| kids.contains(&secret.id))
            .map(|secret| secret.id.clone())
            .collect())
    }
}
