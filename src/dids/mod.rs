mod didurl;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use didurl::*;

use crate::Result;

/// DID document as produced by a [`DidResolver`].
/// Only the verification relationships the envelope layer needs are modelled:
/// `key_agreement` for encryption and `authentication` for signing.
/// [Specification](https://www.w3.org/TR/did-core/)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DidDocument {
    pub did: String,

    /// Ordered key-agreement kid references; the first entry is the default
    /// key the document owner expects peers to select.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_agreement: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<VerificationMethod>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,
}

impl DidDocument {
    /// Looks up a verification method by its kid (DID-URL).
    pub fn verification_method(&self, kid: &str) -> Option<&VerificationMethod> {
        self.verification_method.iter().find(|vm| vm.id == kid)
    }

    /// Looks up a service entry by its id.
    pub fn service(&self, id: &str) -> Option<&Service> {
        self.service.iter().find(|s| s.id == id)
    }
}

/// Public key material bound to a kid inside a DID document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: VerificationMethodType,
    pub controller: String,
    pub verification_material: VerificationMaterial,
}

/// Closed set of supported key representations. Exhaustive matching over this
/// enum is what keeps key selection and the codec in sync.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMethodType {
    JsonWebKey2020,
    Ed25519VerificationKey2018,
    Ed25519VerificationKey2020,
    X25519KeyAgreementKey2019,
    X25519KeyAgreementKey2020,
}

/// Key material in one of the representation formats the spec admits.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "format", content = "value")]
pub enum VerificationMaterial {
    #[serde(rename = "JWK")]
    Jwk(serde_json::Value),
    #[serde(rename = "Base58")]
    Base58(String),
    #[serde(rename = "Multibase")]
    Multibase(String),
}

impl VerificationMaterial {
    /// `kty` of a JWK material, `None` for other formats.
    pub fn jwk_kty(&self) -> Option<&str> {
        match self {
            VerificationMaterial::Jwk(value) => value.get("kty").and_then(|v| v.as_str()),
            _ => None,
        }
    }

    /// `crv` of a JWK material, `None` for other formats.
    pub fn jwk_crv(&self) -> Option<&str> {
        match self {
            VerificationMaterial::Jwk(value) => value.get("crv").and_then(|v| v.as_str()),
            _ => None,
        }
    }
}

/// DIDComm service entry. The endpoint is either a plain URI or another DID,
/// the latter pointing at a mediator whose own document carries the real
/// endpoint (one level of indirection only).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Service {
    pub id: String,
    pub service_endpoint: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accept: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routing_keys: Vec<String>,
}

/// Media-type profile a service must accept to be used for DIDComm v2.
pub const DIDCOMM_V2_PROFILE: &str = "didcomm/v2";

/// DID resolution boundary. "Not found" is expressed as `Ok(None)`, an `Err`
/// means the resolver itself failed and aborts the whole pack/unpack call.
#[async_trait]
pub trait DidResolver: Sync {
    async fn resolve(&self, did: &str) -> Result<Option<DidDocument>>;
}
