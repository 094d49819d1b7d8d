use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    dids::{VerificationMaterial, VerificationMethodType},
    Result,
};

/// Private-key counterpart of a [`crate::dids::VerificationMethod`], same
/// `{kid, type, material}` shape. Created and stored outside the core; the
/// envelope layer only ever reads it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Secret {
    /// Key id (DID-URL) of the corresponding verification method.
    pub id: String,
    #[serde(rename = "type")]
    pub type_: VerificationMethodType,
    /// Private key material; for JWK format the value carries the private
    /// parameters (`d`) alongside the public ones.
    pub secret_material: VerificationMaterial,
}

/// Secrets storage boundary. `find_secrets` pre-filters candidate kids before
/// any key is actually fetched with `get_secret`.
#[async_trait]
pub trait SecretsResolver: Sync {
    /// Returns the stored secret for `kid`, `None` when this store does not
    /// hold it.
    async fn get_secret(&self, kid: &str) -> Result<Option<Secret>>;

    /// Returns the subset of `kids` this store holds, preserving the store's
    /// preference order. The order is observable: unpack tries candidate keys
    /// in exactly this order.
    async fn find_secrets(&self, kids: &[String]) -> Result<Vec<String>>;
}
