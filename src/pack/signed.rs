use log::debug;

use crate::{
    crypto::CryptoProvider,
    dids::DidResolver,
    envelopes::Jws,
    keyselect::find_pack_signing_secret,
    messages::Message,
    secrets::SecretsResolver,
    Result,
};

/// Result details of [`pack_signed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSignedMetadata {
    /// The exact kid whose secret produced the signature.
    pub sign_by_kid: String,
    pub from_prior_issuer_kid: Option<String>,
}

/// Wraps a message in a non-repudiable signature envelope. `sign_by` may be a
/// bare DID (first authentication key with a stored secret is used) or a
/// DID-URL naming one key.
pub async fn pack_signed(
    msg: &Message,
    sign_by: &str,
    did_resolver: &dyn DidResolver,
    secrets_resolver: &dyn SecretsResolver,
    crypto: &dyn CryptoProvider,
) -> Result<(String, PackSignedMetadata)> {
    super::validate_pack_message(msg, None, None)?;
    let from_prior_issuer_kid = super::from_prior_issuer_kid(msg)?;

    let secret = find_pack_signing_secret(sign_by, did_resolver, secrets_resolver).await?;
    let payload = msg.to_wire()?;
    let jws = Jws::build(payload.as_bytes(), &secret, crypto)?;
    let wire = serde_json::to_string(&jws)?;
    debug!("packed signed message {} with kid {}", msg.id, secret.id);

    Ok((
        wire,
        PackSignedMetadata {
            sign_by_kid: secret.id,
            from_prior_issuer_kid,
        },
    ))
}
