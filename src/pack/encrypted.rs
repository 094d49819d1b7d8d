use std::collections::HashMap;

use log::debug;
use serde_json::Value;

use crate::{
    crypto::{AnonCryptAlg, AuthCryptAlg, CryptoProvider},
    dids::DidResolver,
    envelopes::Jwe,
    keyselect::{find_anoncrypt_pack_recipient_keys, find_authcrypt_pack_sender_and_recipient_keys},
    messages::Message,
    routing::{resolve_did_comm_services_chain, wrap_in_forward},
    secrets::SecretsResolver,
    Result,
};

/// Knobs for [`pack_encrypted`]. The defaults produce an authenticated (when
/// `from` is given) envelope with forward wrapping enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct PackEncryptedOptions {
    /// Hide the sender kid behind an extra anonymous layer.
    pub protect_sender: bool,
    /// Wrap for the recipient's routing keys when its DID document advertises
    /// a usable DIDComm service.
    pub forward: bool,
    /// Extra headers to set on generated forward messages.
    pub forward_headers: Option<HashMap<String, Value>>,
    /// Pin a specific service entry of the recipient document by id instead of
    /// taking the first one accepting DIDComm v2.
    pub messaging_service: Option<String>,
    pub enc_alg_auth: AuthCryptAlg,
    pub enc_alg_anon: AnonCryptAlg,
}

impl Default for PackEncryptedOptions {
    fn default() -> Self {
        PackEncryptedOptions {
            protect_sender: false,
            forward: true,
            forward_headers: None,
            messaging_service: None,
            enc_alg_auth: AuthCryptAlg::default(),
            enc_alg_anon: AnonCryptAlg::default(),
        }
    }
}

/// Where the packed message should be physically delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingServiceMetadata {
    pub id: String,
    pub service_endpoint: String,
}

/// Result details of [`pack_encrypted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackEncryptedMetadata {
    pub messaging_service: Option<MessagingServiceMetadata>,
    /// Sender kid actually used for authenticated encryption.
    pub from_kid: Option<String>,
    pub sign_by_kid: Option<String>,
    pub from_prior_issuer_kid: Option<String>,
    /// Recipient kids the innermost encryption layer is addressed to.
    pub to_kids: Vec<String>,
}

/// Packs a message for confidential delivery to `to`. With `from` the
/// envelope is authenticated (ECDH-1PU), without it anonymous (ECDH-ES);
/// `sign_by` adds an inner non-repudiable signature. Both `from` and
/// `sign_by` accept a bare DID or an exact kid, as does `to`.
#[allow(clippy::too_many_arguments)]
pub async fn pack_encrypted(
    msg: &Message,
    to: &str,
    from: Option<&str>,
    sign_by: Option<&str>,
    did_resolver: &dyn DidResolver,
    secrets_resolver: &dyn SecretsResolver,
    crypto: &dyn CryptoProvider,
    options: &PackEncryptedOptions,
) -> Result<(String, PackEncryptedMetadata)> {
    super::validate_pack_message(msg, Some(to), from)?;
    if let Some(sign_by) = sign_by {
        crate::dids::ensure_did_or_url(sign_by)?;
    }
    let from_prior_issuer_kid = super::from_prior_issuer_kid(msg)?;

    // Innermost layer: either the bare plaintext or a signature envelope.
    let (payload, sign_by_kid) = match sign_by {
        Some(sign_by) => {
            let (signed, metadata) =
                super::pack_signed(msg, sign_by, did_resolver, secrets_resolver, crypto).await?;
            (signed, Some(metadata.sign_by_kid))
        }
        None => (msg.to_wire()?, None),
    };

    let (mut packed, from_kid, to_kids) = match from {
        Some(from) => {
            let (sender, recipients) = find_authcrypt_pack_sender_and_recipient_keys(
                from,
                to,
                did_resolver,
                secrets_resolver,
            )
            .await?;
            let to_kids: Vec<String> = recipients.iter().map(|vm| vm.id.clone()).collect();
            let jwe = Jwe::build_auth(
                payload.as_bytes(),
                &sender,
                &recipients,
                options.enc_alg_auth,
                crypto,
            )?;
            let mut packed = serde_json::to_string(&jwe)?;
            if options.protect_sender {
                // Same recipient set again, so only they can peel the outer
                // layer and learn who authenticated the inner one.
                let outer = Jwe::build_anon(
                    packed.as_bytes(),
                    &recipients,
                    options.enc_alg_anon,
                    crypto,
                )?;
                packed = serde_json::to_string(&outer)?;
            }
            (packed, Some(sender.id), to_kids)
        }
        None => {
            let recipients = find_anoncrypt_pack_recipient_keys(to, did_resolver).await?;
            let to_kids: Vec<String> = recipients.iter().map(|vm| vm.id.clone()).collect();
            let jwe = Jwe::build_anon(
                payload.as_bytes(),
                &recipients,
                options.enc_alg_anon,
                crypto,
            )?;
            (serde_json::to_string(&jwe)?, None, to_kids)
        }
    };

    let mut messaging_service = None;
    if options.forward {
        if let Some(chain) = resolve_did_comm_services_chain(
            to,
            options.messaging_service.as_deref(),
            did_resolver,
        )
        .await?
        {
            if !chain.routing_keys.is_empty() {
                packed = wrap_in_forward(
                    &packed,
                    options.forward_headers.as_ref(),
                    to,
                    &chain.routing_keys,
                    options.enc_alg_anon,
                    did_resolver,
                    crypto,
                )
                .await?;
            }
            messaging_service = Some(MessagingServiceMetadata {
                id: chain.service_id,
                service_endpoint: chain.service_endpoint,
            });
        }
    }

    debug!(
        "packed encrypted message {} for {} kid(s), authenticated: {}",
        msg.id,
        to_kids.len(),
        from_kid.is_some()
    );
    Ok((
        packed,
        PackEncryptedMetadata {
            messaging_service,
            from_kid,
            sign_by_kid,
            from_prior_issuer_kid,
            to_kids,
        },
    ))
}
