//! Forward protocol (`https://didcomm.org/routing/2.0/forward`) support:
//! service chain resolution, onion wrapping on the sender side and forward
//! parsing on the mediator side.

use std::collections::HashMap;

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::{
    crypto::{AnonCryptAlg, CryptoProvider},
    dids::{did_or_url, did_of, is_did, DidResolver, Service, DIDCOMM_V2_PROFILE},
    envelopes::Jwe,
    error::Malformed,
    keyselect::find_anoncrypt_pack_recipient_keys,
    messages::{Attachment, Message},
    secrets::SecretsResolver,
    unpack::{unpack, UnpackMetadata, UnpackOptions},
    Error, Result,
};

/// Message type of the forward protocol version this crate speaks.
pub const FORWARD_MSG_TYPE: &str = "https://didcomm.org/routing/2.0/forward";

static FORWARD_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://didcomm\.org/routing/(\d+)\.(\d+)(\.\d+)?/forward$")
        .expect("static regex is valid")
});

/// A parsed forward message together with the payload it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedForward {
    pub msg: Message,
    pub next: String,
    pub forwarded_msg: Value,
}

/// The usable transport route for a recipient DID: where to physically send
/// the message and which forward hops (outermost first) to wrap it for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceChain {
    /// Id of the recipient's own selected service entry.
    pub service_id: String,
    /// Terminal transport URI after resolving endpoint indirection.
    pub service_endpoint: String,
    pub routing_keys: Vec<String>,
}

fn accepts_didcomm_v2(service: &Service) -> bool {
    service.accept.is_empty() || service.accept.iter().any(|a| a == DIDCOMM_V2_PROFILE)
}

fn select_service<'a>(
    services: &'a [Service],
    service_id: Option<&str>,
    did: &str,
) -> Result<Option<&'a Service>> {
    match service_id {
        Some(id) => {
            let service = services
                .iter()
                .find(|s| s.id == id)
                .ok_or_else(|| Error::InvalidDidDoc(format!("service {} not found in {}", id, did)))?;
            if !accepts_didcomm_v2(service) {
                return Err(Error::InvalidDidDoc(format!(
                    "service {} does not accept {}",
                    id, DIDCOMM_V2_PROFILE
                )));
            }
            Ok(Some(service))
        }
        None => Ok(services.iter().find(|s| accepts_didcomm_v2(s))),
    }
}

/// Resolves the service chain for a recipient. `Ok(None)` means the recipient
/// advertises no usable DIDComm service, which skips forwarding rather than
/// failing the pack. A service endpoint that is itself a DID is followed one
/// level to a mediator document; deeper nesting is rejected.
pub async fn resolve_did_comm_services_chain(
    to: &str,
    service_id: Option<&str>,
    did_resolver: &dyn DidResolver,
) -> Result<Option<ServiceChain>> {
    let did = did_of(to)?;
    let doc = did_resolver
        .resolve(did)
        .await?
        .ok_or_else(|| Error::DidDocNotResolved(did.to_string()))?;

    let service = match select_service(&doc.service, service_id, did)? {
        Some(service) => service,
        None => {
            trace!("{} has no DIDComm v2 service, skipping forward", did);
            return Ok(None);
        }
    };

    if !is_did(&service.service_endpoint) {
        return Ok(Some(ServiceChain {
            service_id: service.id.clone(),
            service_endpoint: service.service_endpoint.clone(),
            routing_keys: service.routing_keys.clone(),
        }));
    }

    // Endpoint is a mediator DID: its document carries the transport URI and
    // the mediator itself becomes an extra (outer) forward hop.
    let mediator_did = service.service_endpoint.clone();
    let mediator_doc = did_resolver
        .resolve(&mediator_did)
        .await?
        .ok_or_else(|| Error::DidDocNotResolved(mediator_did.clone()))?;
    let mediator_service = select_service(&mediator_doc.service, None, &mediator_did)?
        .ok_or_else(|| {
            Error::InvalidDidDoc(format!("mediator {} has no DIDComm v2 service", mediator_did))
        })?;
    if is_did(&mediator_service.service_endpoint) {
        return Err(Error::InvalidDidDoc(format!(
            "service endpoint of mediator {} is itself a DID",
            mediator_did
        )));
    }

    let mut routing_keys = mediator_service.routing_keys.clone();
    routing_keys.push(mediator_did);
    routing_keys.extend(service.routing_keys.iter().cloned());

    Ok(Some(ServiceChain {
        service_id: service.id.clone(),
        service_endpoint: mediator_service.service_endpoint.clone(),
        routing_keys,
    }))
}

/// Onion-wraps an already packed message for a chain of forward hops.
/// `routing_keys` is ordered outermost first: the returned envelope is
/// decryptable by `routing_keys[0]`, and the innermost forward names `to` as
/// its `next`. An empty chain means there is nothing to wrap and the input
/// is returned unchanged.
pub async fn wrap_in_forward(
    msg: &str,
    headers: Option<&HashMap<String, Value>>,
    to: &str,
    routing_keys: &[String],
    enc_alg_anon: AnonCryptAlg,
    did_resolver: &dyn DidResolver,
    crypto: &dyn CryptoProvider,
) -> Result<String> {
    if routing_keys.is_empty() {
        debug!("no routing keys for {}, nothing to wrap", to);
        return Ok(msg.to_string());
    }

    let mut packed = msg.to_string();
    let mut next = to.to_string();
    for hop in routing_keys.iter().rev() {
        let attachment_json: Value = serde_json::from_str(&packed)?;
        let mut fwd = Message::with_random_id(FORWARD_MSG_TYPE, json!({ "next": next }))
            .to(vec![hop.clone()]);
        if let Some(headers) = headers {
            for (name, value) in headers {
                fwd = fwd.add_header_field(name.clone(), value.clone());
            }
        }
        fwd = fwd.attachments(vec![Attachment::json(attachment_json)]);

        let recipients = find_anoncrypt_pack_recipient_keys(hop, did_resolver).await?;
        let jwe = Jwe::build_anon(fwd.to_wire()?.as_bytes(), &recipients, enc_alg_anon, crypto)?;
        packed = serde_json::to_string(&jwe)?;
        next = hop.clone();
    }
    debug!("wrapped message in {} forward layer(s) for {}", routing_keys.len(), to);
    Ok(packed)
}

/// Checks whether a plaintext message is a forward and extracts its routing
/// fields. `Ok(None)` when the type is something else entirely; an error when
/// it looks like a forward but is unusable.
pub fn try_parse_forward(msg: &Message) -> Result<Option<ParsedForward>> {
    let captures = match FORWARD_TYPE_RE.captures(&msg.type_) {
        Some(captures) => captures,
        None => return Ok(None),
    };
    if captures.get(1).map(|m| m.as_str()) != Some("2") {
        return Err(Malformed::UnsupportedForwardProtocol.into());
    }

    let next = msg
        .body
        .get("next")
        .and_then(|v| v.as_str())
        .ok_or(Malformed::InvalidMessage)?
        .to_string();
    let attachments = msg.attachments.as_deref().unwrap_or(&[]);
    let forwarded_msg = match attachments {
        [single] => single.data.json.clone().ok_or(Malformed::InvalidMessage)?,
        _ => return Err(Malformed::InvalidMessage.into()),
    };

    Ok(Some(ParsedForward {
        msg: msg.clone(),
        next,
        forwarded_msg,
    }))
}

/// Mediator-side entry point: decrypts one forward layer and hands back the
/// still-packed payload to relay towards `next`.
pub async fn unpack_forward(
    msg: &str,
    did_resolver: &dyn DidResolver,
    secrets_resolver: &dyn SecretsResolver,
    crypto: &dyn CryptoProvider,
) -> Result<(ParsedForward, UnpackMetadata)> {
    let options = UnpackOptions {
        unwrap_re_wrapping_forward: false,
        ..UnpackOptions::default()
    };
    let (msg, metadata) = unpack(msg, did_resolver, secrets_resolver, crypto, &options).await?;
    let parsed = try_parse_forward(&msg)?.ok_or(Malformed::InvalidMessage)?;
    Ok((parsed, metadata))
}

/// True when the unpacking party holds at least one secret usable to decrypt
/// a message addressed to `next` (a DID or a kid). Used to decide whether a
/// re-wrapping forward is "for us" and may be unwrapped transparently.
pub(crate) async fn has_keys_for_forward_next(
    next: &str,
    did_resolver: &dyn DidResolver,
    secrets_resolver: &dyn SecretsResolver,
) -> Result<bool> {
    let kids = match did_or_url(next) {
        Some((_, Some(_))) => vec![next.to_string()],
        Some((did, None)) => match did_resolver.resolve(did).await? {
            Some(doc) => doc.key_agreement.clone(),
            None => return Ok(false),
        },
        None => return Ok(false),
    };
    Ok(!secrets_resolver.find_secrets(&kids).await?.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn forward_msg(type_: &str) -> Message {
        Message::new("87", type_, json!({"next": "did:example:bob"}))
            .attachments(vec![Attachment::json(json!({"protected": "..."}))])
    }

    #[test]
    fn forward_minor_versions_are_accepted() {
        for type_ in [
            "https://didcomm.org/routing/2.0/forward",
            "https://didcomm.org/routing/2.5/forward",
        ] {
            let parsed = try_parse_forward(&forward_msg(type_)).unwrap().unwrap();
            assert_eq!(parsed.next, "did:example:bob");
        }
    }

    #[test]
    fn forward_major_version_mismatch_is_rejected() {
        let err = try_parse_forward(&forward_msg("https://didcomm.org/routing/3.0/forward"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Malformed(Malformed::UnsupportedForwardProtocol)
        ));
    }

    #[test]
    fn non_forward_type_is_ignored() {
        let msg = Message::new("1", "https://didcomm.org/trust-ping/2.0/ping", json!({}));
        assert!(try_parse_forward(&msg).unwrap().is_none());
    }

    #[test]
    fn forward_without_attachment_is_malformed() {
        let msg = Message::new("1", FORWARD_MSG_TYPE, json!({"next": "did:example:bob"}));
        let err = try_parse_forward(&msg).unwrap_err();
        assert!(matches!(err, Error::Malformed(Malformed::InvalidMessage)));
    }
}
