//! Key selection for pack and unpack.
//!
//! All lookups run through the two resolver collaborators and apply one shared
//! compatibility predicate: two keys pair up iff their verification method
//! `type` matches, their material format matches and, for JWK material, both
//! `kty` and `crv` match. That predicate is the single tie-break rule deciding
//! multi-recipient filtering and sender key selection.

use log::trace;

use crate::{
    dids::{did_or_url, DidDocument, DidResolver, VerificationMaterial, VerificationMethod},
    secrets::{Secret, SecretsResolver},
    Error, Result,
};

/// Which verification relationship list of a DID document a kid must appear in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    KeyAgreement,
    Authentication,
}

fn relationship<'a>(doc: &'a DidDocument, purpose: KeyPurpose) -> &'a [String] {
    match purpose {
        KeyPurpose::KeyAgreement => &doc.key_agreement,
        KeyPurpose::Authentication => &doc.authentication,
    }
}

fn material_format(material: &VerificationMaterial) -> &'static str {
    match material {
        VerificationMaterial::Jwk(_) => "JWK",
        VerificationMaterial::Base58(_) => "Base58",
        VerificationMaterial::Multibase(_) => "Multibase",
    }
}

/// The compatibility predicate; see module docs.
pub(crate) fn compatible_key_pair(
    a: (&crate::dids::VerificationMethodType, &VerificationMaterial),
    b: (&crate::dids::VerificationMethodType, &VerificationMaterial),
) -> bool {
    if a.0 != b.0 || material_format(a.1) != material_format(b.1) {
        return false;
    }
    match (a.1, b.1) {
        (VerificationMaterial::Jwk(_), VerificationMaterial::Jwk(_)) => {
            a.1.jwk_kty() == b.1.jwk_kty() && a.1.jwk_crv() == b.1.jwk_crv()
        }
        _ => true,
    }
}

async fn resolve_doc(did: &str, did_resolver: &dyn DidResolver) -> Result<DidDocument> {
    did_resolver
        .resolve(did)
        .await?
        .ok_or_else(|| Error::DidDocNotResolved(did.to_string()))
}

/// Verification method referenced by a relationship list entry. A kid listed
/// in a relationship but missing from the document breaks the document's own
/// invariant.
fn relationship_vm<'a>(
    doc: &'a DidDocument,
    kid: &str,
    purpose: KeyPurpose,
) -> Result<&'a VerificationMethod> {
    if !relationship(doc, purpose).iter().any(|k| k == kid) {
        return Err(Error::DidUrlNotFound(kid.to_string()));
    }
    doc.verification_method(kid)
        .ok_or_else(|| Error::InvalidDidDoc(format!("kid {} has no verification method", kid)))
}

/// Recipient keys for anonymous encryption. A bare DID selects every
/// key-agreement key compatible with the document's first listed one; a
/// DID-URL selects exactly that key.
pub async fn find_anoncrypt_pack_recipient_keys(
    to: &str,
    did_resolver: &dyn DidResolver,
) -> Result<Vec<VerificationMethod>> {
    let (did, fragment) = did_or_url(to)
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' is not a DID or DID-URL", to)))?;
    let doc = resolve_doc(did, did_resolver).await?;

    if fragment.is_some() {
        return Ok(vec![relationship_vm(&doc, to, KeyPurpose::KeyAgreement)?.clone()]);
    }

    let first_kid = doc
        .key_agreement
        .first()
        .ok_or_else(|| Error::DidUrlNotFound(format!("no key agreement keys in {}", did)))?;
    let reference = relationship_vm(&doc, first_kid, KeyPurpose::KeyAgreement)?.clone();

    let mut selected = vec![];
    for kid in &doc.key_agreement {
        let vm = relationship_vm(&doc, kid, KeyPurpose::KeyAgreement)?;
        if compatible_key_pair(
            (&reference.type_, &reference.verification_material),
            (&vm.type_, &vm.verification_material),
        ) {
            selected.push(vm.clone());
        }
    }
    trace!(
        "selected {} of {} key agreement keys for {}",
        selected.len(),
        doc.key_agreement.len(),
        to
    );
    Ok(selected)
}

/// All key-agreement verification methods a pack target may be encrypted to,
/// before any sender-compatibility filtering.
async fn key_agreement_candidates(
    target: &str,
    did_resolver: &dyn DidResolver,
) -> Result<Vec<VerificationMethod>> {
    let (did, fragment) = did_or_url(target)
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' is not a DID or DID-URL", target)))?;
    let doc = resolve_doc(did, did_resolver).await?;
    if fragment.is_some() {
        return Ok(vec![relationship_vm(&doc, target, KeyPurpose::KeyAgreement)?.clone()]);
    }
    doc.key_agreement
        .iter()
        .map(|kid| relationship_vm(&doc, kid, KeyPurpose::KeyAgreement).map(Clone::clone))
        .collect()
}

/// Sender secret and the compatible recipient key subset for authenticated
/// encryption. Sender kids are tried in document order; the first one with a
/// stored secret that pairs with at least one recipient key wins.
pub async fn find_authcrypt_pack_sender_and_recipient_keys(
    frm: &str,
    to: &str,
    did_resolver: &dyn DidResolver,
    secrets_resolver: &dyn SecretsResolver,
) -> Result<(Secret, Vec<VerificationMethod>)> {
    let (sender_did, sender_fragment) = did_or_url(frm)
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' is not a DID or DID-URL", frm)))?;
    let sender_doc = resolve_doc(sender_did, did_resolver).await?;
    let sender_kids: Vec<String> = if sender_fragment.is_some() {
        // validate membership before the secret lookup
        relationship_vm(&sender_doc, frm, KeyPurpose::KeyAgreement)?;
        vec![frm.to_string()]
    } else {
        sender_doc.key_agreement.clone()
    };
    if sender_kids.is_empty() {
        return Err(Error::DidUrlNotFound(format!(
            "no key agreement keys in {}",
            sender_did
        )));
    }

    let recipients = key_agreement_candidates(to, did_resolver).await?;

    let mut found_any_secret = false;
    for kid in &sender_kids {
        let secret = match secrets_resolver.get_secret(kid).await? {
            Some(secret) => secret,
            None => continue,
        };
        found_any_secret = true;
        let compatible: Vec<VerificationMethod> = recipients
            .iter()
            .filter(|vm| {
                compatible_key_pair(
                    (&secret.type_, &secret.secret_material),
                    (&vm.type_, &vm.verification_material),
                )
            })
            .cloned()
            .collect();
        if !compatible.is_empty() {
            trace!("authcrypt sender key {} pairs with {} recipient keys", kid, compatible.len());
            return Ok((secret, compatible));
        }
    }

    if found_any_secret {
        Err(Error::IncompatibleCrypto)
    } else {
        Err(Error::SecretNotFound(frm.to_string()))
    }
}

/// Stored secrets for the given candidate kids, in the secrets resolver's
/// preference order. The result is consumed once per unpack attempt.
pub async fn find_unpack_recipient_secrets(
    kids: &[String],
    secrets_resolver: &dyn SecretsResolver,
) -> Result<Vec<Secret>> {
    let held = secrets_resolver.find_secrets(kids).await?;
    if held.is_empty() {
        return Err(Error::DidUrlNotFound(format!(
            "none of the recipient kids {:?} is held by this secrets resolver",
            kids
        )));
    }
    let mut secrets = Vec::with_capacity(held.len());
    for kid in &held {
        // a kid the resolver claims to hold must be fetchable
        let secret = secrets_resolver
            .get_secret(kid)
            .await?
            .ok_or_else(|| Error::SecretNotFound(kid.to_string()))?;
        secrets.push(secret);
    }
    Ok(secrets)
}

/// Signing secret for a pack target. A bare DID selects the first
/// authentication kid that has a stored secret, not the first kid overall.
pub async fn find_pack_signing_secret(
    sign_by: &str,
    did_resolver: &dyn DidResolver,
    secrets_resolver: &dyn SecretsResolver,
) -> Result<Secret> {
    let (did, fragment) = did_or_url(sign_by)
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' is not a DID or DID-URL", sign_by)))?;
    let doc = resolve_doc(did, did_resolver).await?;
    let kids: Vec<String> = if fragment.is_some() {
        relationship_vm(&doc, sign_by, KeyPurpose::Authentication)?;
        vec![sign_by.to_string()]
    } else {
        doc.authentication.clone()
    };
    if kids.is_empty() {
        return Err(Error::DidUrlNotFound(format!(
            "no authentication keys in {}",
            did
        )));
    }
    for kid in &kids {
        if let Some(secret) = secrets_resolver.get_secret(kid).await? {
            return Ok(secret);
        }
    }
    Err(Error::SecretNotFound(sign_by.to_string()))
}

/// Verification method for a received envelope's kid, checked against the
/// relationship list matching its purpose.
pub async fn find_verification_method(
    kid: &str,
    purpose: KeyPurpose,
    did_resolver: &dyn DidResolver,
) -> Result<VerificationMethod> {
    let (did, fragment) = did_or_url(kid)
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' is not a DID-URL", kid)))?;
    if fragment.is_none() {
        return Err(Error::InvalidArgument(format!(
            "'{}' is not a DID-URL",
            kid
        )));
    }
    let doc = resolve_doc(did, did_resolver).await?;
    relationship_vm(&doc, kid, purpose).map(Clone::clone)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::dids::VerificationMethodType;

    use super::*;

    fn jwk_material(kty: &str, crv: &str) -> VerificationMaterial {
        VerificationMaterial::Jwk(json!({"kty": kty, "crv": crv, "x": "stub"}))
    }

    #[test]
    fn jwk_compatibility_requires_matching_curve() {
        let x25519 = jwk_material("OKP", "X25519");
        let p256 = jwk_material("EC", "P-256");
        let type_ = VerificationMethodType::JsonWebKey2020;
        assert!(compatible_key_pair((&type_, &x25519), (&type_, &x25519)));
        assert!(!compatible_key_pair((&type_, &x25519), (&type_, &p256)));
    }

    #[test]
    fn format_mismatch_is_incompatible() {
        let jwk = jwk_material("OKP", "X25519");
        let base58 = VerificationMaterial::Base58("stub".into());
        let type_ = VerificationMethodType::JsonWebKey2020;
        assert!(!compatible_key_pair((&type_, &jwk), (&type_, &base58)));
    }

    #[test]
    fn non_jwk_formats_compare_by_type_and_format_only() {
        let a = VerificationMaterial::Base58("one".into());
        let b = VerificationMaterial::Base58("two".into());
        let type_ = VerificationMethodType::X25519KeyAgreementKey2019;
        assert!(compatible_key_pair((&type_, &a), (&type_, &b)));
    }
}
