use base64_url::{decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    crypto::{AnonCryptAlg, AuthCryptAlg, CryptoProvider, JweDecryptParams, JweEncryptParams, KeyWrapAlg},
    dids::{did_or_url, VerificationMethod},
    messages::MessageTyp,
    secrets::Secret,
    Error, Malformed, Result,
};

/// JWE protected header as used by DIDComm encrypted envelopes.
/// `epk` is filled in by the crypto provider right before serialization so the
/// authenticated wire bytes include it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProtectedHeader {
    pub typ: MessageTyp,
    pub alg: String,
    pub enc: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub apu: Option<String>,

    pub apv: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub epk: Option<serde_json::Value>,
}

impl ProtectedHeader {
    /// Decodes the base64url wire form. Any structural problem is a
    /// received-input error, not a caller error.
    pub fn from_b64(protected_b64: &str) -> Result<Self> {
        let raw = decode(protected_b64).map_err(|_| Malformed::InvalidMessage)?;
        serde_json::from_slice(&raw).map_err(|_| Malformed::InvalidMessage.into())
    }
}

/// Per-recipient JWE data: the recipient's kid and its wrapped content key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Recipient {
    pub header: RecipientHeader,
    pub encrypted_key: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecipientHeader {
    pub kid: String,
}

/// JWE in general JSON serialization as specified by
/// [RFC 7516](https://tools.ietf.org/html/rfc7516#section-7.2.1).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Jwe {
    pub protected: String,
    pub recipients: Vec<Recipient>,
    pub ciphertext: String,
    pub iv: String,
    pub tag: String,
}

/// `apv` binding value: base64url(SHA-256(sorted kids joined by `.`)).
/// Sorting is mandatory so that the same recipient set yields the same `apv`
/// in every implementation regardless of iteration order.
pub fn compute_apv(kids: &[String]) -> String {
    let mut sorted = kids.to_vec();
    sorted.sort();
    let mut hasher = Sha256::new();
    hasher.update(sorted.join(".").as_bytes());
    encode(&hasher.finalize())
}

/// `apu` binding value for authenticated encryption: base64url(sender kid).
pub fn compute_apu(sender_kid: &str) -> String {
    encode(sender_kid.as_bytes())
}

impl Jwe {
    /// Builds an anonymous (ECDH-ES) envelope addressed to `recipients`.
    pub fn build_anon(
        plaintext: &[u8],
        recipients: &[VerificationMethod],
        alg: AnonCryptAlg,
        crypto: &dyn CryptoProvider,
    ) -> Result<Jwe> {
        let kids: Vec<String> = recipients.iter().map(|vm| vm.id.clone()).collect();
        let protected = ProtectedHeader {
            typ: MessageTyp::Encrypted,
            alg: alg.alg().to_string(),
            enc: alg.enc().as_str().to_string(),
            skid: None,
            apu: None,
            apv: compute_apv(&kids),
            epk: None,
        };
        let parts = crypto.jwe_encrypt(JweEncryptParams {
            plaintext,
            protected: &protected,
            key_wrap: KeyWrapAlg::EcdhEsA256kw,
            enc: alg.enc(),
            sender: None,
            recipients: recipients.iter().map(|vm| (vm.id.as_str(), vm)).collect(),
        })?;
        Ok(Jwe::assemble(parts))
    }

    /// Builds an authenticated (ECDH-1PU) envelope carrying the sender kid in
    /// `skid`/`apu`.
    pub fn build_auth(
        plaintext: &[u8],
        sender: &Secret,
        recipients: &[VerificationMethod],
        alg: AuthCryptAlg,
        crypto: &dyn CryptoProvider,
    ) -> Result<Jwe> {
        let kids: Vec<String> = recipients.iter().map(|vm| vm.id.clone()).collect();
        let protected = ProtectedHeader {
            typ: MessageTyp::Encrypted,
            alg: alg.alg().to_string(),
            enc: alg.enc().as_str().to_string(),
            skid: Some(sender.id.clone()),
            apu: Some(compute_apu(&sender.id)),
            apv: compute_apv(&kids),
            epk: None,
        };
        let parts = crypto.jwe_encrypt(JweEncryptParams {
            plaintext,
            protected: &protected,
            key_wrap: KeyWrapAlg::Ecdh1puA256kw,
            enc: alg.enc(),
            sender: Some(sender),
            recipients: recipients.iter().map(|vm| (vm.id.as_str(), vm)).collect(),
        })?;
        Ok(Jwe::assemble(parts))
    }

    fn assemble(parts: crate::crypto::JweParts) -> Jwe {
        Jwe {
            protected: parts.protected_b64,
            recipients: parts
                .encrypted_keys
                .into_iter()
                .map(|(kid, encrypted_key)| Recipient {
                    header: RecipientHeader { kid },
                    encrypted_key,
                })
                .collect(),
            ciphertext: parts.ciphertext_b64,
            iv: parts.iv_b64,
            tag: parts.tag_b64,
        }
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Jwe> {
        serde_json::from_value(value.clone()).map_err(|_| Malformed::InvalidMessage.into())
    }

    pub fn recipient_kids(&self) -> Vec<String> {
        self.recipients
            .iter()
            .map(|r| r.header.kid.clone())
            .collect()
    }

    /// Parses and validates the protected header of an anonymous envelope:
    /// non-empty recipient list and an `apv` that matches the recipient kids.
    /// `skid`/`apu` must be absent, otherwise the envelope is not anonymous.
    pub fn parse_and_validate_anon(&self) -> Result<ProtectedHeader> {
        let protected = self.validate_common(KeyWrapAlg::EcdhEsA256kw)?;
        if protected.skid.is_some() || protected.apu.is_some() {
            return Err(Malformed::InvalidMessage.into());
        }
        Ok(protected)
    }

    /// Parses and validates the protected header of an authenticated envelope.
    /// Requires `apu` decoding to a valid DID-URL and, when `skid` is present,
    /// exact equality with the decoded `apu`.
    pub fn parse_and_validate_auth(&self) -> Result<ProtectedHeader> {
        let protected = self.validate_common(KeyWrapAlg::Ecdh1puA256kw)?;
        let apu = protected
            .apu
            .as_ref()
            .ok_or(Malformed::InvalidMessage)?;
        let sender_kid = String::from_utf8(
            decode(apu).map_err(|_| Malformed::InvalidMessage)?,
        )
        .map_err(|_| Malformed::InvalidMessage)?;
        match did_or_url(&sender_kid) {
            Some((_, Some(_))) => {}
            _ => return Err(Malformed::InvalidMessage.into()),
        }
        if let Some(skid) = &protected.skid {
            if *skid != sender_kid {
                return Err(Malformed::InvalidMessage.into());
            }
        }
        Ok(protected)
    }

    fn validate_common(&self, expected_alg: KeyWrapAlg) -> Result<ProtectedHeader> {
        if self.recipients.is_empty() {
            return Err(Malformed::InvalidMessage.into());
        }
        if self.recipients.iter().any(|r| r.header.kid.is_empty()) {
            return Err(Malformed::InvalidMessage.into());
        }
        let protected = ProtectedHeader::from_b64(&self.protected)?;
        if KeyWrapAlg::from_str(&protected.alg)
            .map_err(|_| Malformed::InvalidMessage)?
            != expected_alg
        {
            return Err(Malformed::InvalidMessage.into());
        }
        let expected_apv = compute_apv(&self.recipient_kids());
        if protected.apv != expected_apv {
            return Err(Malformed::InvalidMessage.into());
        }
        Ok(protected)
    }

    /// Single-key decryption attempt. Provider failures surface as the opaque
    /// [`Malformed::CanNotDecrypt`]; the caller decides whether to try the
    /// next candidate key or abort.
    pub fn decrypt(
        &self,
        secret: &Secret,
        sender: Option<&VerificationMethod>,
        crypto: &dyn CryptoProvider,
    ) -> Result<Vec<u8>> {
        let recipient = self
            .recipients
            .iter()
            .find(|r| r.header.kid == secret.id)
            .ok_or(Malformed::CanNotDecrypt)?;
        crypto
            .jwe_decrypt(JweDecryptParams {
                protected_b64: &self.protected,
                iv_b64: &self.iv,
                ciphertext_b64: &self.ciphertext,
                tag_b64: &self.tag,
                encrypted_key_b64: &recipient.encrypted_key,
                recipient: secret,
                sender,
            })
            .map_err(|err| {
                log::debug!("decrypt attempt failed: {}", err);
                Error::Malformed(Malformed::CanNotDecrypt)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apv_is_order_independent() {
        // Arrange
        let forward = vec![
            "did:example:bob#key-x25519-1".to_string(),
            "did:example:bob#key-x25519-2".to_string(),
        ];
        let reverse: Vec<String> = forward.iter().rev().cloned().collect();
        // Act + Assert
        assert_eq!(compute_apv(&forward), compute_apv(&reverse));
    }

    #[test]
    fn apv_differs_for_different_sets() {
        let one = vec!["did:example:bob#key-x25519-1".to_string()];
        let two = vec!["did:example:bob#key-x25519-2".to_string()];
        assert_ne!(compute_apv(&one), compute_apv(&two));
    }

    #[test]
    fn apu_round_trips_the_kid() {
        let kid = "did:example:alice#key-x25519-1";
        let apu = compute_apu(kid);
        assert_eq!(decode(&apu).unwrap(), kid.as_bytes());
    }
}
