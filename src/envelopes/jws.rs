use base64_url::{decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    crypto::{CryptoProvider, SignAlg},
    dids::{VerificationMaterial, VerificationMethod, VerificationMethodType},
    messages::MessageTyp,
    secrets::Secret,
    Error, Malformed, Result,
};

/// JWS protected header for signed envelopes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JwsProtected {
    pub typ: MessageTyp,
    pub alg: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SignatureHeader {
    pub kid: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SignatureEntry {
    pub protected: String,
    pub header: SignatureHeader,
    pub signature: String,
}

/// JWS in general JSON serialization as specified by
/// [RFC 7515](https://tools.ietf.org/html/rfc7515#section-7.2.1).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Jws {
    pub payload: String,
    pub signatures: Vec<SignatureEntry>,
}

/// Derives the JWS algorithm from the key representation. This is the only
/// place `type`/`kty`/`crv` map onto signature algorithms.
pub fn sign_alg_for_key(
    type_: VerificationMethodType,
    material: &VerificationMaterial,
) -> Result<SignAlg> {
    match type_ {
        VerificationMethodType::Ed25519VerificationKey2018
        | VerificationMethodType::Ed25519VerificationKey2020 => Ok(SignAlg::EdDsa),
        VerificationMethodType::JsonWebKey2020 => {
            match (material.jwk_kty(), material.jwk_crv()) {
                (Some("OKP"), Some("Ed25519")) => Ok(SignAlg::EdDsa),
                (Some("EC"), Some("P-256")) => Ok(SignAlg::Es256),
                (Some("EC"), Some("secp256k1")) => Ok(SignAlg::Es256k),
                (kty, crv) => Err(Error::Unsupported(format!(
                    "signing with JWK kty {:?} crv {:?}",
                    kty, crv
                ))),
            }
        }
        VerificationMethodType::X25519KeyAgreementKey2019
        | VerificationMethodType::X25519KeyAgreementKey2020 => Err(Error::Unsupported(
            "X25519 keys cannot sign".to_string(),
        )),
    }
}

impl Jws {
    /// Builds a single-signature envelope over `payload`. The protected header
    /// carries `typ` and the derived `alg`; the signer kid travels in the
    /// unprotected per-signature header.
    pub fn build(payload: &[u8], signer: &Secret, crypto: &dyn CryptoProvider) -> Result<Jws> {
        let alg = sign_alg_for_key(signer.type_, &signer.secret_material)?;
        let protected = JwsProtected {
            typ: MessageTyp::Signed,
            alg: alg.as_str().to_string(),
        };
        let protected_b64 = encode(&serde_json::to_vec(&protected)?);
        let payload_b64 = encode(payload);
        let input = signing_input(&protected_b64, &payload_b64);
        let signature = crypto.jws_sign(input.as_bytes(), alg, signer)?;
        Ok(Jws {
            payload: payload_b64,
            signatures: vec![SignatureEntry {
                protected: protected_b64,
                header: SignatureHeader {
                    kid: signer.id.clone(),
                },
                signature: encode(&signature),
            }],
        })
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Jws> {
        let jws: Jws = serde_json::from_value(value.clone())
            .map_err(|_| Malformed::InvalidMessage)?;
        if jws.signatures.is_empty() {
            return Err(Malformed::InvalidMessage.into());
        }
        Ok(jws)
    }

    /// Kid of the first signature; the signer is identified by the envelope,
    /// never guessed by the receiver.
    pub fn signer_kid(&self) -> &str {
        &self.signatures[0].header.kid
    }

    /// Algorithm of the first signature.
    pub fn sign_alg(&self) -> Result<SignAlg> {
        let protected: JwsProtected =
            serde_json::from_slice(
                &decode(&self.signatures[0].protected).map_err(|_| Malformed::InvalidMessage)?,
            )
            .map_err(|_| Malformed::InvalidMessage)?;
        SignAlg::from_str(&protected.alg).map_err(|_| Malformed::InvalidMessage.into())
    }

    /// Verifies the first signature with `key` and returns the decoded
    /// payload. A bad signature is [`Malformed::InvalidSignature`].
    pub fn verify(&self, key: &VerificationMethod, crypto: &dyn CryptoProvider) -> Result<Vec<u8>> {
        let entry = &self.signatures[0];
        let alg = self.sign_alg()?;
        let input = signing_input(&entry.protected, &self.payload);
        let signature = decode(&entry.signature).map_err(|_| Malformed::InvalidSignature)?;
        let valid = crypto
            .jws_verify(input.as_bytes(), &signature, alg, key)
            .map_err(|err| {
                log::debug!("signature verification failed: {}", err);
                Error::Malformed(Malformed::InvalidSignature)
            })?;
        if !valid {
            return Err(Malformed::InvalidSignature.into());
        }
        decode(&self.payload).map_err(|_| Malformed::InvalidMessage.into())
    }
}

fn signing_input(protected_b64: &str, payload_b64: &str) -> String {
    format!("{}.{}", protected_b64, payload_b64)
}

/// Compact JWS (`protected.payload.signature`), used for `from_prior` JWTs.
pub fn build_compact(
    protected: &serde_json::Value,
    payload: &[u8],
    signer: &Secret,
    alg: SignAlg,
    crypto: &dyn CryptoProvider,
) -> Result<String> {
    let protected_b64 = encode(&serde_json::to_vec(protected)?);
    let payload_b64 = encode(payload);
    let input = signing_input(&protected_b64, &payload_b64);
    let signature = crypto.jws_sign(input.as_bytes(), alg, signer)?;
    Ok(format!("{}.{}", input, encode(&signature)))
}

/// Splits a compact JWS into `(protected, payload, signature, signing input)`.
pub fn parse_compact(jws: &str) -> Result<(serde_json::Value, Vec<u8>, Vec<u8>, String)> {
    let segments: Vec<&str> = jws.split('.').collect();
    if segments.len() != 3 {
        return Err(Malformed::InvalidMessage.into());
    }
    let protected: serde_json::Value =
        serde_json::from_slice(&decode(segments[0]).map_err(|_| Malformed::InvalidMessage)?)
            .map_err(|_| Malformed::InvalidMessage)?;
    let payload = decode(segments[1]).map_err(|_| Malformed::InvalidMessage)?;
    let signature = decode(segments[2]).map_err(|_| Malformed::InvalidMessage)?;
    let input = format!("{}.{}", segments[0], segments[1]);
    Ok((protected, payload, signature, input))
}
