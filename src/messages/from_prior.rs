use serde::{Deserialize, Serialize};

use crate::{
    crypto::{CryptoProvider, SignAlg},
    dids::{did_of, did_or_url, is_did, DidResolver},
    envelopes::{build_compact, parse_compact, sign_alg_for_key},
    keyselect::{find_pack_signing_secret, find_verification_method, KeyPurpose},
    secrets::SecretsResolver,
    Error, Malformed, Result,
};

/// `from_prior` JWT claims, issued by the prior DID during DID rotation.
/// A JWT, with `sub`: new DID and `iss`: prior DID, signed by a key
/// authorized by the prior DID.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FromPrior {
    pub iss: String,
    pub sub: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl FromPrior {
    pub fn new(iss: impl Into<String>, sub: impl Into<String>) -> Self {
        FromPrior {
            iss: iss.into(),
            sub: sub.into(),
            aud: None,
            exp: None,
            nbf: None,
            iat: None,
            jti: None,
        }
    }

    /// Signs the claims as a compact JWS with a key authorized by `iss`.
    /// Returns the JWT together with the kid actually used.
    pub async fn pack(
        &self,
        issuer_kid: Option<&str>,
        did_resolver: &dyn DidResolver,
        secrets_resolver: &dyn SecretsResolver,
        crypto: &dyn CryptoProvider,
    ) -> Result<(String, String)> {
        if !is_did(&self.iss) || !is_did(&self.sub) {
            return Err(Error::InvalidArgument(
                "from_prior iss and sub must be bare DIDs".to_string(),
            ));
        }
        if self.iss == self.sub {
            return Err(Error::InvalidArgument(
                "from_prior iss and sub must differ".to_string(),
            ));
        }
        let sign_by = match issuer_kid {
            Some(kid) => {
                match did_or_url(kid) {
                    Some((did, Some(_))) if did == self.iss => {}
                    _ => {
                        return Err(Error::InvalidArgument(format!(
                            "issuer kid '{}' does not belong to iss '{}'",
                            kid, self.iss
                        )))
                    }
                }
                kid
            }
            None => self.iss.as_str(),
        };
        let secret = find_pack_signing_secret(sign_by, did_resolver, secrets_resolver).await?;
        let alg = sign_alg_for_key(secret.type_, &secret.secret_material)?;
        let protected = serde_json::json!({
            "typ": "JWT",
            "alg": alg.as_str(),
            "kid": secret.id,
        });
        let jwt = build_compact(
            &protected,
            &serde_json::to_vec(self)?,
            &secret,
            alg,
            crypto,
        )?;
        Ok((jwt, secret.id))
    }

    /// Parses and verifies a `from_prior` JWT, returning the claims and the
    /// issuer kid the signature was checked against.
    pub async fn unpack(
        from_prior_jwt: &str,
        did_resolver: &dyn DidResolver,
        crypto: &dyn CryptoProvider,
    ) -> Result<(FromPrior, String)> {
        let (protected, payload, signature, input) = parse_compact(from_prior_jwt)?;
        let kid = protected
            .get("kid")
            .and_then(|v| v.as_str())
            .ok_or(Malformed::InvalidMessage)?
            .to_string();
        let alg = protected
            .get("alg")
            .and_then(|v| v.as_str())
            .ok_or(Malformed::InvalidMessage)?;
        let alg = SignAlg::from_str(alg).map_err(|_| Malformed::InvalidMessage)?;

        let key = find_verification_method(&kid, KeyPurpose::Authentication, did_resolver).await?;
        let valid = crypto
            .jws_verify(input.as_bytes(), &signature, alg, &key)
            .map_err(|_| Error::Malformed(Malformed::InvalidSignature))?;
        if !valid {
            return Err(Malformed::InvalidSignature.into());
        }

        let claims: FromPrior =
            serde_json::from_slice(&payload).map_err(|_| Malformed::InvalidMessage)?;
        if did_of(&kid).map_err(|_| Malformed::InvalidMessage)? != claims.iss {
            return Err(Malformed::InvalidMessage.into());
        }
        Ok((claims, kid))
    }

    /// Issuer kid of an already packed `from_prior` JWT, without verifying it.
    /// Used by the pack pipelines to surface metadata.
    pub fn issuer_kid(from_prior_jwt: &str) -> Result<String> {
        let (protected, _, _, _) = parse_compact(from_prior_jwt)?;
        protected
            .get("kid")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Malformed::InvalidMessage.into())
    }
}
