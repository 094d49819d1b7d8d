//! Pluggable JOSE cryptography boundary.
//!
//! The envelope codec computes and validates every protocol header field but
//! never touches key agreement, AEAD or signature math itself; all of that
//! goes through [`CryptoProvider`]. A batteries-included implementation backed
//! by the RustCrypto crate family ships behind the `raw-crypto` feature.

#[cfg(feature = "raw-crypto")]
mod raw;

#[cfg(feature = "raw-crypto")]
pub use raw::RawCrypto;

use crate::{
    dids::VerificationMethod,
    envelopes::ProtectedHeader,
    secrets::Secret,
    Error, Result,
};

/// Anonymous (ECDH-ES) encryption algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonCryptAlg {
    A256cbcHs512EcdhEsA256kw,
    Xc20pEcdhEsA256kw,
    A256gcmEcdhEsA256kw,
}

impl Default for AnonCryptAlg {
    fn default() -> Self {
        AnonCryptAlg::Xc20pEcdhEsA256kw
    }
}

impl AnonCryptAlg {
    pub fn alg(&self) -> &'static str {
        "ECDH-ES+A256KW"
    }

    pub fn enc(&self) -> ContentEncAlg {
        match self {
            AnonCryptAlg::A256cbcHs512EcdhEsA256kw => ContentEncAlg::A256cbcHs512,
            AnonCryptAlg::Xc20pEcdhEsA256kw => ContentEncAlg::Xc20p,
            AnonCryptAlg::A256gcmEcdhEsA256kw => ContentEncAlg::A256gcm,
        }
    }
}

/// Authenticated (ECDH-1PU) encryption algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCryptAlg {
    A256cbcHs512Ecdh1puA256kw,
}

impl Default for AuthCryptAlg {
    fn default() -> Self {
        AuthCryptAlg::A256cbcHs512Ecdh1puA256kw
    }
}

impl AuthCryptAlg {
    pub fn alg(&self) -> &'static str {
        "ECDH-1PU+A256KW"
    }

    pub fn enc(&self) -> ContentEncAlg {
        match self {
            AuthCryptAlg::A256cbcHs512Ecdh1puA256kw => ContentEncAlg::A256cbcHs512,
        }
    }
}

/// Content encryption (the `enc` protected header value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncAlg {
    A256cbcHs512,
    A256gcm,
    Xc20p,
}

impl ContentEncAlg {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncAlg::A256cbcHs512 => "A256CBC-HS512",
            ContentEncAlg::A256gcm => "A256GCM",
            ContentEncAlg::Xc20p => "XC20P",
        }
    }

    pub fn from_str(value: &str) -> Result<Self> {
        match value {
            "A256CBC-HS512" => Ok(ContentEncAlg::A256cbcHs512),
            "A256GCM" => Ok(ContentEncAlg::A256gcm),
            "XC20P" => Ok(ContentEncAlg::Xc20p),
            other => Err(Error::Unsupported(format!(
                "content encryption '{}'",
                other
            ))),
        }
    }
}

/// Key agreement + key wrap (the `alg` protected header value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWrapAlg {
    EcdhEsA256kw,
    Ecdh1puA256kw,
}

impl KeyWrapAlg {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyWrapAlg::EcdhEsA256kw => "ECDH-ES+A256KW",
            KeyWrapAlg::Ecdh1puA256kw => "ECDH-1PU+A256KW",
        }
    }

    pub fn from_str(value: &str) -> Result<Self> {
        match value {
            "ECDH-ES+A256KW" => Ok(KeyWrapAlg::EcdhEsA256kw),
            "ECDH-1PU+A256KW" => Ok(KeyWrapAlg::Ecdh1puA256kw),
            other => Err(Error::Unsupported(format!("key agreement '{}'", other))),
        }
    }
}

/// JWS signature algorithms per the DIDComm spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignAlg {
    EdDsa,
    Es256,
    Es256k,
}

impl SignAlg {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignAlg::EdDsa => "EdDSA",
            SignAlg::Es256 => "ES256",
            SignAlg::Es256k => "ES256K",
        }
    }

    pub fn from_str(value: &str) -> Result<Self> {
        match value {
            "EdDSA" => Ok(SignAlg::EdDsa),
            "ES256" => Ok(SignAlg::Es256),
            "ES256K" => Ok(SignAlg::Es256k),
            other => Err(Error::Unsupported(format!("signature alg '{}'", other))),
        }
    }
}

/// Inputs for one JWE encryption. The protected header arrives complete except
/// for `epk`, which the provider generates, inserts and serializes so the AAD
/// it authenticates is the exact wire value.
pub struct JweEncryptParams<'a> {
    pub plaintext: &'a [u8],
    pub protected: &'a ProtectedHeader,
    pub key_wrap: KeyWrapAlg,
    pub enc: ContentEncAlg,
    /// Sender key-agreement secret, present for ECDH-1PU only.
    pub sender: Option<&'a Secret>,
    /// `(kid, public key)` per recipient.
    pub recipients: Vec<(&'a str, &'a VerificationMethod)>,
}

/// Output of one JWE encryption; all values base64url-encoded for the wire.
pub struct JweParts {
    pub protected_b64: String,
    /// `(kid, encrypted_key)` per recipient, input order preserved.
    pub encrypted_keys: Vec<(String, String)>,
    pub iv_b64: String,
    pub ciphertext_b64: String,
    pub tag_b64: String,
}

/// Inputs for one single-recipient JWE decryption attempt.
pub struct JweDecryptParams<'a> {
    pub protected_b64: &'a str,
    pub iv_b64: &'a str,
    pub ciphertext_b64: &'a str,
    pub tag_b64: &'a str,
    pub encrypted_key_b64: &'a str,
    pub recipient: &'a Secret,
    /// Sender key-agreement public key, present for ECDH-1PU only.
    pub sender: Option<&'a VerificationMethod>,
}

/// Trait must be implemented for pluggable cryptography.
/// Implemented by [`RawCrypto`] with the `raw-crypto` feature.
pub trait CryptoProvider: Sync {
    /// Computes a raw JWS signature over the prepared signing input.
    fn jws_sign(&self, input: &[u8], alg: SignAlg, key: &Secret) -> Result<Vec<u8>>;

    /// Verifies a raw JWS signature; `Ok(false)` for a well-formed but wrong
    /// signature, `Err` for unusable inputs.
    fn jws_verify(
        &self,
        input: &[u8],
        signature: &[u8],
        alg: SignAlg,
        key: &VerificationMethod,
    ) -> Result<bool>;

    fn jwe_encrypt(&self, params: JweEncryptParams<'_>) -> Result<JweParts>;

    fn jwe_decrypt(&self, params: JweDecryptParams<'_>) -> Result<Vec<u8>>;
}
