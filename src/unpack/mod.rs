//! Receiving counterpart of the pack pipelines: peels envelope layers from
//! the outside in, collecting per-layer metadata, until a plaintext message
//! remains.

use base64_url::decode;
use log::{debug, trace};
use serde_json::Value;

use crate::{
    crypto::{AnonCryptAlg, AuthCryptAlg, ContentEncAlg, CryptoProvider, SignAlg},
    dids::{DidResolver, VerificationMethod},
    envelopes::{detect, Jwe, Jws, MessageKind, ProtectedHeader},
    error::Malformed,
    keyselect::{find_unpack_recipient_secrets, find_verification_method, KeyPurpose},
    messages::{FromPrior, Message},
    routing::{has_keys_for_forward_next, try_parse_forward},
    secrets::{Secret, SecretsResolver},
    Error, Result,
};

/// Knobs for [`unpack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackOptions {
    /// Require every recipient kid of an encrypted layer to be decryptable
    /// with a held secret, and all of them to agree on the plaintext. Off by
    /// default: one working key is enough.
    pub expect_decrypt_by_all_keys: bool,
    /// Transparently unwrap a forward addressed to keys this party holds,
    /// so a message re-wrapped by a mediator unpacks like the original.
    pub unwrap_re_wrapping_forward: bool,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        UnpackOptions {
            expect_decrypt_by_all_keys: false,
            unwrap_re_wrapping_forward: true,
        }
    }
}

/// Everything learned about the envelope layers while unpacking. Consumers
/// must authorize on this metadata, not on message headers: `from` on the
/// plaintext is a claim, `encrypted_from_kid`/`sign_from` are verified.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpackMetadata {
    pub encrypted: bool,
    pub authenticated: bool,
    pub non_repudiation: bool,
    pub anonymous_sender: bool,
    pub re_wrapped_in_forward: bool,
    /// Verified sender kid of the authenticated encryption layer.
    pub encrypted_from_kid: Option<String>,
    /// Recipient kids of the innermost encrypted layer.
    pub encrypted_to_kids: Option<Vec<String>>,
    /// Verified signer kid of the signature layer.
    pub sign_from: Option<String>,
    pub from_prior_issuer_kid: Option<String>,
    pub from_prior: Option<FromPrior>,
    pub enc_alg_auth: Option<AuthCryptAlg>,
    pub enc_alg_anon: Option<AnonCryptAlg>,
    pub sign_alg: Option<SignAlg>,
    /// The signature envelope as received, retained so non-repudiation can be
    /// proven to a third party later.
    pub signed_message: Option<String>,
}

impl UnpackMetadata {
    fn new() -> Self {
        UnpackMetadata {
            encrypted: false,
            authenticated: false,
            non_repudiation: false,
            anonymous_sender: false,
            re_wrapped_in_forward: false,
            encrypted_from_kid: None,
            encrypted_to_kids: None,
            sign_from: None,
            from_prior_issuer_kid: None,
            from_prior: None,
            enc_alg_auth: None,
            enc_alg_anon: None,
            sign_alg: None,
            signed_message: None,
        }
    }
}

/// Unpacks a received wire message of any supported shape, validating each
/// layer. On success the returned metadata says exactly which protections
/// were actually present.
pub async fn unpack(
    msg: &str,
    did_resolver: &dyn DidResolver,
    secrets_resolver: &dyn SecretsResolver,
    crypto: &dyn CryptoProvider,
    options: &UnpackOptions,
) -> Result<(Message, UnpackMetadata)> {
    let mut metadata = UnpackMetadata::new();
    let mut current: Value =
        serde_json::from_str(msg).map_err(|_| Malformed::InvalidMessage)?;

    loop {
        match detect(&current)? {
            MessageKind::AnonEncrypted => {
                let jwe = Jwe::from_value(&current)?;
                let protected = jwe.parse_and_validate_anon()?;
                let kids = jwe.recipient_kids();
                let secrets = find_unpack_recipient_secrets(&kids, secrets_resolver).await?;
                let plaintext = decrypt_layer(&jwe, &secrets, &kids, None, options, crypto)?;

                metadata.encrypted = true;
                metadata.anonymous_sender = true;
                metadata.enc_alg_anon = Some(anon_alg_of(&protected)?);
                metadata.encrypted_to_kids = Some(kids);
                trace!("unpacked anonymous encryption layer");
                current = parse_layer(&plaintext)?;
            }
            MessageKind::AuthEncrypted => {
                let jwe = Jwe::from_value(&current)?;
                let protected = jwe.parse_and_validate_auth()?;
                let sender_kid = auth_sender_kid(&protected)?;
                let sender_vm =
                    find_verification_method(&sender_kid, KeyPurpose::KeyAgreement, did_resolver)
                        .await?;
                let kids = jwe.recipient_kids();
                let secrets = find_unpack_recipient_secrets(&kids, secrets_resolver).await?;
                let plaintext =
                    decrypt_layer(&jwe, &secrets, &kids, Some(&sender_vm), options, crypto)?;

                metadata.encrypted = true;
                metadata.authenticated = true;
                metadata.encrypted_from_kid = Some(sender_kid);
                metadata.enc_alg_auth = Some(auth_alg_of(&protected)?);
                metadata.encrypted_to_kids = Some(kids);
                trace!("unpacked authenticated encryption layer");
                current = parse_layer(&plaintext)?;
            }
            MessageKind::Signed => {
                let jws = Jws::from_value(&current)?;
                let signer_kid = jws.signer_kid().to_string();
                let signer_vm =
                    find_verification_method(&signer_kid, KeyPurpose::Authentication, did_resolver)
                        .await?;
                let payload = jws.verify(&signer_vm, crypto)?;

                metadata.non_repudiation = true;
                metadata.sign_alg = Some(jws.sign_alg()?);
                metadata.sign_from = Some(signer_kid);
                metadata.signed_message = Some(serde_json::to_string(&current)?);
                trace!("verified signature layer");
                current = parse_layer(&payload)?;
            }
            MessageKind::Plaintext => {
                let message = Message::from_value(&current)?;

                if options.unwrap_re_wrapping_forward {
                    if let Some(parsed) = try_parse_forward(&message)? {
                        if has_keys_for_forward_next(&parsed.next, did_resolver, secrets_resolver)
                            .await?
                        {
                            debug!("unwrapping re-wrapping forward towards {}", parsed.next);
                            metadata.re_wrapped_in_forward = true;
                            current = parsed.forwarded_msg;
                            continue;
                        }
                    }
                }

                if let Some(jwt) = &message.from_prior {
                    let (from_prior, issuer_kid) =
                        FromPrior::unpack(jwt, did_resolver, crypto).await?;
                    metadata.from_prior_issuer_kid = Some(issuer_kid);
                    metadata.from_prior = Some(from_prior);
                }

                return Ok((message, metadata));
            }
        }
    }
}

fn parse_layer(plaintext: &[u8]) -> Result<Value> {
    serde_json::from_slice(plaintext).map_err(|_| Malformed::InvalidMessage.into())
}

/// Sender kid of an authenticated envelope, already validated to be a DID-URL
/// by `parse_and_validate_auth`.
fn auth_sender_kid(protected: &ProtectedHeader) -> Result<String> {
    let apu = protected.apu.as_ref().ok_or(Malformed::InvalidMessage)?;
    let raw = decode(apu).map_err(|_| Malformed::InvalidMessage)?;
    String::from_utf8(raw).map_err(|_| Malformed::InvalidMessage.into())
}

fn anon_alg_of(protected: &ProtectedHeader) -> Result<AnonCryptAlg> {
    match ContentEncAlg::from_str(&protected.enc)? {
        ContentEncAlg::A256cbcHs512 => Ok(AnonCryptAlg::A256cbcHs512EcdhEsA256kw),
        ContentEncAlg::Xc20p => Ok(AnonCryptAlg::Xc20pEcdhEsA256kw),
        ContentEncAlg::A256gcm => Ok(AnonCryptAlg::A256gcmEcdhEsA256kw),
    }
}

fn auth_alg_of(protected: &ProtectedHeader) -> Result<AuthCryptAlg> {
    match ContentEncAlg::from_str(&protected.enc)? {
        ContentEncAlg::A256cbcHs512 => Ok(AuthCryptAlg::A256cbcHs512Ecdh1puA256kw),
        _ => Err(Malformed::InvalidMessage.into()),
    }
}

/// Decrypts one encrypted layer. Default mode stops at the first working key;
/// all-keys mode requires a held secret for every recipient kid and identical
/// plaintext from each of them.
fn decrypt_layer(
    jwe: &Jwe,
    secrets: &[Secret],
    all_kids: &[String],
    sender: Option<&VerificationMethod>,
    options: &UnpackOptions,
    crypto: &dyn CryptoProvider,
) -> Result<Vec<u8>> {
    if options.expect_decrypt_by_all_keys {
        if secrets.len() != all_kids.len() {
            return Err(Malformed::CanNotDecrypt.into());
        }
        let mut plaintext: Option<Vec<u8>> = None;
        for secret in secrets {
            let decrypted = jwe.decrypt(secret, sender, crypto)?;
            match &plaintext {
                Some(previous) if *previous != decrypted => {
                    return Err(Malformed::CanNotDecrypt.into());
                }
                Some(_) => {}
                None => plaintext = Some(decrypted),
            }
        }
        plaintext.ok_or_else(|| Error::Malformed(Malformed::CanNotDecrypt))
    } else {
        for secret in secrets {
            match jwe.decrypt(secret, sender, crypto) {
                Ok(plaintext) => return Ok(plaintext),
                Err(err) => trace!("kid {} did not decrypt: {}", secret.id, err),
            }
        }
        Err(Malformed::CanNotDecrypt.into())
    }
}
