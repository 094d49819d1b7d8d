//! Batteries-included [`CryptoProvider`] backed by the RustCrypto crate
//! family. Key agreement is X25519 only; EC keys are accepted by the
//! signature algorithms but rejected for encryption.

use std::convert::TryFrom;

use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, NewAead, Payload},
    Aes256Gcm,
};
use arrayref::array_ref;
use base58::FromBase58;
use base64_url::{decode, encode};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use hmac::{Hmac, Mac, NewMac};
use log::trace;
use rand::Rng;
use sha2::{Digest, Sha256, Sha512};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::{
    dids::{VerificationMaterial, VerificationMethod, VerificationMethodType},
    envelopes::ProtectedHeader,
    secrets::Secret,
    Error, Result,
};

use super::{
    ContentEncAlg, CryptoProvider, JweDecryptParams, JweEncryptParams, JweParts, KeyWrapAlg,
    SignAlg,
};

/// Default crypto provider, enabled by the `raw-crypto` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawCrypto;

impl CryptoProvider for RawCrypto {
    fn jws_sign(&self, input: &[u8], alg: SignAlg, key: &Secret) -> Result<Vec<u8>> {
        let sk = private_key_bytes(&key.type_, &key.secret_material)?;
        match alg {
            SignAlg::EdDsa => {
                let secret = ed25519_dalek::SecretKey::from_bytes(&sk)
                    .map_err(|e| Error::CryptoFailure(e.to_string()))?;
                let public = ed25519_dalek::PublicKey::from(&secret);
                let expanded = ed25519_dalek::ExpandedSecretKey::from(&secret);
                Ok(expanded.sign(input, &public).to_bytes().to_vec())
            }
            SignAlg::Es256 => {
                use p256::ecdsa::{signature::Signer, SigningKey};
                let sk = SigningKey::from_bytes(&sk)
                    .map_err(|e| Error::CryptoFailure(e.to_string()))?;
                let signature: p256::ecdsa::Signature = sk.sign(input);
                Ok(signature.as_ref().to_vec())
            }
            SignAlg::Es256k => {
                use k256::ecdsa::{signature::Signer, SigningKey};
                let sk = SigningKey::from_bytes(&sk)
                    .map_err(|e| Error::CryptoFailure(e.to_string()))?;
                let signature: k256::ecdsa::Signature = sk.sign(input);
                Ok(signature.as_ref().to_vec())
            }
        }
    }

    fn jws_verify(
        &self,
        input: &[u8],
        signature: &[u8],
        alg: SignAlg,
        key: &VerificationMethod,
    ) -> Result<bool> {
        match alg {
            SignAlg::EdDsa => {
                let pk_bytes = public_key_bytes(&key.type_, &key.verification_material)?;
                let pk = ed25519_dalek::PublicKey::from_bytes(&pk_bytes)
                    .map_err(|e| Error::CryptoFailure(e.to_string()))?;
                let signature = ed25519_dalek::Signature::try_from(signature)
                    .map_err(|e| Error::CryptoFailure(e.to_string()))?;
                use ed25519_dalek::Verifier;
                Ok(pk.verify(input, &signature).is_ok())
            }
            SignAlg::Es256 => {
                use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
                let vk = VerifyingKey::from_sec1_bytes(&ec_sec1_bytes(key)?)
                    .map_err(|e| Error::CryptoFailure(e.to_string()))?;
                let signature = Signature::try_from(signature)
                    .map_err(|e| Error::CryptoFailure(e.to_string()))?;
                Ok(vk.verify(input, &signature).is_ok())
            }
            SignAlg::Es256k => {
                use k256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
                let vk = VerifyingKey::from_sec1_bytes(&ec_sec1_bytes(key)?)
                    .map_err(|e| Error::CryptoFailure(e.to_string()))?;
                let signature = Signature::try_from(signature)
                    .map_err(|e| Error::CryptoFailure(e.to_string()))?;
                Ok(vk.verify(input, &signature).is_ok())
            }
        }
    }

    fn jwe_encrypt(&self, params: JweEncryptParams<'_>) -> Result<JweParts> {
        let mut rng = rand::thread_rng();

        // content encryption key; A256CBC-HS512 splits it into mac + enc halves
        let cek: Vec<u8> = match params.enc {
            ContentEncAlg::A256cbcHs512 => random_bytes(&mut rng, 64),
            ContentEncAlg::A256gcm | ContentEncAlg::Xc20p => random_bytes(&mut rng, 32),
        };

        // ephemeral X25519 key, published as epk in the protected header
        let epk_secret = StaticSecret::new(rand_core::OsRng);
        let epk_public = PublicKey::from(&epk_secret);
        let mut protected = params.protected.clone();
        protected.epk = Some(serde_json::json!({
            "kty": "OKP",
            "crv": "X25519",
            "x": encode(epk_public.as_bytes()),
        }));
        let protected_b64 = encode(&serde_json::to_vec(&protected)?);

        let iv = match params.enc {
            ContentEncAlg::A256cbcHs512 => random_bytes(&mut rng, 16),
            ContentEncAlg::A256gcm => random_bytes(&mut rng, 12),
            ContentEncAlg::Xc20p => random_bytes(&mut rng, 24),
        };
        let (ciphertext, tag) = content_encrypt(
            params.enc,
            &cek,
            &iv,
            params.plaintext,
            protected_b64.as_bytes(),
        )?;

        let sender_sk = match (params.key_wrap, params.sender) {
            (KeyWrapAlg::Ecdh1puA256kw, Some(sender)) => {
                Some(x25519_private(&sender.type_, &sender.secret_material)?)
            }
            (KeyWrapAlg::Ecdh1puA256kw, None) => {
                return Err(Error::CryptoFailure(
                    "ECDH-1PU requires a sender secret".to_string(),
                ))
            }
            (KeyWrapAlg::EcdhEsA256kw, _) => None,
        };

        let apu = protected.apu.as_deref().map(decode).transpose()?;
        let apv = decode(&protected.apv)?;

        let mut encrypted_keys = Vec::with_capacity(params.recipients.len());
        for (kid, vm) in &params.recipients {
            trace!("creating per-recipient JWE value for {}", kid);
            let recipient_public = x25519_public(&vm.type_, &vm.verification_material)?;
            let kek = generate_kek(
                params.key_wrap,
                &epk_secret,
                sender_sk.as_ref(),
                &recipient_public,
                apu.as_deref(),
                &apv,
            )?;
            encrypted_keys.push(((*kid).to_string(), encode(&wrap_key(&kek, &cek)?)));
        }

        Ok(JweParts {
            protected_b64,
            encrypted_keys,
            iv_b64: encode(&iv),
            ciphertext_b64: encode(&ciphertext),
            tag_b64: encode(&tag),
        })
    }

    fn jwe_decrypt(&self, params: JweDecryptParams<'_>) -> Result<Vec<u8>> {
        let protected = ProtectedHeader::from_b64(params.protected_b64)?;
        let key_wrap = KeyWrapAlg::from_str(&protected.alg)?;
        let enc = ContentEncAlg::from_str(&protected.enc)?;

        let epk = protected
            .epk
            .as_ref()
            .ok_or_else(|| Error::CryptoFailure("missing epk in protected header".to_string()))?;
        let epk_x = epk
            .get("x")
            .and_then(|x| x.as_str())
            .ok_or_else(|| Error::CryptoFailure("epk has no x coordinate".to_string()))?;
        let epk_public = x25519_public_from_bytes(&decode(epk_x)?)?;

        let recipient_sk =
            x25519_private(&params.recipient.type_, &params.recipient.secret_material)?;

        // ze: ephemeral-static, zs (1PU only): static-static, both from the
        // recipient's side here
        let ze = recipient_sk.diffie_hellman(&epk_public);
        let sender_public = match (key_wrap, params.sender) {
            (KeyWrapAlg::Ecdh1puA256kw, Some(sender)) => Some(x25519_public(
                &sender.type_,
                &sender.verification_material,
            )?),
            (KeyWrapAlg::Ecdh1puA256kw, None) => {
                return Err(Error::CryptoFailure(
                    "ECDH-1PU requires the sender public key".to_string(),
                ))
            }
            (KeyWrapAlg::EcdhEsA256kw, _) => None,
        };

        let mut shared = ze.as_bytes().to_vec();
        if let Some(sender_public) = sender_public {
            let zs = recipient_sk.diffie_hellman(&sender_public);
            shared.extend_from_slice(zs.as_bytes());
        }

        let apu = protected.apu.as_deref().map(decode).transpose()?;
        let apv = decode(&protected.apv)?;
        let kek = concat_kdf(
            &shared,
            key_wrap.as_str(),
            apu.as_deref(),
            Some(&apv),
        )?;

        let cek = unwrap_key(&kek, &decode(params.encrypted_key_b64)?)?;
        content_decrypt(
            enc,
            &cek,
            &decode(params.iv_b64)?,
            &decode(params.ciphertext_b64)?,
            &decode(params.tag_b64)?,
            params.protected_b64.as_bytes(),
        )
    }
}

fn random_bytes(rng: &mut impl Rng, len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rng.fill(bytes.as_mut_slice());
    bytes
}

/// Derives the key encryption key for one recipient (sender side).
fn generate_kek(
    key_wrap: KeyWrapAlg,
    epk_secret: &StaticSecret,
    sender_sk: Option<&StaticSecret>,
    recipient_public: &PublicKey,
    apu: Option<&[u8]>,
    apv: &[u8],
) -> Result<Vec<u8>> {
    let ze = StaticSecret::from(epk_secret.to_bytes()).diffie_hellman(recipient_public);
    let mut shared = ze.as_bytes().to_vec();
    if let Some(sender_sk) = sender_sk {
        let zs = StaticSecret::from(sender_sk.to_bytes()).diffie_hellman(recipient_public);
        shared.extend_from_slice(zs.as_bytes());
    }
    concat_kdf(&shared, key_wrap.as_str(), apu, Some(apv))
}

/// Single-round Concat KDF (NIST SP 800-56A) producing a 256-bit key.
fn concat_kdf(
    secret: &[u8],
    alg: &str,
    producer_info: Option<&[u8]>,
    consumer_info: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut value = get_length_and_input(alg.as_bytes())?;
    if let Some(vector) = producer_info {
        value.extend(get_length_and_input(vector)?);
    } else {
        value.extend(&[0, 0, 0, 0]);
    }
    if let Some(vector) = consumer_info {
        value.extend(get_length_and_input(vector)?);
    } else {
        value.extend(&[0, 0, 0, 0]);
    }
    // only key length 256 is supported
    value.extend(&[0, 0, 1, 0]);

    let mut to_hash: Vec<u8> = vec![0, 0, 0, 1];
    to_hash.extend(secret);
    to_hash.extend(value);

    let mut hasher = Sha256::new();
    hasher.update(&to_hash);
    Ok(hasher.finalize().to_vec())
}

/// Prefixes a byte string with its big-endian u32 length.
fn get_length_and_input(vector: &[u8]) -> Result<Vec<u8>> {
    let mut collected: Vec<u8> = u32::try_from(vector.len())
        .map_err(|err| Error::CryptoFailure(err.to_string()))?
        .to_be_bytes()
        .to_vec();
    collected.extend(vector);
    Ok(collected)
}

/// Wraps the CEK under the derived KEK with AES-256-GCM. The KEK is unique per
/// message and recipient, so the nonce is fixed.
fn wrap_key(kek: &[u8], cek: &[u8]) -> Result<Vec<u8>> {
    let crypter = Aes256Gcm::new(GenericArray::from_slice(kek));
    let nonce = GenericArray::from_slice(&[0u8; 12]);
    crypter
        .encrypt(nonce, cek)
        .map_err(|e| Error::CryptoFailure(e.to_string()))
}

fn unwrap_key(kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>> {
    let crypter = Aes256Gcm::new(GenericArray::from_slice(kek));
    let nonce = GenericArray::from_slice(&[0u8; 12]);
    crypter
        .decrypt(nonce, wrapped)
        .map_err(|e| Error::CryptoFailure(e.to_string()))
}

/// AEAD content encryption; returns `(ciphertext, tag)`.
fn content_encrypt(
    enc: ContentEncAlg,
    cek: &[u8],
    iv: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    match enc {
        ContentEncAlg::A256gcm => {
            let crypter = Aes256Gcm::new(GenericArray::from_slice(cek));
            let nonce = GenericArray::from_slice(iv);
            let mut sealed = crypter
                .encrypt(nonce, Payload { msg: plaintext, aad })
                .map_err(|e| Error::CryptoFailure(e.to_string()))?;
            let tag = sealed.split_off(sealed.len() - 16);
            Ok((sealed, tag))
        }
        ContentEncAlg::Xc20p => {
            let crypter = XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(cek));
            let nonce = XNonce::from_slice(iv);
            let mut sealed = crypter
                .encrypt(nonce, Payload { msg: plaintext, aad })
                .map_err(|e| Error::CryptoFailure(e.to_string()))?;
            let tag = sealed.split_off(sealed.len() - 16);
            Ok((sealed, tag))
        }
        ContentEncAlg::A256cbcHs512 => {
            if cek.len() != 64 {
                return Err(Error::CryptoFailure(
                    "A256CBC-HS512 requires a 64-byte key".to_string(),
                ));
            }
            let (mac_key, enc_key) = cek.split_at(32);
            let cipher = libaes::Cipher::new_256(array_ref!(enc_key, 0, 32));
            let ciphertext = cipher.cbc_encrypt(iv, plaintext);
            let tag = cbc_hmac_tag(mac_key, aad, iv, &ciphertext)?;
            Ok((ciphertext, tag))
        }
    }
}

fn content_decrypt(
    enc: ContentEncAlg,
    cek: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    match enc {
        ContentEncAlg::A256gcm => {
            let crypter = Aes256Gcm::new(GenericArray::from_slice(cek));
            let nonce = GenericArray::from_slice(iv);
            let mut sealed = ciphertext.to_vec();
            sealed.extend_from_slice(tag);
            crypter
                .decrypt(nonce, Payload { msg: &sealed, aad })
                .map_err(|e| Error::CryptoFailure(e.to_string()))
        }
        ContentEncAlg::Xc20p => {
            let crypter = XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(cek));
            let nonce = XNonce::from_slice(iv);
            let mut sealed = ciphertext.to_vec();
            sealed.extend_from_slice(tag);
            crypter
                .decrypt(nonce, Payload { msg: &sealed, aad })
                .map_err(|e| Error::CryptoFailure(e.to_string()))
        }
        ContentEncAlg::A256cbcHs512 => {
            if cek.len() != 64 {
                return Err(Error::CryptoFailure(
                    "A256CBC-HS512 requires a 64-byte key".to_string(),
                ));
            }
            let (mac_key, enc_key) = cek.split_at(32);
            let expected = cbc_hmac_tag(mac_key, aad, iv, ciphertext)?;
            if expected != tag {
                return Err(Error::CryptoFailure("authentication tag mismatch".to_string()));
            }
            let cipher = libaes::Cipher::new_256(array_ref!(enc_key, 0, 32));
            let plaintext = cipher.cbc_decrypt(iv, ciphertext);
            if plaintext.is_empty() && !ciphertext.is_empty() {
                return Err(Error::CryptoFailure("CBC decryption failed".to_string()));
            }
            Ok(plaintext)
        }
    }
}

/// RFC 7518 section 5.2.2 tag: HMAC-SHA-512 over AAD || IV || ciphertext || AL,
/// truncated to the first 32 bytes.
fn cbc_hmac_tag(mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha512>::new_from_slice(mac_key)
        .map_err(|e| Error::CryptoFailure(e.to_string()))?;
    mac.update(aad);
    mac.update(iv);
    mac.update(ciphertext);
    mac.update(&((aad.len() as u64) * 8).to_be_bytes());
    Ok(mac.finalize().into_bytes()[..32].to_vec())
}

/// Extracts an X25519 public key from verification material.
fn x25519_public(
    type_: &VerificationMethodType,
    material: &VerificationMaterial,
) -> Result<PublicKey> {
    let bytes = match (type_, material) {
        (VerificationMethodType::JsonWebKey2020, VerificationMaterial::Jwk(value)) => {
            expect_x25519_jwk(value)?;
            decode(
                value
                    .get("x")
                    .and_then(|x| x.as_str())
                    .ok_or_else(|| Error::CryptoFailure("JWK has no x".to_string()))?,
            )?
        }
        (VerificationMethodType::X25519KeyAgreementKey2019, VerificationMaterial::Base58(value)) => {
            value
                .from_base58()
                .map_err(|_| Error::CryptoFailure("bad base58 key".to_string()))?
        }
        (VerificationMethodType::X25519KeyAgreementKey2020, VerificationMaterial::Multibase(value)) => {
            multibase_key_bytes(value)?
        }
        _ => {
            return Err(Error::Unsupported(
                "key agreement requires X25519 material".to_string(),
            ))
        }
    };
    x25519_public_from_bytes(&bytes)
}

fn x25519_public_from_bytes(bytes: &[u8]) -> Result<PublicKey> {
    if bytes.len() != 32 {
        return Err(Error::CryptoFailure("X25519 key must be 32 bytes".to_string()));
    }
    Ok(PublicKey::from(array_ref!(bytes, 0, 32).to_owned()))
}

/// Extracts an X25519 private key from secret material.
fn x25519_private(
    type_: &VerificationMethodType,
    material: &VerificationMaterial,
) -> Result<StaticSecret> {
    let bytes = match (type_, material) {
        (VerificationMethodType::JsonWebKey2020, VerificationMaterial::Jwk(value)) => {
            expect_x25519_jwk(value)?;
            decode(
                value
                    .get("d")
                    .and_then(|d| d.as_str())
                    .ok_or_else(|| Error::CryptoFailure("JWK has no d".to_string()))?,
            )?
        }
        (VerificationMethodType::X25519KeyAgreementKey2019, VerificationMaterial::Base58(value)) => {
            value
                .from_base58()
                .map_err(|_| Error::CryptoFailure("bad base58 key".to_string()))?
        }
        (VerificationMethodType::X25519KeyAgreementKey2020, VerificationMaterial::Multibase(value)) => {
            multibase_key_bytes(value)?
        }
        _ => {
            return Err(Error::Unsupported(
                "key agreement requires X25519 material".to_string(),
            ))
        }
    };
    if bytes.len() != 32 {
        return Err(Error::CryptoFailure("X25519 key must be 32 bytes".to_string()));
    }
    Ok(StaticSecret::from(array_ref!(&bytes, 0, 32).to_owned()))
}

fn expect_x25519_jwk(value: &serde_json::Value) -> Result<()> {
    let kty = value.get("kty").and_then(|v| v.as_str());
    let crv = value.get("crv").and_then(|v| v.as_str());
    if kty == Some("OKP") && crv == Some("X25519") {
        Ok(())
    } else {
        Err(Error::Unsupported(
            "key agreement requires X25519 material".to_string(),
        ))
    }
}

/// Raw 32-byte key from a `z`-prefixed base58btc multibase string with a
/// two-byte multicodec prefix (the 2020 verification key formats).
fn multibase_key_bytes(value: &str) -> Result<Vec<u8>> {
    let encoded = value
        .strip_prefix('z')
        .ok_or_else(|| Error::Unsupported("only base58btc multibase is supported".to_string()))?;
    let bytes = encoded
        .from_base58()
        .map_err(|_| Error::CryptoFailure("bad multibase key".to_string()))?;
    if bytes.len() < 2 {
        return Err(Error::CryptoFailure("multibase key too short".to_string()));
    }
    Ok(bytes[2..].to_vec())
}

/// 32-byte private scalar/seed for the signature algorithms.
fn private_key_bytes(
    _type: &VerificationMethodType,
    material: &VerificationMaterial,
) -> Result<Vec<u8>> {
    match material {
        VerificationMaterial::Jwk(value) => decode(
            value
                .get("d")
                .and_then(|d| d.as_str())
                .ok_or_else(|| Error::CryptoFailure("JWK has no d".to_string()))?,
        )
        .map_err(Error::from),
        VerificationMaterial::Base58(value) => value
            .from_base58()
            .map_err(|_| Error::CryptoFailure("bad base58 key".to_string())),
        VerificationMaterial::Multibase(value) => multibase_key_bytes(value),
    }
}

/// Ed25519 public key bytes from verification material.
fn public_key_bytes(
    type_: &VerificationMethodType,
    material: &VerificationMaterial,
) -> Result<Vec<u8>> {
    match (type_, material) {
        (VerificationMethodType::JsonWebKey2020, VerificationMaterial::Jwk(value)) => decode(
            value
                .get("x")
                .and_then(|x| x.as_str())
                .ok_or_else(|| Error::CryptoFailure("JWK has no x".to_string()))?,
        )
        .map_err(Error::from),
        (VerificationMethodType::Ed25519VerificationKey2018, VerificationMaterial::Base58(value)) => {
            value
                .from_base58()
                .map_err(|_| Error::CryptoFailure("bad base58 key".to_string()))
        }
        (VerificationMethodType::Ed25519VerificationKey2020, VerificationMaterial::Multibase(value)) => {
            multibase_key_bytes(value)
        }
        _ => Err(Error::Unsupported(
            "unsupported verification material for signatures".to_string(),
        )),
    }
}

/// Uncompressed SEC1 point from an EC JWK (`0x04 || x || y`).
fn ec_sec1_bytes(key: &VerificationMethod) -> Result<Vec<u8>> {
    let value = match &key.verification_material {
        VerificationMaterial::Jwk(value) => value,
        _ => {
            return Err(Error::Unsupported(
                "EC keys must use JWK material".to_string(),
            ))
        }
    };
    let x = decode(
        value
            .get("x")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::CryptoFailure("EC JWK has no x".to_string()))?,
    )?;
    let y = decode(
        value
            .get("y")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::CryptoFailure("EC JWK has no y".to_string()))?,
    )?;
    let mut sec1 = Vec::with_capacity(1 + x.len() + y.len());
    sec1.push(0x04);
    sec1.extend_from_slice(&x);
    sec1.extend_from_slice(&y);
    Ok(sec1)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::messages::MessageTyp;

    use super::*;

    fn x25519_pair(seed: [u8; 32]) -> (Secret, VerificationMethod) {
        let sk = StaticSecret::from(seed);
        let pk = PublicKey::from(&sk);
        let secret = Secret {
            id: "did:example:test#key-1".to_string(),
            type_: VerificationMethodType::JsonWebKey2020,
            secret_material: VerificationMaterial::Jwk(json!({
                "kty": "OKP",
                "crv": "X25519",
                "x": encode(pk.as_bytes()),
                "d": encode(&sk.to_bytes()),
            })),
        };
        let vm = VerificationMethod {
            id: "did:example:test#key-1".to_string(),
            type_: VerificationMethodType::JsonWebKey2020,
            controller: "did:example:test".to_string(),
            verification_material: VerificationMaterial::Jwk(json!({
                "kty": "OKP",
                "crv": "X25519",
                "x": encode(pk.as_bytes()),
            })),
        };
        (secret, vm)
    }

    fn protected(alg: KeyWrapAlg, enc: ContentEncAlg, skid: Option<&str>) -> ProtectedHeader {
        ProtectedHeader {
            typ: MessageTyp::Encrypted,
            alg: alg.as_str().to_string(),
            enc: enc.as_str().to_string(),
            skid: skid.map(str::to_string),
            apu: skid.map(|kid| encode(kid.as_bytes())),
            apv: encode(&Sha256::digest(b"did:example:test#key-1")),
            epk: None,
        }
    }

    fn encrypt_decrypt(enc: ContentEncAlg) {
        // Arrange
        let (secret, vm) = x25519_pair([7u8; 32]);
        let plaintext = br#"{"body":"can be anything..."}"#;
        let header = protected(KeyWrapAlg::EcdhEsA256kw, enc, None);
        // Act
        let parts = RawCrypto
            .jwe_encrypt(JweEncryptParams {
                plaintext,
                protected: &header,
                key_wrap: KeyWrapAlg::EcdhEsA256kw,
                enc,
                sender: None,
                recipients: vec![("did:example:test#key-1", &vm)],
            })
            .unwrap();
        let decrypted = RawCrypto
            .jwe_decrypt(JweDecryptParams {
                protected_b64: &parts.protected_b64,
                iv_b64: &parts.iv_b64,
                ciphertext_b64: &parts.ciphertext_b64,
                tag_b64: &parts.tag_b64,
                encrypted_key_b64: &parts.encrypted_keys[0].1,
                recipient: &secret,
                sender: None,
            })
            .unwrap();
        // Assert
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn xc20p_round_trip() {
        encrypt_decrypt(ContentEncAlg::Xc20p);
    }

    #[test]
    fn a256gcm_round_trip() {
        encrypt_decrypt(ContentEncAlg::A256gcm);
    }

    #[test]
    fn a256cbc_hs512_round_trip() {
        encrypt_decrypt(ContentEncAlg::A256cbcHs512);
    }

    #[test]
    fn ecdh_1pu_round_trip() {
        // Arrange
        let (recipient_secret, recipient_vm) = x25519_pair([9u8; 32]);
        let (sender_secret, sender_vm) = x25519_pair([11u8; 32]);
        let plaintext = b"authenticated payload";
        let header = protected(
            KeyWrapAlg::Ecdh1puA256kw,
            ContentEncAlg::A256cbcHs512,
            Some("did:example:test#key-1"),
        );
        // Act
        let parts = RawCrypto
            .jwe_encrypt(JweEncryptParams {
                plaintext,
                protected: &header,
                key_wrap: KeyWrapAlg::Ecdh1puA256kw,
                enc: ContentEncAlg::A256cbcHs512,
                sender: Some(&sender_secret),
                recipients: vec![("did:example:test#key-1", &recipient_vm)],
            })
            .unwrap();
        let decrypted = RawCrypto
            .jwe_decrypt(JweDecryptParams {
                protected_b64: &parts.protected_b64,
                iv_b64: &parts.iv_b64,
                ciphertext_b64: &parts.ciphertext_b64,
                tag_b64: &parts.tag_b64,
                encrypted_key_b64: &parts.encrypted_keys[0].1,
                recipient: &recipient_secret,
                sender: Some(&sender_vm),
            })
            .unwrap();
        // Assert
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_recipient_key_fails() {
        let (_, vm) = x25519_pair([1u8; 32]);
        let (other_secret, _) = x25519_pair([2u8; 32]);
        let header = protected(KeyWrapAlg::EcdhEsA256kw, ContentEncAlg::Xc20p, None);
        let parts = RawCrypto
            .jwe_encrypt(JweEncryptParams {
                plaintext: b"secret",
                protected: &header,
                key_wrap: KeyWrapAlg::EcdhEsA256kw,
                enc: ContentEncAlg::Xc20p,
                sender: None,
                recipients: vec![("did:example:test#key-1", &vm)],
            })
            .unwrap();
        let result = RawCrypto.jwe_decrypt(JweDecryptParams {
            protected_b64: &parts.protected_b64,
            iv_b64: &parts.iv_b64,
            ciphertext_b64: &parts.ciphertext_b64,
            tag_b64: &parts.tag_b64,
            encrypted_key_b64: &parts.encrypted_keys[0].1,
            recipient: &other_secret,
            sender: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn eddsa_sign_verify() {
        // Arrange
        let seed = [5u8; 32];
        let sk = ed25519_dalek::SecretKey::from_bytes(&seed).unwrap();
        let pk = ed25519_dalek::PublicKey::from(&sk);
        let secret = Secret {
            id: "did:example:test#key-ed".to_string(),
            type_: VerificationMethodType::JsonWebKey2020,
            secret_material: VerificationMaterial::Jwk(json!({
                "kty": "OKP",
                "crv": "Ed25519",
                "x": encode(pk.as_bytes()),
                "d": encode(&seed),
            })),
        };
        let vm = VerificationMethod {
            id: "did:example:test#key-ed".to_string(),
            type_: VerificationMethodType::JsonWebKey2020,
            controller: "did:example:test".to_string(),
            verification_material: VerificationMaterial::Jwk(json!({
                "kty": "OKP",
                "crv": "Ed25519",
                "x": encode(pk.as_bytes()),
            })),
        };
        let message = b"this is the message we're signing in this test...";
        // Act
        let signature = RawCrypto.jws_sign(message, SignAlg::EdDsa, &secret).unwrap();
        // Assert
        assert!(RawCrypto
            .jws_verify(message, &signature, SignAlg::EdDsa, &vm)
            .unwrap());
        assert!(!RawCrypto
            .jws_verify(b"another message", &signature, SignAlg::EdDsa, &vm)
            .unwrap());
    }
}
