use serde_json::Value;

use crate::{envelopes::ProtectedHeader, Malformed, Result};

/// Envelope kind detected by structural probing of a wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Plaintext,
    Signed,
    AnonEncrypted,
    AuthEncrypted,
}

/// Detects the outermost envelope kind without decrypting anything: the only
/// decoding performed is the protected header of an encrypted envelope, whose
/// `alg` prefix separates anonymous from authenticated encryption.
pub fn detect(value: &Value) -> Result<MessageKind> {
    let object = value.as_object().ok_or(Malformed::InvalidMessage)?;
    if object.contains_key("ciphertext") && object.contains_key("recipients") {
        let protected_b64 = object
            .get("protected")
            .and_then(|p| p.as_str())
            .ok_or(Malformed::InvalidMessage)?;
        let protected = ProtectedHeader::from_b64(protected_b64)?;
        return if protected.alg.starts_with("ECDH-1PU") {
            Ok(MessageKind::AuthEncrypted)
        } else if protected.alg.starts_with("ECDH-ES") {
            Ok(MessageKind::AnonEncrypted)
        } else {
            Err(Malformed::InvalidMessage.into())
        };
    }
    if object.contains_key("signatures") {
        return Ok(MessageKind::Signed);
    }
    Ok(MessageKind::Plaintext)
}

#[cfg(test)]
mod tests {
    use base64_url::encode;
    use serde_json::json;

    use super::*;

    fn protected(alg: &str) -> String {
        encode(
            &json!({
                "typ": "application/didcomm-encrypted+json",
                "alg": alg,
                "enc": "XC20P",
                "apv": "x",
            })
            .to_string(),
        )
    }

    #[test]
    fn detects_anon_and_auth_by_alg_prefix() {
        let anon = json!({
            "protected": protected("ECDH-ES+A256KW"),
            "recipients": [],
            "ciphertext": "x",
            "iv": "x",
            "tag": "x",
        });
        let auth = json!({
            "protected": protected("ECDH-1PU+A256KW"),
            "recipients": [],
            "ciphertext": "x",
            "iv": "x",
            "tag": "x",
        });
        assert_eq!(detect(&anon).unwrap(), MessageKind::AnonEncrypted);
        assert_eq!(detect(&auth).unwrap(), MessageKind::AuthEncrypted);
    }

    #[test]
    fn detects_signed_and_plaintext() {
        let signed = json!({"payload": "x", "signatures": []});
        let plain = json!({"id": "1", "type": "t", "body": {}});
        assert_eq!(detect(&signed).unwrap(), MessageKind::Signed);
        assert_eq!(detect(&plain).unwrap(), MessageKind::Plaintext);
    }

    #[test]
    fn unknown_alg_is_malformed() {
        let wire = json!({
            "protected": protected("RSA-OAEP"),
            "recipients": [],
            "ciphertext": "x",
            "iv": "x",
            "tag": "x",
        });
        assert!(detect(&wire).is_err());
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(detect(&json!([1, 2])).is_err());
    }
}
