use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Malformed, Result};

use super::Attachment;

/// Media types carried in the `typ` field of the three envelope kinds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTyp {
    #[serde(rename = "application/didcomm-plain+json")]
    Plain,
    #[serde(rename = "application/didcomm-signed+json")]
    Signed,
    #[serde(rename = "application/didcomm-encrypted+json")]
    Encrypted,
}

impl MessageTyp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageTyp::Plain => "application/didcomm-plain+json",
            MessageTyp::Signed => "application/didcomm-signed+json",
            MessageTyp::Encrypted => "application/didcomm-encrypted+json",
        }
    }
}

impl Default for MessageTyp {
    fn default() -> Self {
        MessageTyp::Plain
    }
}

/// DIDComm plaintext message.
/// [Specification](https://identity.foundation/didcomm-messaging/spec/#message-structure)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,

    #[serde(default)]
    pub typ: MessageTyp,

    /// Protocol message type URI.
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pthid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_time: Option<u64>,

    pub body: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,

    /// Already packed `from_prior` JWT (compact JWS), present on DID rotation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_prior: Option<String>,

    /// Application-defined headers, kept as-is on the wire.
    #[serde(flatten)]
    pub extra_headers: HashMap<String, Value>,
}

impl Message {
    /// Constructor with the three required plaintext fields; everything else
    /// is set through the chaining setters below.
    pub fn new(id: impl Into<String>, type_: impl Into<String>, body: Value) -> Self {
        Message {
            id: id.into(),
            typ: MessageTyp::Plain,
            type_: type_.into(),
            from: None,
            to: None,
            thid: None,
            pthid: None,
            created_time: None,
            expires_time: None,
            body,
            attachments: None,
            from_prior: None,
            extra_headers: HashMap::new(),
        }
    }

    /// Constructor with a random v4 uuid as `id`.
    pub fn with_random_id(type_: impl Into<String>, body: Value) -> Self {
        Message::new(uuid::Uuid::new_v4().to_string(), type_, body)
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn to(mut self, to: Vec<String>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn thid(mut self, thid: impl Into<String>) -> Self {
        self.thid = Some(thid.into());
        self
    }

    pub fn created_time(mut self, created_time: u64) -> Self {
        self.created_time = Some(created_time);
        self
    }

    pub fn expires_time(mut self, expires_time: u64) -> Self {
        self.expires_time = Some(expires_time);
        self
    }

    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = Some(attachments);
        self
    }

    pub fn from_prior(mut self, from_prior: impl Into<String>) -> Self {
        self.from_prior = Some(from_prior.into());
        self
    }

    /// Adds (or updates) a custom header key-value pair.
    pub fn add_header_field(mut self, key: String, value: Value) -> Self {
        if key.is_empty() {
            return self;
        }
        self.extra_headers.insert(key, value);
        self
    }

    /// Parses a received plaintext, enforcing presence and shape of the
    /// required `id`, `type` and `body` fields before the typed parse runs.
    /// Everything structural maps to `Malformed::InvalidPlaintext`.
    pub fn from_wire(wire: &str) -> Result<Self> {
        let raw: Value =
            serde_json::from_str(wire).map_err(|_| Malformed::InvalidPlaintext)?;
        Message::from_value(&raw)
    }

    pub(crate) fn from_value(raw: &Value) -> Result<Self> {
        let object = raw.as_object().ok_or(Malformed::InvalidPlaintext)?;
        for required in ["id", "type", "body"] {
            if !object.contains_key(required) {
                return Err(Error::Malformed(Malformed::InvalidPlaintext));
            }
        }
        if !object["id"].is_string() || !object["type"].is_string() {
            return Err(Error::Malformed(Malformed::InvalidPlaintext));
        }
        if let Some(typ) = object.get("typ") {
            if typ.as_str() != Some(MessageTyp::Plain.as_str()) {
                return Err(Error::Malformed(Malformed::InvalidPlaintext));
            }
        }
        serde_json::from_value(raw.clone()).map_err(|_| Malformed::InvalidPlaintext.into())
    }

    /// Serializes to the wire plaintext form, omitting absent optionals.
    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn minimal_plaintext_round_trips() {
        // Arrange
        let wire = r#"{"id":"1234567890","type":"http://example.com/protocols/lets_do_lunch/1.0/proposal","body":{}}"#;
        // Act
        let message = Message::from_wire(wire).unwrap();
        let reserialized = message.to_wire().unwrap();
        let reparsed = Message::from_wire(&reserialized).unwrap();
        // Assert
        assert_eq!(message, reparsed);
        assert_eq!(message.typ, MessageTyp::Plain);
        assert!(message.from.is_none());
    }

    #[test]
    fn missing_required_fields_fail() {
        for wire in [
            r#"{"type":"t","body":{}}"#,
            r#"{"id":"1","body":{}}"#,
            r#"{"id":"1","type":"t"}"#,
            r#"[1,2,3]"#,
        ] {
            let err = Message::from_wire(wire).unwrap_err();
            assert!(
                matches!(err, Error::Malformed(Malformed::InvalidPlaintext)),
                "unexpected error for {}: {:?}",
                wire,
                err
            );
        }
    }

    #[test]
    fn wrong_typ_fails() {
        let wire = r#"{"id":"1","typ":"application/didcomm-signed+json","type":"t","body":{}}"#;
        assert!(Message::from_wire(wire).is_err());
    }

    #[test]
    fn extra_headers_survive() {
        // Arrange
        let message = Message::new("1", "t", json!({}))
            .add_header_field("custom".into(), json!("value"));
        // Act
        let parsed = Message::from_wire(&message.to_wire().unwrap()).unwrap();
        // Assert
        assert_eq!(parsed.extra_headers["custom"], json!("value"));
    }
}
