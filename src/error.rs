/// Sub-codes for failures triggered by received (possibly adversarial or
/// corrupted) input. These are the only errors expected to surface from
/// `unpack` for well-behaved local configuration, and they deliberately do not
/// carry details such as which key failed to decrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Malformed {
    #[error("decryption failed for every candidate key")]
    CanNotDecrypt,
    #[error("signature is invalid")]
    InvalidSignature,
    #[error("plaintext message is invalid")]
    InvalidPlaintext,
    #[error("message is invalid")]
    InvalidMessage,
    #[error("forward protocol version is not supported")]
    UnsupportedForwardProtocol,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller-side misuse: syntactically invalid DID/DID-URL arguments or a
    /// mismatch between pack arguments and message headers.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("DID document not resolved: {0}")]
    DidDocNotResolved(String),
    #[error("DID URL not found: {0}")]
    DidUrlNotFound(String),
    #[error("secret not found: {0}")]
    SecretNotFound(String),
    #[error("no compatible crypto between sender and recipient keys")]
    IncompatibleCrypto,
    #[error("DID document is invalid: {0}")]
    InvalidDidDoc(String),
    #[error("malformed message: {0}")]
    Malformed(#[from] Malformed),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("crypto provider failure: {0}")]
    CryptoFailure(String),
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    Base64DecodeError(#[from] base64_url::base64::DecodeError),
    #[error(transparent)]
    StringConversionError(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// True for the terminal unpack outcomes of the received-input taxonomy.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::Malformed(_))
    }
}
