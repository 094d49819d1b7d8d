//! DIDComm v2 envelope protocol: pack and unpack plaintext, signed and
//! encrypted messages, with forward routing support for mediated delivery.
//!
//! Cryptography is pluggable through [`crypto::CryptoProvider`]; the
//! `raw-crypto` feature (on by default) ships a RustCrypto-backed provider.
//! DID and secret resolution are pluggable through [`dids::DidResolver`] and
//! [`secrets::SecretsResolver`].

pub mod crypto;
pub mod dids;
pub mod envelopes;
mod error;
pub mod keyselect;
pub mod messages;
pub mod pack;
mod result;
pub mod routing;
pub mod secrets;
pub mod unpack;

pub use error::{Error, Malformed};
pub use messages::Message;
pub use pack::{
    pack_encrypted, pack_plaintext, pack_signed, PackEncryptedMetadata, PackEncryptedOptions,
    PackPlaintextMetadata, PackSignedMetadata,
};
pub use result::Result;
pub use unpack::{unpack, UnpackMetadata, UnpackOptions};
