use log::debug;

use crate::{messages::Message, Result};

/// Result details of [`pack_plaintext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackPlaintextMetadata {
    /// Issuer kid of the `from_prior` JWT carried by the message, when any.
    pub from_prior_issuer_kid: Option<String>,
}

/// Serializes a message without any protection layer. The output is readable
/// and modifiable by anyone on the path; use it only over channels that are
/// already authenticated and confidential.
pub fn pack_plaintext(msg: &Message) -> Result<(String, PackPlaintextMetadata)> {
    super::validate_pack_message(msg, None, None)?;
    let from_prior_issuer_kid = super::from_prior_issuer_kid(msg)?;
    let wire = msg.to_wire()?;
    debug!("packed plaintext message {}", msg.id);
    Ok((wire, PackPlaintextMetadata { from_prior_issuer_kid }))
}
