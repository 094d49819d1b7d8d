mod encrypted;
mod plaintext;
mod signed;

pub use encrypted::*;
pub use plaintext::*;
pub use signed::*;

use crate::{
    dids::{did_of, ensure_did_or_url},
    messages::{FromPrior, Message},
    Error, Result,
};

/// Shared validation for every pack entry point: header identifiers must be
/// syntactically valid, and an explicit pack argument must agree with the
/// corresponding message header's DID portion.
pub(crate) fn validate_pack_message(
    msg: &Message,
    to: Option<&str>,
    from: Option<&str>,
) -> Result<()> {
    if let Some(header_to) = &msg.to {
        for entry in header_to {
            ensure_did_or_url(entry)?;
        }
    }
    if let Some(header_from) = &msg.from {
        ensure_did_or_url(header_from)?;
    }

    if let Some(to) = to {
        ensure_did_or_url(to)?;
        if let Some(header_to) = &msg.to {
            let to_did = did_of(to)?;
            let matched = header_to
                .iter()
                .any(|entry| did_of(entry).map(|did| did == to_did).unwrap_or(false));
            if !matched {
                return Err(Error::InvalidArgument(format!(
                    "'to' argument {} does not match the message 'to' header",
                    to
                )));
            }
        }
    }
    if let Some(from) = from {
        ensure_did_or_url(from)?;
        if let Some(header_from) = &msg.from {
            if did_of(from)? != did_of(header_from)? {
                return Err(Error::InvalidArgument(format!(
                    "'from' argument {} does not match the message 'from' header",
                    from
                )));
            }
        }
    }
    Ok(())
}

/// Issuer kid of a message's `from_prior` JWT, validating its shape on the
/// way. `None` when the message carries no `from_prior`.
pub(crate) fn from_prior_issuer_kid(msg: &Message) -> Result<Option<String>> {
    match &msg.from_prior {
        Some(jwt) => FromPrior::issuer_kid(jwt).map(Some),
        None => Ok(None),
    }
}
