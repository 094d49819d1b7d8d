use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Error, Result};

/// Matches a bare DID with an optional path/query/fragment tail.
/// Method-specific identifiers may be `:`-separated (e.g. `did:web` paths).
static DID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^
        (?P<did>
            did             # scheme
            :
            [a-z0-9]+       # method
            :
            (?:[a-zA-Z0-9.\-_%]*:)*     # optional sub-identifiers, ':' separated
            [a-zA-Z0-9.\-_%]+           # method specific identifier
        )
        (?:/[^?\#]*)?       # optional path
        (?:\?[^\#]*)?       # optional query
        (?:\#(?P<fragment>.+))?     # optional fragment
        $
    ",
    )
    .expect("static regex is valid")
});

/// Splits an identifier into its DID part and optional `#fragment` part.
/// Returns `None` when the input is not a DID or DID-URL at all.
pub fn did_or_url(value: &str) -> Option<(&str, Option<&str>)> {
    let captures = DID_RE.captures(value)?;
    let did = captures.name("did")?;
    let fragment = captures.name("fragment");
    Some((
        &value[did.start()..did.end()],
        fragment.map(|f| &value[f.start()..f.end()]),
    ))
}

/// True for a bare DID without path, query or fragment.
pub fn is_did(value: &str) -> bool {
    matches!(did_or_url(value), Some((did, None)) if did == value)
}

/// True for a DID-URL with a non-empty fragment.
pub fn is_did_url(value: &str) -> bool {
    matches!(did_or_url(value), Some((_, Some(_))))
}

/// Extracts the DID part of a DID or DID-URL, erroring on anything else.
pub fn did_of(value: &str) -> Result<&str> {
    did_or_url(value)
        .map(|(did, _)| did)
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' is not a DID or DID-URL", value)))
}

/// Validates that `value` is a DID or DID-URL usable as a pack target.
pub fn ensure_did_or_url(value: &str) -> Result<()> {
    if did_or_url(value).is_some() {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "'{}' is not a DID or DID-URL",
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_did_and_fragment() {
        // Arrange
        let url = "did:example:alice#key-x25519-1";
        // Act
        let (did, fragment) = did_or_url(url).unwrap();
        // Assert
        assert_eq!(did, "did:example:alice");
        assert_eq!(fragment, Some("key-x25519-1"));
    }

    #[test]
    fn bare_did_has_no_fragment() {
        let (did, fragment) = did_or_url("did:example:alice").unwrap();
        assert_eq!(did, "did:example:alice");
        assert!(fragment.is_none());
        assert!(is_did("did:example:alice"));
        assert!(!is_did_url("did:example:alice"));
    }

    #[test]
    fn rejects_non_did() {
        assert!(did_or_url("not-a-did").is_none());
        assert!(did_or_url("did:").is_none());
        assert!(did_or_url("http://example.com").is_none());
        assert!(ensure_did_or_url("banana").is_err());
    }

    #[test]
    fn empty_fragment_is_not_a_did_url() {
        assert!(!is_did_url("did:example:alice#"));
    }

    #[test]
    fn multi_segment_method_id() {
        let (did, fragment) = did_or_url("did:elem:ropsten:EiAS3mqC#primary").unwrap();
        assert_eq!(did, "did:elem:ropsten:EiAS3mqC");
        assert_eq!(fragment, Some("primary"));
    }
}
