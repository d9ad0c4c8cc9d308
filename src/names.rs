//! XML name validation and utilities
//!
//! NCName checks and the whitespace handling used for ID, IDREF and IDREFS
//! values.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

// NameStartChar and NameChar without the colon, per Namespaces in XML
static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^[A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}",
        r"\u{200C}-\u{200D}\u{2070}-\u{218F}\u{2C00}-\u{2FEF}\u{3001}-\u{D7FF}",
        r"\u{F900}-\u{FDCF}\u{FDF0}-\u{FFFD}\u{10000}-\u{EFFFF}]",
        r"[A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}",
        r"\u{200C}-\u{200D}\u{2070}-\u{218F}\u{2C00}-\u{2FEF}\u{3001}-\u{D7FF}",
        r"\u{F900}-\u{FDCF}\u{FDF0}-\u{FFFD}\u{10000}-\u{EFFFF}",
        r"\-\.0-9\u{B7}\u{300}-\u{36F}\u{203F}-\u{2040}]*$",
    ))
    .expect("NCName pattern is valid")
});

/// XML whitespace characters (S production)
pub fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Check if a string consists only of XML whitespace
pub fn is_whitespace_only(text: &str) -> bool {
    text.chars().all(is_xml_whitespace)
}

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// Check if a string is a valid QName (qualified name)
pub fn is_valid_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_valid_ncname(prefix) && is_valid_ncname(local),
        None => is_valid_ncname(name),
    }
}

/// Validate an NCName and return an error if invalid
pub fn validate_ncname(name: &str) -> Result<()> {
    if is_valid_ncname(name) {
        Ok(())
    } else {
        Err(Error::Name(format!("Invalid NCName: '{}'", name)))
    }
}

/// Split a QName into prefix and local name
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = qname.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, qname)
    }
}

/// Split a whitespace-separated list into tokens
pub fn tokens(value: &str) -> impl Iterator<Item = &str> {
    value.split(is_xml_whitespace).filter(|t| !t.is_empty())
}

/// Normalize a single-token value: strip surrounding whitespace and reject
/// anything that is not exactly one token.
pub fn single_token(value: &str) -> Option<&str> {
    let mut iter = tokens(value);
    let first = iter.next()?;
    if iter.next().is_some() {
        None
    } else {
        Some(first)
    }
}
