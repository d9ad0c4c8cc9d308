//! Error types for xml-suggest
//!
//! This module defines the error types used throughout the library. Schema
//! compilation fails with the first [`RestrictionViolation`] or
//! [`RecursionError`] it meets; document validation reports through an
//! error handler and only surfaces [`Error::Aborted`] for fatal diagnostics.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::locations::SourceLocation;
use crate::validators::exceptions::Diagnostic;

/// Result type alias using the crate [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xml-suggest operations
#[derive(Error, Debug)]
pub enum Error {
    /// A RELAX NG restriction (RELAX NG section 7) was violated
    #[error("restriction violation: {0}")]
    Restriction(#[from] RestrictionViolation),

    /// A definition expands to itself without an intervening element
    #[error("recursion error: {0}")]
    Recursion(#[from] RecursionError),

    /// A `ref` names a definition that was never defined
    #[error("reference to undefined pattern \"{name}\"{}", fmt_location(.location))]
    UndefinedReference {
        /// The definition name
        name: String,
        /// Where the reference appeared
        location: Option<SourceLocation>,
    },

    /// Schema construction error that is not a restriction violation
    #[error("schema error: {0}")]
    Schema(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Name error (invalid XML name)
    #[error("name error: {0}")]
    Name(String),

    /// XML parsing error raised by the document driver
    #[error("XML error: {0}")]
    Xml(String),

    /// Configuration could not be read
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document validation was aborted by a fatal diagnostic or by the error handler
    #[error("validation aborted: {0}")]
    Aborted(Diagnostic),
}

fn fmt_location(location: &Option<SourceLocation>) -> String {
    location
        .as_ref()
        .map(|loc| format!(" at {}", loc))
        .unwrap_or_default()
}

/// A violated RELAX NG restriction.
///
/// `code` is a stable machine-readable tag such as `start_contains_attribute`.
/// The location is filled by the innermost enclosing pattern that knows one,
/// see [`RestrictionViolation::maybe_set_location`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestrictionViolation {
    code: &'static str,
    location: Option<SourceLocation>,
}

impl RestrictionViolation {
    /// Create a violation without a location
    pub fn new(code: &'static str) -> Self {
        Self {
            code,
            location: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Fill in the location unless one is already present
    pub fn maybe_set_location(&mut self, location: Option<&SourceLocation>) {
        if self.location.is_none() {
            self.location = location.cloned();
        }
    }

    /// The machine-readable violation code
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// The location of the offending pattern, if known
    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    /// Human-readable description of the violation
    pub fn message(&self) -> &'static str {
        match self.code {
            "start_contains_attribute" => "found attribute in start pattern",
            "start_contains_data" => "found data in start pattern",
            "start_contains_empty" => "found empty in start pattern",
            "start_contains_group" => "found group in start pattern",
            "start_contains_interleave" => "found interleave in start pattern",
            "start_contains_list" => "found list in start pattern",
            "start_contains_one_or_more" => "found oneOrMore in start pattern",
            "start_contains_text" => "found text in start pattern",
            "start_contains_value" => "found value in start pattern",
            "open_name_class_not_repeated" => {
                "attribute with an open name class must be repeated with oneOrMore"
            }
            "one_or_more_contains_group_contains_attribute" => {
                "oneOrMore contains group contains attribute"
            }
            "one_or_more_contains_interleave_contains_attribute" => {
                "oneOrMore contains interleave contains attribute"
            }
            "list_contains_attribute" => "list contains attribute",
            "list_contains_element" => "list contains element",
            "list_contains_interleave" => "list contains interleave",
            "list_contains_list" => "list contains list",
            "list_contains_text" => "list contains text",
            "attribute_contains_attribute" => "attribute contains attribute",
            "attribute_contains_element" => "attribute contains element",
            "data_except_contains_attribute" => "data/except contains attribute",
            "data_except_contains_element" => "data/except contains element",
            "data_except_contains_empty" => "data/except contains empty",
            "data_except_contains_group" => "data/except contains group",
            "data_except_contains_interleave" => "data/except contains interleave",
            "data_except_contains_list" => "data/except contains list",
            "data_except_contains_one_or_more" => "data/except contains oneOrMore",
            "data_except_contains_text" => "data/except contains text",
            "duplicate_attribute" => "duplicate attribute",
            "xmlns_attribute_name" => "attribute name must not be xmlns or in the xmlns namespace",
            "group_string" => "group of string or data element",
            "interleave_string" => "interleave of string or data element",
            "one_or_more_string" => "repeat of string or data element",
            "interleave_element_overlap" => {
                "overlapping element names in operands of interleave"
            }
            "interleave_text_overlap" => "both operands of interleave contain text",
            "id_element_name_class" => {
                "element with attribute of type ID/IDREF/IDREFS must have a simple name"
            }
            "id_attribute_name_class" => {
                "attribute of type ID/IDREF/IDREFS must have a simple name"
            }
            "id_type_conflict" => "conflicting ID types for the same attribute",
            "id_parent" => "datatype ID/IDREF/IDREFS must be the whole value of an attribute or element",
            _ => "restriction violated",
        }
    }
}

impl fmt::Display for RestrictionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code)?;
        if let Some(ref loc) = self.location {
            write!(f, " at {}", loc)?;
        }
        Ok(())
    }
}

impl std::error::Error for RestrictionViolation {}

/// Unbounded recursion through named definitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecursionError {
    /// The definition reaches itself without passing through an element
    RecursiveReference {
        /// The definition name
        name: String,
        /// Where the offending reference appeared
        location: Option<SourceLocation>,
    },
    /// Element nesting in the grammar exceeded the configured maximum
    DepthExceeded {
        /// The depth that was reached
        depth: usize,
        /// The configured maximum
        limit: usize,
    },
}

impl fmt::Display for RecursionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecursiveReference { name, location } => {
                write!(f, "bad recursive reference to pattern \"{}\"", name)?;
                if let Some(loc) = location {
                    write!(f, " at {}", loc)?;
                }
                Ok(())
            }
            Self::DepthExceeded { depth, limit } => write!(
                f,
                "grammar recursion depth {} exceeds maximum {}",
                depth, limit
            ),
        }
    }
}

impl std::error::Error for RecursionError {}
