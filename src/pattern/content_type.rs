//! Content types of patterns
//!
//! RELAX NG (section 7.2) classifies every pattern as empty, complex or
//! simple content, and only lets `group`, `interleave` and `oneOrMore` combine
//! groupable content types. Text is tracked separately as mixed content so
//! that interleaving two text-bearing branches can be rejected.
//!
//! `Simple` ranks highest so that it absorbs everything it is combined with:
//! a group of data and an element then stays `Simple` and fails the
//! groupable check, as the RELAX NG content-type table requires.

use serde::Serialize;
use std::fmt;

/// Content type of a pattern.
///
/// The ordering is the combination rank: a composite pattern takes the
/// maximum of its children's content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ContentType {
    /// Nothing observable (attributes, `empty`, `notAllowed`)
    Empty,
    /// Element content
    Complex,
    /// Element content interleaved with text
    Mixed,
    /// A single data value (`data`, `value`, `list`)
    Simple,
}

impl ContentType {
    /// Combine the content types of two children
    pub fn combine(self, other: ContentType) -> ContentType {
        self.max(other)
    }

    /// Check whether two content types may appear side by side in a
    /// `group`, `interleave` or repeated `oneOrMore`
    pub fn groupable(self, other: ContentType) -> bool {
        if self == ContentType::Empty || other == ContentType::Empty {
            return true;
        }
        self != ContentType::Simple && other != ContentType::Simple
    }

    /// Whether character data is allowed where this content type applies
    pub fn allows_text(self) -> bool {
        matches!(self, ContentType::Mixed | ContentType::Simple)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentType::Empty => "empty",
            ContentType::Complex => "complex",
            ContentType::Mixed => "mixed",
            ContentType::Simple => "simple",
        };
        f.write_str(name)
    }
}
