//! Source locations
//!
//! Locations of grammar constructs (reported with restriction violations) and
//! of document events (reported with validation diagnostics).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in a schema or document source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// System identifier (file name or URI) of the source, if known
    pub system_id: Option<String>,
    /// 1-based line number
    pub line: usize,
    /// 1-based column number
    pub column: usize,
}

impl SourceLocation {
    /// Create a new location
    pub fn new(system_id: Option<impl Into<String>>, line: usize, column: usize) -> Self {
        Self {
            system_id: system_id.map(|s| s.into()),
            line,
            column,
        }
    }

    /// Compute the line and column of a byte offset within `text`
    pub fn from_offset(system_id: Option<&str>, text: &str, offset: usize) -> Self {
        let offset = offset.min(text.len());
        let before = text.get(..offset).unwrap_or(text);
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        Self {
            system_id: system_id.map(String::from),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.system_id {
            Some(id) => write!(f, "{}:{}:{}", id, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = SourceLocation::new(Some("doc.xml"), 4, 2);
        assert_eq!(loc.to_string(), "doc.xml:4:2");

        let loc = SourceLocation::new(None::<String>, 1, 10);
        assert_eq!(loc.to_string(), "1:10");
    }

    #[test]
    fn test_location_from_offset() {
        let text = "<a>\n  <b/>\n</a>";
        let loc = SourceLocation::from_offset(None, text, 6);
        assert_eq!((loc.line, loc.column), (2, 3));

        let loc = SourceLocation::from_offset(Some("x.xml"), text, 0);
        assert_eq!((loc.line, loc.column), (1, 1));
        assert_eq!(loc.system_id.as_deref(), Some("x.xml"));
    }

    #[test]
    fn test_location_from_offset_past_end() {
        let loc = SourceLocation::from_offset(None, "ab", 99);
        assert_eq!((loc.line, loc.column), (1, 3));
    }
}
