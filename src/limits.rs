//! Limits and constraints for schema compilation and validation
//!
//! This module defines limits that bound the work done on malformed or
//! hostile input: grammar recursion depth and pattern count at compile time,
//! element nesting and attribute count while validating documents.

use serde::Deserialize;

use crate::error::{Error, RecursionError, Result};

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum nesting depth of the compile-time grammar walks, counting
    /// every pattern on the path, not only elements
    pub max_recursion_depth: usize,

    /// Maximum number of interned patterns in one grammar
    pub max_patterns: usize,

    /// Maximum element nesting depth in a validated document
    pub max_xml_depth: usize,

    /// Maximum number of attributes per element in a validated document
    pub max_attributes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_recursion_depth: 5_000,
            max_patterns: 1_000_000,
            max_xml_depth: 1000,
            max_attributes: 1000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_recursion_depth: 1000,
            max_patterns: 100_000,
            max_xml_depth: 100,
            max_attributes: 100,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_recursion_depth: 20_000,
            max_patterns: 100_000_000,
            max_xml_depth: 10_000,
            max_attributes: 10_000,
        }
    }

    /// Check if the grammar recursion depth is within limits
    pub fn check_recursion_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_recursion_depth {
            Err(RecursionError::DepthExceeded {
                depth,
                limit: self.max_recursion_depth,
            }
            .into())
        } else {
            Ok(())
        }
    }

    /// Check if the number of interned patterns is within limits
    pub fn check_patterns(&self, count: usize) -> Result<()> {
        if count > self.max_patterns {
            Err(Error::LimitExceeded(format!(
                "Pattern count {} exceeds maximum {}",
                count, self.max_patterns
            )))
        } else {
            Ok(())
        }
    }

    /// Check if document depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_xml_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if number of attributes is within limits
    pub fn check_attributes(&self, count: usize) -> Result<()> {
        if count > self.max_attributes {
            Err(Error::LimitExceeded(format!(
                "Attribute count {} exceeds maximum {}",
                count, self.max_attributes
            )))
        } else {
            Ok(())
        }
    }
}
