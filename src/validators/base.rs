//! Base validator infrastructure
//!
//! This module provides the [`Schema`] and [`Validator`] traits shared by the
//! RELAX NG, ID-only and XML Schema implementations.

use std::fmt;

use super::content_model::ContentModelTracker;
use super::exceptions::ErrorHandler;
use crate::error::Result;
use crate::locations::SourceLocation;
use crate::namespaces::QName;

/// An attribute of a start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Resolved name
    pub name: QName,
    /// Name as written, with its prefix
    pub qname: String,
    /// Normalized value
    pub value: String,
}

impl Attribute {
    /// Create an attribute
    pub fn new(name: QName, qname: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name,
            qname: qname.into(),
            value: value.into(),
        }
    }

    /// Create an unprefixed attribute in no namespace
    pub fn local(name: &str, value: impl Into<String>) -> Self {
        Self::new(QName::local(name), name, value)
    }
}

/// Per-validator settings
#[derive(Default)]
pub struct ValidatorProperties {
    /// Receiver of diagnostics; without one, only [`Validator::had_error`]
    /// reports the outcome
    pub error_handler: Option<Box<dyn ErrorHandler>>,
    /// System identifier of the validated document, used in locations
    pub system_id: Option<String>,
}

impl fmt::Debug for ValidatorProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorProperties")
            .field("error_handler", &self.error_handler.is_some())
            .field("system_id", &self.system_id)
            .finish()
    }
}

impl ValidatorProperties {
    /// Create empty properties
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the error handler
    pub fn with_error_handler(mut self, handler: Box<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Set the document system identifier
    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = Some(system_id.into());
        self
    }
}

/// A compiled, immutable schema.
///
/// One schema can serve any number of validators on any number of threads.
pub trait Schema: Send + Sync + fmt::Debug {
    /// Create a validator for one document
    fn create_validator(&self, properties: ValidatorProperties) -> Box<dyn Validator>;
}

/// Per-document validation state driven by document events.
///
/// Every event may report diagnostics to the error handler; an `Err` return
/// means validation of the document was aborted.
pub trait Validator: Send + fmt::Debug {
    /// Set the location of the next event
    fn set_location(&mut self, location: Option<SourceLocation>);

    /// Start of the document
    fn start_document(&mut self) -> Result<()>;

    /// End of the document
    fn end_document(&mut self) -> Result<()>;

    /// A namespace declaration; an empty `uri` undeclares `prefix`
    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()>;

    /// End of a namespace declaration's scope
    fn end_prefix_mapping(&mut self, prefix: &str) -> Result<()>;

    /// A start tag
    fn start_element(&mut self, name: &QName, qname: &str, attributes: &[Attribute])
        -> Result<()>;

    /// An end tag
    fn end_element(&mut self, name: &QName, qname: &str) -> Result<()>;

    /// Character data
    fn characters(&mut self, text: &str) -> Result<()>;

    /// Whitespace in element-only content
    fn ignorable_whitespace(&mut self, text: &str) -> Result<()> {
        let _ = text;
        Ok(())
    }

    /// An unparsed entity declared in the document type declaration
    fn unparsed_entity_decl(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: &str,
        notation: &str,
    ) -> Result<()> {
        let _ = (name, public_id, system_id, notation);
        Ok(())
    }

    /// Whether an error was reported since the last reset
    fn had_error(&self) -> bool;

    /// Prepare the validator for another document
    fn reset(&mut self);

    /// Content-model state at the current position, if the validator tracks it
    fn content_model(&self) -> Option<&ContentModelTracker> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::DiagnosticCollector;

    #[test]
    fn test_attribute_local() {
        let attr = Attribute::local("id", "x1");
        assert_eq!(attr.name, QName::local("id"));
        assert_eq!(attr.qname, "id");
        assert_eq!(attr.value, "x1");
    }

    #[test]
    fn test_properties_builder() {
        let props = ValidatorProperties::new()
            .with_system_id("doc.xml")
            .with_error_handler(DiagnosticCollector::new().handler());
        assert!(props.error_handler.is_some());
        assert_eq!(props.system_id.as_deref(), Some("doc.xml"));
        assert!(format!("{:?}", props).contains("doc.xml"));
    }
}
