//! Per-document validation context
//!
//! State shared by every validator in this crate: the current location, the
//! element nesting level, the document limits and the error latch.

use super::exceptions::{Diagnostic, ErrorHandler, ErrorLatch};
use crate::error::Result;
use crate::limits::Limits;
use crate::locations::SourceLocation;

/// Validation context for one document
#[derive(Debug, Default)]
pub struct ValidationContext {
    /// Diagnostics sink and error flag
    latch: ErrorLatch,
    /// Location of the current event
    location: Option<SourceLocation>,
    /// Current element nesting level
    pub level: usize,
    /// Document limits
    pub limits: Limits,
    /// System identifier applied to locations without one
    pub system_id: Option<String>,
}

impl ValidationContext {
    /// Create a new validation context
    pub fn new(handler: Option<Box<dyn ErrorHandler>>) -> Self {
        Self {
            latch: ErrorLatch::new(handler),
            ..Self::default()
        }
    }

    /// Set the document limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the system identifier
    pub fn with_system_id(mut self, system_id: Option<String>) -> Self {
        self.system_id = system_id;
        self
    }

    /// Location of the current event
    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    /// Set the location of the current event
    pub fn set_location(&mut self, location: Option<SourceLocation>) {
        self.location = location.map(|mut loc| {
            if loc.system_id.is_none() {
                loc.system_id = self.system_id.clone();
            }
            loc
        });
    }

    /// Enter an element with `attribute_count` attributes, enforcing limits
    pub fn enter_level(&mut self, attribute_count: usize) -> Result<()> {
        self.level += 1;
        let checked = self
            .limits
            .check_xml_depth(self.level)
            .and_then(|_| self.limits.check_attributes(attribute_count));
        if let Err(e) = checked {
            self.fatal_error(e.to_string())?;
            return Err(e);
        }
        Ok(())
    }

    /// Exit the current element
    pub fn exit_level(&mut self) {
        if self.level > 0 {
            self.level -= 1;
        }
    }

    /// Clear the context for reuse
    pub fn clear(&mut self) {
        self.latch.reset();
        self.location = None;
        self.level = 0;
    }

    /// Whether an error was reported since the last clear
    pub fn had_error(&self) -> bool {
        self.latch.had_error()
    }

    /// Report an error at the current location
    pub fn error(&mut self, message: impl Into<String>) -> Result<()> {
        let location = self.location.clone();
        self.latch.error(message, location)
    }

    /// Report an error at `location`
    pub fn error_at(
        &mut self,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        self.latch.error(message, location)
    }

    /// Report a warning at `location`
    pub fn warning_at(
        &mut self,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        self.latch.warning(message, location)
    }

    /// Report a diagnostic that carries its own location
    pub fn report(&mut self, diagnostic: Diagnostic) -> Result<()> {
        self.latch.report(diagnostic)
    }

    /// Report a fatal error at the current location
    pub fn fatal_error(&mut self, message: impl Into<String>) -> Result<()> {
        let location = self.location.clone();
        self.latch.fatal_error(message, location)
    }
}
