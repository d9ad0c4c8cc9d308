//! Validation diagnostics
//!
//! This module contains the diagnostics reported while validating a document
//! and the handlers that receive them.

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::locations::SourceLocation;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Not an error; validity is unaffected
    Warning,
    /// The document is invalid; validation continues
    Error,
    /// The document is invalid and validation cannot continue
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        })
    }
}

/// A message about the validated document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// How serious the problem is
    pub severity: Severity,
    /// The message
    pub message: String,
    /// The document location the message refers to
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(
        severity: Severity,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            location,
        }
    }

    /// Create a warning
    pub fn warning(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::new(Severity::Warning, message, location)
    }

    /// Create an error
    pub fn error(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::new(Severity::Error, message, location)
    }

    /// Create a fatal error
    pub fn fatal(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::new(Severity::Fatal, message, location)
    }

    /// Whether the diagnostic makes the document invalid
    pub fn is_error(&self) -> bool {
        self.severity >= Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref loc) = self.location {
            write!(f, "{}: ", loc)?;
        }
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Receiver of validation diagnostics.
///
/// Returning an error from any method aborts validation of the document.
pub trait ErrorHandler: Send {
    /// A recoverable error
    fn error(&mut self, diagnostic: Diagnostic) -> Result<()>;

    /// A warning
    fn warning(&mut self, diagnostic: Diagnostic) -> Result<()> {
        let _ = diagnostic;
        Ok(())
    }

    /// A non-recoverable error
    fn fatal_error(&mut self, diagnostic: Diagnostic) -> Result<()> {
        Err(Error::Aborted(diagnostic))
    }
}

/// Forwards diagnostics to an optional handler and remembers whether an
/// error was reported
#[derive(Default)]
pub struct ErrorLatch {
    handler: Option<Box<dyn ErrorHandler>>,
    had_error: bool,
}

impl fmt::Debug for ErrorLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorLatch")
            .field("has_handler", &self.handler.is_some())
            .field("had_error", &self.had_error)
            .finish()
    }
}

impl ErrorLatch {
    /// Create a latch around `handler`
    pub fn new(handler: Option<Box<dyn ErrorHandler>>) -> Self {
        Self {
            handler,
            had_error: false,
        }
    }

    /// Whether an error or fatal error was reported since the last reset
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// Clear the error flag
    pub fn reset(&mut self) {
        self.had_error = false;
    }

    /// Report a diagnostic of any severity
    pub fn report(&mut self, diagnostic: Diagnostic) -> Result<()> {
        match diagnostic.severity {
            Severity::Warning => self.warning(diagnostic.message, diagnostic.location),
            Severity::Error => self.error(diagnostic.message, diagnostic.location),
            Severity::Fatal => self.fatal_error(diagnostic.message, diagnostic.location),
        }
    }

    /// Report an error
    pub fn error(
        &mut self,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        self.had_error = true;
        match self.handler {
            Some(ref mut handler) => handler.error(Diagnostic::error(message, location)),
            None => Ok(()),
        }
    }

    /// Report a warning
    pub fn warning(
        &mut self,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        match self.handler {
            Some(ref mut handler) => handler.warning(Diagnostic::warning(message, location)),
            None => Ok(()),
        }
    }

    /// Report a fatal error
    pub fn fatal_error(
        &mut self,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        self.had_error = true;
        match self.handler {
            Some(ref mut handler) => handler.fatal_error(Diagnostic::fatal(message, location)),
            None => Ok(()),
        }
    }
}

/// An error handler that stores every diagnostic.
///
/// Clones share storage, so a caller can keep one clone and hand another to
/// a validator.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollector {
    diagnostics: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the diagnostics collected so far
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// Diagnostics that make the document invalid
    pub fn errors(&self) -> Vec<Diagnostic> {
        self.diagnostics()
            .into_iter()
            .filter(Diagnostic::is_error)
            .collect()
    }

    /// Warnings only
    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.diagnostics()
            .into_iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect()
    }

    /// Remove all collected diagnostics
    pub fn clear(&self) {
        if let Ok(mut d) = self.diagnostics.lock() {
            d.clear();
        }
    }

    /// Boxed clone, ready to pass as a validator's error handler
    pub fn handler(&self) -> Box<dyn ErrorHandler> {
        Box::new(self.clone())
    }

    fn push(&self, diagnostic: Diagnostic) {
        if let Ok(mut d) = self.diagnostics.lock() {
            d.push(diagnostic);
        }
    }
}

impl ErrorHandler for DiagnosticCollector {
    fn error(&mut self, diagnostic: Diagnostic) -> Result<()> {
        self.push(diagnostic);
        Ok(())
    }

    fn warning(&mut self, diagnostic: Diagnostic) -> Result<()> {
        self.push(diagnostic);
        Ok(())
    }

    fn fatal_error(&mut self, diagnostic: Diagnostic) -> Result<()> {
        self.push(diagnostic.clone());
        Err(Error::Aborted(diagnostic))
    }
}
