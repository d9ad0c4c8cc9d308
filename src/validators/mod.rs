//! Document validators
//!
//! This module contains the schema and validator façade shared by every
//! schema language the crate handles, and its implementations.

// Foundation
pub mod base;
pub mod exceptions;
pub mod validation;

// RELAX NG
pub mod content_model;
pub mod id_validator;
pub mod schemas;

// Delegated XML Schema
pub mod xsd;

// Re-exports
pub use base::{Attribute, Schema, Validator, ValidatorProperties};
pub use content_model::{ContentModel, ContentModelTracker, ElementModel};
pub use exceptions::{Diagnostic, DiagnosticCollector, ErrorHandler, ErrorLatch, Severity};
pub use id_validator::{IdTracker, IdValidator};
pub use schemas::{IdSchema, RelaxNgSchema, RelaxNgValidator, SchemaOptions};
pub use validation::ValidationContext;
pub use xsd::{
    DiagnosticSink, XsdAttribute, XsdEngine, XsdEngineConfig, XsdEnvironment, XsdName,
    XsdSchema, XsdSession, XsdValidator,
};
