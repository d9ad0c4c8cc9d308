//! # xml-suggest
//!
//! The schema core of an XML editing assistant: a hash-consed RELAX NG
//! pattern algebra with the section 7 restriction checks, ID/IDREF typing,
//! and a validator façade that also fronts a delegated XML Schema engine.
//!
//! ## Features
//!
//! - Hash-consed pattern arena with simplifying constructors
//! - Reference expansion with recursion and resource limits
//! - RELAX NG restriction checking with stable error codes
//! - ID/IDREF/IDREFS type map and document-level integrity checks
//! - Content-model tracking for suggestions
//! - Streaming validation of documents through `quick-xml`
//!
//! ## Example
//!
//! ```rust
//! use xmlsuggest::pattern::{NameClass, SchemaPatternBuilder};
//! use xmlsuggest::validators::{Schema, SchemaOptions, ValidatorProperties};
//! use xmlsuggest::documents::validate_str;
//!
//! let mut builder = SchemaPatternBuilder::new();
//! let text = builder.make_text();
//! let greeting = builder.make_element(NameClass::local("greeting"), text, None);
//! let schema = builder.compile(greeting, &SchemaOptions::default())?;
//!
//! let mut validator = schema.create_validator(ValidatorProperties::new());
//! assert!(validate_str("<greeting>hello</greeting>", validator.as_mut())?);
//! # Ok::<(), xmlsuggest::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod locations;
pub mod names;
pub mod namespaces;

// Patterns and validation
pub mod documents;
pub mod pattern;
pub mod validators;

// Re-exports for convenience
pub use error::{Error, RecursionError, RestrictionViolation, Result};
pub use limits::Limits;
pub use locations::SourceLocation;
pub use pattern::{NameClass, PatternId, SchemaPatternBuilder};
pub use validators::{RelaxNgSchema, Schema, SchemaOptions, Validator};

/// Version of the xml-suggest library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// XML Schema datatype library namespace
pub const XSD_DATATYPES_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-datatypes";

/// RELAX NG DTD compatibility datatype library namespace
pub const COMPATIBILITY_DATATYPES_NAMESPACE: &str =
    "http://relaxng.org/ns/compatibility/datatypes/1.0";
