//! RELAX NG pattern algebra
//!
//! This module contains the hash-consed pattern arena and everything that
//! runs over it once at schema compile time:
//! - [`SchemaPatternBuilder`]: the factory and intern table
//! - expansion of references ([`SchemaPatternBuilder::expand`])
//! - the recursion guard ([`SchemaPatternBuilder::check_recursion`])
//! - the [`RestrictionChecker`] with its [`Alphabet`] and
//!   [`DuplicateAttributeDetector`] helpers
//! - the [`IdTypeMap`] of ID-typed attributes and elements

pub mod alphabet;
pub mod builder;
pub mod content_type;
pub mod duplicate_attributes;
mod expand;
pub mod graph;
pub mod id_type_map;
pub mod name_class;
pub mod node;
mod recursion;
pub mod restrictions;

pub use alphabet::Alphabet;
pub use builder::SchemaPatternBuilder;
pub use content_type::ContentType;
pub use duplicate_attributes::DuplicateAttributeDetector;
pub use graph::{ElementSlot, PatternGraph};
pub use id_type_map::{IdType, IdTypeMap};
pub use name_class::NameClass;
pub use node::{
    AnnotationElement, Annotations, Datatype, DefineId, ElementId, Param, Pattern, PatternId,
    PatternKind,
};
pub use restrictions::{Context, RestrictionChecker};
