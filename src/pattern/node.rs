//! Pattern nodes
//!
//! Patterns live in an arena and refer to each other by [`PatternId`]. Element
//! patterns refer to an element slot by [`ElementId`] and references refer to a
//! named definition by [`DefineId`], so recursive grammars never need owning
//! cycles.

use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::content_type::ContentType;
use super::name_class::NameClass;
use crate::namespaces::QName;

/// Index of an interned pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PatternId(pub(crate) u32);

impl PatternId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of an element slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a named definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DefineId(pub(crate) u32);

impl DefineId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A datatype reference: library URI plus local type name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Datatype {
    /// Datatype library URI ("" for the built-in library)
    pub library: String,
    /// Type name within the library
    pub name: String,
}

impl Datatype {
    /// Create a datatype reference
    pub fn new(library: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            name: name.into(),
        }
    }

    /// The built-in `string` type
    pub fn string() -> Self {
        Self::new("", "string")
    }

    /// The built-in `token` type
    pub fn token() -> Self {
        Self::new("", "token")
    }

    /// A type from the XML Schema datatype library
    pub fn xsd(name: impl Into<String>) -> Self {
        Self::new(crate::XSD_DATATYPES_NAMESPACE, name)
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.library.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{{{}}}{}", self.library, self.name)
        }
    }
}

/// A datatype parameter (facet)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Param {
    /// Parameter name, such as `maxLength`
    pub name: String,
    /// Parameter value
    pub value: String,
}

impl Param {
    /// Create a parameter
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A foreign element attached to a pattern, kept for documentation and
/// suggestion display
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnnotationElement {
    /// Qualified name of the foreign element
    pub name: QName,
    /// Its text content
    pub text: String,
}

/// Annotations carried by attribute and element patterns
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Annotations {
    /// Annotations appearing as children of the pattern
    pub child: Vec<AnnotationElement>,
    /// Annotations following the pattern
    pub following: Vec<AnnotationElement>,
}

impl Annotations {
    /// Whether there are no annotations
    pub fn is_empty(&self) -> bool {
        self.child.is_empty() && self.following.is_empty()
    }

    /// Text of the first child annotation, usually documentation
    pub fn documentation(&self) -> Option<&str> {
        self.child.first().map(|a| a.text.as_str())
    }
}

/// Kind-specific payload of a pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// `empty`
    Empty,
    /// `notAllowed`
    NotAllowed,
    /// `text`
    Text,
    /// `p1 | p2`
    Choice(PatternId, PatternId),
    /// `p1 , p2`
    Group(PatternId, PatternId),
    /// `p1 & p2`
    Interleave(PatternId, PatternId),
    /// `p+`
    OneOrMore(PatternId),
    /// `list { p }`
    List(PatternId),
    /// A datatype with parameters
    Data {
        /// Datatype library and name
        datatype: Datatype,
        /// Facets, in declaration order
        params: Vec<Param>,
    },
    /// A datatype minus the values matched by `except`
    DataExcept {
        /// Datatype library and name
        datatype: Datatype,
        /// Facets, in declaration order
        params: Vec<Param>,
        /// Values to exclude
        except: PatternId,
    },
    /// A single value of a datatype
    Value {
        /// Datatype library and name
        datatype: Datatype,
        /// The lexical value
        value: String,
    },
    /// An attribute
    Attribute {
        /// Names the attribute matches
        name_class: NameClass,
        /// Pattern for the attribute value
        value: PatternId,
        /// Foreign annotations on the attribute pattern
        annotations: Annotations,
    },
    /// An element, identified by its slot
    Element(ElementId),
    /// A reference to a named definition, resolved lazily
    Ref(DefineId),
}

// Hash seeds, one per kind
const EMPTY_HASH_CODE: u64 = 1;
const NOT_ALLOWED_HASH_CODE: u64 = 2;
const TEXT_HASH_CODE: u64 = 3;
const CHOICE_HASH_CODE: u64 = 11;
const GROUP_HASH_CODE: u64 = 13;
const INTERLEAVE_HASH_CODE: u64 = 17;
const ONE_OR_MORE_HASH_CODE: u64 = 19;
const LIST_HASH_CODE: u64 = 23;
const DATA_HASH_CODE: u64 = 29;
const DATA_EXCEPT_HASH_CODE: u64 = 31;
const VALUE_HASH_CODE: u64 = 37;
const ATTRIBUTE_HASH_CODE: u64 = 41;
const ELEMENT_HASH_CODE: u64 = 43;
const REF_HASH_CODE: u64 = 47;

/// Mix a kind code with the hashes of a node's parts.
///
/// Deterministic across runs, and sensitive to both kind and order.
pub fn combine_hash(kind_code: u64, parts: &[u64]) -> u64 {
    let mut hasher = DefaultHasher::new();
    kind_code.hash(&mut hasher);
    for part in parts {
        part.hash(&mut hasher);
    }
    hasher.finish()
}

fn value_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// An interned pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    kind: PatternKind,
    nullable: bool,
    content_type: ContentType,
    hash: u64,
}

impl Pattern {
    /// Build a node. `child` returns the already interned node for an id.
    pub(crate) fn new<'a>(kind: PatternKind, child: impl Fn(PatternId) -> &'a Pattern) -> Self {
        let (nullable, content_type, hash) = match &kind {
            PatternKind::Empty => (true, ContentType::Empty, combine_hash(EMPTY_HASH_CODE, &[])),
            PatternKind::NotAllowed => (
                false,
                ContentType::Empty,
                combine_hash(NOT_ALLOWED_HASH_CODE, &[]),
            ),
            PatternKind::Text => (true, ContentType::Mixed, combine_hash(TEXT_HASH_CODE, &[])),
            PatternKind::Choice(a, b) => {
                let (a, b) = (child(*a), child(*b));
                (
                    a.nullable || b.nullable,
                    a.content_type.combine(b.content_type),
                    combine_hash(CHOICE_HASH_CODE, &[a.hash, b.hash]),
                )
            }
            PatternKind::Group(a, b) => {
                let (a, b) = (child(*a), child(*b));
                (
                    a.nullable && b.nullable,
                    a.content_type.combine(b.content_type),
                    combine_hash(GROUP_HASH_CODE, &[a.hash, b.hash]),
                )
            }
            PatternKind::Interleave(a, b) => {
                let (a, b) = (child(*a), child(*b));
                (
                    a.nullable && b.nullable,
                    a.content_type.combine(b.content_type),
                    combine_hash(INTERLEAVE_HASH_CODE, &[a.hash, b.hash]),
                )
            }
            PatternKind::OneOrMore(p) => {
                let p = child(*p);
                (
                    p.nullable,
                    p.content_type,
                    combine_hash(ONE_OR_MORE_HASH_CODE, &[p.hash]),
                )
            }
            PatternKind::List(p) => (
                false,
                ContentType::Simple,
                combine_hash(LIST_HASH_CODE, &[child(*p).hash]),
            ),
            PatternKind::Data { datatype, params } => (
                false,
                ContentType::Simple,
                combine_hash(DATA_HASH_CODE, &[value_hash(datatype), value_hash(params)]),
            ),
            PatternKind::DataExcept {
                datatype,
                params,
                except,
            } => (
                false,
                ContentType::Simple,
                combine_hash(
                    DATA_EXCEPT_HASH_CODE,
                    &[value_hash(datatype), value_hash(params), child(*except).hash],
                ),
            ),
            PatternKind::Value { datatype, value } => (
                false,
                ContentType::Simple,
                combine_hash(VALUE_HASH_CODE, &[value_hash(datatype), value_hash(value)]),
            ),
            PatternKind::Attribute {
                name_class,
                value,
                annotations,
            } => (
                false,
                ContentType::Empty,
                combine_hash(
                    ATTRIBUTE_HASH_CODE,
                    &[
                        value_hash(name_class),
                        child(*value).hash,
                        value_hash(annotations),
                    ],
                ),
            ),
            PatternKind::Element(id) => (
                false,
                ContentType::Complex,
                combine_hash(ELEMENT_HASH_CODE, &[u64::from(id.0)]),
            ),
            // Placeholder until expansion replaces the reference
            PatternKind::Ref(id) => (
                false,
                ContentType::Empty,
                combine_hash(REF_HASH_CODE, &[u64::from(id.0)]),
            ),
        };
        Self {
            kind,
            nullable,
            content_type,
            hash,
        }
    }

    /// The node and its children
    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    /// Whether the pattern matches the empty sequence
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Content type, computed at construction
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Structural hash, the intern table key
    pub fn structural_hash(&self) -> u64 {
        self.hash
    }

    /// Name of the pattern kind, as used in RELAX NG syntax
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            PatternKind::Empty => "empty",
            PatternKind::NotAllowed => "notAllowed",
            PatternKind::Text => "text",
            PatternKind::Choice(..) => "choice",
            PatternKind::Group(..) => "group",
            PatternKind::Interleave(..) => "interleave",
            PatternKind::OneOrMore(_) => "oneOrMore",
            PatternKind::List(_) => "list",
            PatternKind::Data { .. } => "data",
            PatternKind::DataExcept { .. } => "data",
            PatternKind::Value { .. } => "value",
            PatternKind::Attribute { .. } => "attribute",
            PatternKind::Element(_) => "element",
            PatternKind::Ref(_) => "ref",
        }
    }
}
