//! The pattern arena
//!
//! [`PatternGraph`] stores interned patterns, element slots and named
//! definitions. It is filled by the builder and becomes read-only once a
//! schema is compiled.

use indexmap::IndexMap;
use std::collections::HashSet;

use super::name_class::NameClass;
use super::node::{Annotations, DefineId, ElementId, Pattern, PatternId, PatternKind};
use crate::locations::SourceLocation;

/// An element pattern's identity: name class and (expanded) content
#[derive(Debug, Clone)]
pub struct ElementSlot {
    /// Names the element matches
    pub name_class: NameClass,
    /// Content pattern; replaced by its expansion when the grammar is compiled
    pub content: PatternId,
    /// Where the element pattern was declared
    pub location: Option<SourceLocation>,
    /// Foreign annotations attached to the element pattern
    pub annotations: Annotations,
}

#[derive(Debug, Clone)]
pub(crate) struct Definition {
    pub(crate) body: Option<PatternId>,
    pub(crate) location: Option<SourceLocation>,
}

/// Arena of patterns, element slots and named definitions
#[derive(Debug, Clone, Default)]
pub struct PatternGraph {
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) locations: Vec<Option<SourceLocation>>,
    pub(crate) elements: Vec<ElementSlot>,
    pub(crate) definitions: IndexMap<String, Definition>,
}

impl PatternGraph {
    /// The pattern stored under `id`
    pub fn pattern(&self, id: PatternId) -> &Pattern {
        &self.patterns[id.index()]
    }

    /// The kind of the pattern stored under `id`
    pub fn kind(&self, id: PatternId) -> &PatternKind {
        self.pattern(id).kind()
    }

    /// Source location recorded for a pattern, if any
    pub fn location(&self, id: PatternId) -> Option<&SourceLocation> {
        self.locations[id.index()].as_ref()
    }

    /// The slot of an element pattern
    pub fn element(&self, id: ElementId) -> &ElementSlot {
        &self.elements[id.index()]
    }

    /// Number of interned patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no pattern was interned
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Number of element slots
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Name of a definition
    pub fn definition_name(&self, id: DefineId) -> &str {
        self.definitions
            .get_index(id.index())
            .map(|(name, _)| name.as_str())
            .unwrap_or_default()
    }

    /// Body of a definition, `None` if it was referenced but never defined
    pub fn definition_body(&self, id: DefineId) -> Option<PatternId> {
        self.definitions
            .get_index(id.index())
            .and_then(|(_, def)| def.body)
    }

    pub(crate) fn definition_location(&self, id: DefineId) -> Option<&SourceLocation> {
        self.definitions
            .get_index(id.index())
            .and_then(|(_, def)| def.location.as_ref())
    }

    /// Look up a definition by name
    pub fn definition(&self, name: &str) -> Option<DefineId> {
        self.definitions
            .get_index_of(name)
            .map(|index| DefineId(index as u32))
    }

    /// Elements reachable from `start`, in discovery order.
    ///
    /// Walks through element contents and definition bodies; each element is
    /// reported once.
    pub fn reachable_elements(&self, start: PatternId) -> Vec<ElementId> {
        let mut seen_patterns = HashSet::new();
        let mut seen_elements = HashSet::new();
        let mut found = Vec::new();
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            if !seen_patterns.insert(id) {
                continue;
            }
            match self.kind(id) {
                PatternKind::Choice(a, b)
                | PatternKind::Group(a, b)
                | PatternKind::Interleave(a, b) => {
                    stack.push(*b);
                    stack.push(*a);
                }
                PatternKind::OneOrMore(p) | PatternKind::List(p) => stack.push(*p),
                PatternKind::DataExcept { except, .. } => stack.push(*except),
                PatternKind::Attribute { value, .. } => stack.push(*value),
                PatternKind::Element(element) => {
                    if seen_elements.insert(*element) {
                        found.push(*element);
                        stack.push(self.element(*element).content);
                    }
                }
                PatternKind::Ref(define) => {
                    if let Some(body) = self.definition_body(*define) {
                        stack.push(body);
                    }
                }
                PatternKind::Empty
                | PatternKind::NotAllowed
                | PatternKind::Text
                | PatternKind::Data { .. }
                | PatternKind::Value { .. } => {}
            }
        }
        found
    }

    /// Elements that may appear directly at the top of `content`, not nested
    /// inside another element.
    pub fn top_level_elements(&self, content: PatternId) -> Vec<ElementId> {
        let mut found = Vec::new();
        for kind in self.top_level(content) {
            if let PatternKind::Element(element) = kind {
                if !found.contains(element) {
                    found.push(*element);
                }
            }
        }
        found
    }

    /// Attribute name classes that may appear at the top of `content`.
    pub fn top_level_attributes(&self, content: PatternId) -> Vec<NameClass> {
        let mut found = Vec::new();
        for kind in self.top_level(content) {
            if let PatternKind::Attribute { name_class, .. } = kind {
                if !found.contains(name_class) {
                    found.push(name_class.clone());
                }
            }
        }
        found
    }

    // The element and attribute leaves of a content model in document order,
    // stopping at element, attribute, list and data boundaries.
    fn top_level(&self, content: PatternId) -> Vec<&PatternKind> {
        let mut leaves = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![content];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let kind = self.kind(id);
            match kind {
                PatternKind::Choice(a, b)
                | PatternKind::Group(a, b)
                | PatternKind::Interleave(a, b) => {
                    stack.push(*b);
                    stack.push(*a);
                }
                PatternKind::OneOrMore(p) => stack.push(*p),
                PatternKind::Ref(define) => {
                    if let Some(body) = self.definition_body(*define) {
                        stack.push(body);
                    }
                }
                PatternKind::Element(_) | PatternKind::Attribute { .. } => leaves.push(kind),
                _ => {}
            }
        }
        leaves
    }
}
