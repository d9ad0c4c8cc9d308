//! Content-model tracking for suggestions
//!
//! For every element of a compiled grammar, [`ContentModel`] records which
//! child elements and attributes can occur and whether text is allowed.
//! [`ContentModelTracker`] follows a document through this table, reporting
//! names that no candidate element allows and answering what may come next
//! at the current position.

use indexmap::IndexMap;
use log::trace;
use serde::Serialize;
use std::sync::Arc;

use super::base::Attribute;
use super::validation::ValidationContext;
use crate::error::Result;
use crate::names::is_whitespace_only;
use crate::namespaces::QName;
use crate::pattern::{ElementId, NameClass, PatternGraph, PatternId};

/// What one element pattern allows directly inside it
#[derive(Debug, Clone, Serialize)]
pub struct ElementModel {
    /// The element's name class
    pub name_class: NameClass,
    /// Element patterns that may appear as children
    pub children: Vec<ElementId>,
    /// Name classes of the attributes it may carry
    pub attributes: Vec<NameClass>,
    /// Whether non-whitespace text may appear as content
    pub text_allowed: bool,
    /// Documentation attached to the element pattern
    pub documentation: Option<String>,
}

/// Per-element content summary of a compiled grammar
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContentModel {
    elements: IndexMap<ElementId, ElementModel>,
    start: Vec<ElementId>,
}

impl ContentModel {
    /// Summarize every element reachable from `start`
    pub fn build(graph: &PatternGraph, start: PatternId) -> Self {
        let mut elements = IndexMap::new();
        for element in graph.reachable_elements(start) {
            let slot = graph.element(element);
            elements.insert(
                element,
                ElementModel {
                    name_class: slot.name_class.clone(),
                    children: graph.top_level_elements(slot.content),
                    attributes: graph.top_level_attributes(slot.content),
                    text_allowed: graph.pattern(slot.content).content_type().allows_text(),
                    documentation: slot.annotations.documentation().map(String::from),
                },
            );
        }
        Self {
            elements,
            start: graph.top_level_elements(start),
        }
    }

    /// The element patterns allowed as document element
    pub fn start_elements(&self) -> &[ElementId] {
        &self.start
    }

    /// Summary of one element pattern
    pub fn element(&self, id: ElementId) -> Option<&ElementModel> {
        self.elements.get(&id)
    }

    /// Number of element patterns
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether no element is reachable
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn matching(&self, candidates: &[ElementId], name: &QName) -> Vec<ElementId> {
        candidates
            .iter()
            .copied()
            .filter(|id| {
                self.element(*id)
                    .map(|model| model.name_class.contains(name))
                    .unwrap_or(false)
            })
            .collect()
    }
}

#[derive(Debug)]
struct Frame {
    name: QName,
    // element patterns the open element may be an instance of; empty once
    // the element itself was not allowed
    candidates: Vec<ElementId>,
    text_reported: bool,
}

/// Follows a document through a [`ContentModel`]
#[derive(Debug)]
pub struct ContentModelTracker {
    model: Arc<ContentModel>,
    stack: Vec<Frame>,
}

impl ContentModelTracker {
    /// Create a tracker positioned before the document element
    pub fn new(model: Arc<ContentModel>) -> Self {
        Self {
            model,
            stack: Vec::new(),
        }
    }

    /// Return to the start of a document
    pub fn reset(&mut self) {
        self.stack.clear();
    }

    /// Current element nesting depth
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    // Element patterns allowed at the current position; `None` when unknown
    fn allowed_children(&self) -> Option<Vec<ElementId>> {
        match self.stack.last() {
            None => Some(self.model.start_elements().to_vec()),
            Some(frame) if frame.candidates.is_empty() => None,
            Some(frame) => {
                let mut children = Vec::new();
                for candidate in &frame.candidates {
                    if let Some(model) = self.model.element(*candidate) {
                        for child in &model.children {
                            if !children.contains(child) {
                                children.push(*child);
                            }
                        }
                    }
                }
                Some(children)
            }
        }
    }

    /// Enter an element, reporting it or its attributes if not allowed
    pub fn start_element(
        &mut self,
        context: &mut ValidationContext,
        name: &QName,
        attributes: &[Attribute],
    ) -> Result<()> {
        let candidates = match self.allowed_children() {
            Some(allowed) => {
                let matched = self.model.matching(&allowed, name);
                if matched.is_empty() {
                    match self.stack.last() {
                        None => context.error(format!("undeclared root element \"{}\"", name))?,
                        Some(parent) => context.error(format!(
                            "element \"{}\" not allowed in element \"{}\"",
                            name, parent.name
                        ))?,
                    }
                }
                matched
            }
            None => Vec::new(),
        };
        trace!("element {} matches {} patterns", name, candidates.len());

        if !candidates.is_empty() {
            for attribute in attributes {
                if attribute.name.namespace == crate::XMLNS_NAMESPACE {
                    continue;
                }
                let allowed = candidates.iter().any(|id| {
                    self.model
                        .element(*id)
                        .map(|model| model.attributes.iter().any(|nc| nc.contains(&attribute.name)))
                        .unwrap_or(false)
                });
                if !allowed {
                    context.error(format!(
                        "attribute \"{}\" not allowed on element \"{}\"",
                        attribute.name, name
                    ))?;
                }
            }
        }

        self.stack.push(Frame {
            name: name.clone(),
            candidates,
            text_reported: false,
        });
        Ok(())
    }

    /// Check character data against the current element
    pub fn characters(&mut self, context: &mut ValidationContext, text: &str) -> Result<()> {
        if is_whitespace_only(text) {
            return Ok(());
        }
        let text_allowed = self.text_allowed();
        match self.stack.last_mut() {
            Some(frame) if !frame.candidates.is_empty() && !frame.text_reported => {
                if !text_allowed {
                    frame.text_reported = true;
                    let message = format!("text not allowed in element \"{}\"", frame.name);
                    context.error(message)?;
                }
                Ok(())
            }
            Some(_) => Ok(()),
            None => context.error("text not allowed outside the document element"),
        }
    }

    /// Leave the current element
    pub fn end_element(&mut self) {
        self.stack.pop();
    }

    /// Name classes of the elements that may start at the current position
    pub fn expected_elements(&self) -> Vec<NameClass> {
        let mut names = Vec::new();
        for id in self.allowed_children().unwrap_or_default() {
            if let Some(model) = self.model.element(id) {
                if !names.contains(&model.name_class) {
                    names.push(model.name_class.clone());
                }
            }
        }
        names
    }

    /// Name classes of the attributes the current element may carry
    pub fn expected_attributes(&self) -> Vec<NameClass> {
        let mut names = Vec::new();
        for model in self.current_models() {
            for nc in &model.attributes {
                if !names.contains(nc) {
                    names.push(nc.clone());
                }
            }
        }
        names
    }

    /// Whether text may appear in the current element
    pub fn text_allowed(&self) -> bool {
        self.current_models().any(|model| model.text_allowed)
    }

    /// Documentation of the element patterns the current element matched
    pub fn documentation(&self) -> Vec<&str> {
        self.current_models()
            .filter_map(|model| model.documentation.as_deref())
            .collect()
    }

    fn current_models(&self) -> impl Iterator<Item = &ElementModel> + '_ {
        self.stack
            .last()
            .into_iter()
            .flat_map(|frame| frame.candidates.iter())
            .filter_map(|id| self.model.element(*id))
    }
}
