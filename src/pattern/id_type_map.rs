//! ID/IDREF/IDREFS typing of attributes and elements
//!
//! Collects, for every element reachable in a compiled grammar, which of its
//! attributes (and whether its own content) carry an ID-family datatype, and
//! enforces the DTD compatibility rules that make this map well defined.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use super::graph::PatternGraph;
use super::name_class::NameClass;
use super::node::{Datatype, PatternId, PatternKind};
use crate::error::RestrictionViolation;
use crate::locations::SourceLocation;
use crate::namespaces::QName;

/// Role of an ID-family datatype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IdType {
    /// A unique identifier
    Id,
    /// A reference to one identifier
    Idref,
    /// A whitespace-separated list of references
    Idrefs,
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdType::Id => "ID",
            IdType::Idref => "IDREF",
            IdType::Idrefs => "IDREFS",
        })
    }
}

impl IdType {
    /// The ID role of a datatype, if it has one
    pub fn of_datatype(datatype: &Datatype) -> Option<IdType> {
        if datatype.library != crate::XSD_DATATYPES_NAMESPACE
            && datatype.library != crate::COMPATIBILITY_DATATYPES_NAMESPACE
        {
            return None;
        }
        match datatype.name.as_str() {
            "ID" => Some(IdType::Id),
            "IDREF" => Some(IdType::Idref),
            "IDREFS" => Some(IdType::Idrefs),
            _ => None,
        }
    }
}

/// ID roles keyed by element and attribute name
#[derive(Debug, Clone, Default, Serialize)]
pub struct IdTypeMap {
    attributes: IndexMap<(QName, QName), IdType>,
    elements: IndexMap<QName, IdType>,
}

impl IdTypeMap {
    /// Build the map for the grammar rooted at `start`
    pub fn build(graph: &PatternGraph, start: PatternId) -> Result<Self, RestrictionViolation> {
        let mut builder = IdTypeMapBuilder {
            graph,
            attributes: IndexMap::new(),
            elements: IndexMap::new(),
            open_attributes: Vec::new(),
            open_elements: Vec::new(),
            content_id_type: None,
        };
        for element in graph.reachable_elements(start) {
            let slot = graph.element(element);
            builder.content_id_type = None;
            builder
                .walk_content(&slot.name_class, slot.content)
                .and_then(|_| builder.element(&slot.name_class, slot.location.as_ref()))
                .map_err(|mut e| {
                    e.maybe_set_location(slot.location.as_ref());
                    e
                })?;
        }
        builder.check_open_attributes()?;
        builder.check_open_elements()?;

        Ok(Self {
            attributes: builder
                .attributes
                .into_iter()
                .filter_map(|(key, (id_type, _))| id_type.map(|t| (key, t)))
                .collect(),
            elements: builder
                .elements
                .into_iter()
                .filter_map(|(name, (id_type, _))| id_type.map(|t| (name, t)))
                .collect(),
        })
    }

    /// ID role of attribute `attribute` on element `element`
    pub fn attribute_id_type(&self, element: &QName, attribute: &QName) -> Option<IdType> {
        self.attributes
            .get(&(element.clone(), attribute.clone()))
            .copied()
    }

    /// ID role of the content of element `element`
    pub fn element_id_type(&self, element: &QName) -> Option<IdType> {
        self.elements.get(element).copied()
    }

    /// Whether `element` has any ID-typed attribute
    pub fn has_attribute_ids(&self, element: &QName) -> bool {
        self.attributes.keys().any(|(e, _)| e == element)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.attributes.len() + self.elements.len()
    }

    /// Whether the grammar declares no ID roles
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.elements.is_empty()
    }
}

struct IdTypeMapBuilder<'a> {
    graph: &'a PatternGraph,
    // `None` records an attribute declared without an ID role
    attributes: IndexMap<(QName, QName), (Option<IdType>, Option<SourceLocation>)>,
    // likewise `None` for an element whose content has no ID role
    elements: IndexMap<QName, (Option<IdType>, Option<SourceLocation>)>,
    open_attributes: Vec<(NameClass, NameClass, Option<SourceLocation>)>,
    open_elements: Vec<(NameClass, Option<SourceLocation>)>,
    // ID role found in the content of the element being walked
    content_id_type: Option<IdType>,
}

impl IdTypeMapBuilder<'_> {
    // Walk one element's content without entering child elements. Below
    // `oneOrMore` an ID datatype cannot be the whole content.
    fn walk_content(
        &mut self,
        element_name: &NameClass,
        content: PatternId,
    ) -> Result<(), RestrictionViolation> {
        let graph = self.graph;
        let mut seen = HashSet::new();
        let mut stack = vec![(content, true)];
        while let Some((id, top)) = stack.pop() {
            if !seen.insert((id, top)) {
                continue;
            }
            match graph.kind(id) {
                PatternKind::Choice(p1, p2)
                | PatternKind::Group(p1, p2)
                | PatternKind::Interleave(p1, p2) => {
                    stack.push((*p2, top));
                    stack.push((*p1, top));
                }
                PatternKind::OneOrMore(p) => stack.push((*p, false)),
                PatternKind::Ref(define) => {
                    if let Some(body) = graph.definition_body(*define) {
                        stack.push((body, top));
                    }
                }
                PatternKind::List(p) => check_no_id(graph, *p)?,
                PatternKind::Data { datatype, .. } | PatternKind::Value { datatype, .. } => {
                    self.element_datatype(element_name, datatype, top)?
                }
                PatternKind::DataExcept {
                    datatype, except, ..
                } => {
                    check_no_id(graph, *except)?;
                    self.element_datatype(element_name, datatype, top)?
                }
                PatternKind::Attribute {
                    name_class, value, ..
                } => self
                    .attribute(element_name, name_class, *value)
                    .map_err(|mut e| {
                        e.maybe_set_location(graph.location(id));
                        e
                    })?,
                PatternKind::Empty
                | PatternKind::NotAllowed
                | PatternKind::Text
                | PatternKind::Element(_) => {}
            }
        }
        Ok(())
    }

    fn element_datatype(
        &mut self,
        element_name: &NameClass,
        datatype: &Datatype,
        top: bool,
    ) -> Result<(), RestrictionViolation> {
        let Some(id_type) = IdType::of_datatype(datatype) else {
            return Ok(());
        };
        if !top {
            return Err(RestrictionViolation::new("id_parent"));
        }
        if element_name.simple_names().is_none() {
            return Err(RestrictionViolation::new("id_element_name_class"));
        }
        match self.content_id_type {
            Some(existing) if existing != id_type => {
                Err(RestrictionViolation::new("id_type_conflict"))
            }
            _ => {
                self.content_id_type = Some(id_type);
                Ok(())
            }
        }
    }

    // Record the ID role found in an element's content under each of its
    // names; every declaration of a name must agree
    fn element(
        &mut self,
        element_name: &NameClass,
        location: Option<&SourceLocation>,
    ) -> Result<(), RestrictionViolation> {
        let id_type = self.content_id_type;
        let Some(names) = element_name.simple_names() else {
            self.open_elements
                .push((element_name.clone(), location.cloned()));
            return Ok(());
        };
        for name in names {
            match self.elements.get(&name) {
                Some((existing, _)) if *existing != id_type => {
                    return Err(RestrictionViolation::new("id_type_conflict"))
                }
                Some(_) => {}
                None => {
                    self.elements.insert(name, (id_type, location.cloned()));
                }
            }
        }
        Ok(())
    }

    fn attribute(
        &mut self,
        element_name: &NameClass,
        attribute_name: &NameClass,
        value: PatternId,
    ) -> Result<(), RestrictionViolation> {
        let graph = self.graph;
        let id_type = match graph.kind(value) {
            PatternKind::Data { datatype, .. } | PatternKind::Value { datatype, .. } => {
                IdType::of_datatype(datatype)
            }
            PatternKind::DataExcept {
                datatype, except, ..
            } => {
                check_no_id(graph, *except)?;
                IdType::of_datatype(datatype)
            }
            _ => {
                check_no_id(graph, value)?;
                None
            }
        };
        let location = graph.location(value).cloned();

        let (element_names, attribute_names) =
            match (element_name.simple_names(), attribute_name.simple_names()) {
                (Some(e), Some(a)) => (e, a),
                (element_names, _) => {
                    if id_type.is_some() {
                        return Err(RestrictionViolation::new(if element_names.is_none() {
                            "id_element_name_class"
                        } else {
                            "id_attribute_name_class"
                        }));
                    }
                    self.open_attributes.push((
                        element_name.clone(),
                        attribute_name.clone(),
                        location,
                    ));
                    return Ok(());
                }
            };

        for e in &element_names {
            for a in &attribute_names {
                let key = (e.clone(), a.clone());
                match self.attributes.get(&key) {
                    Some((existing, _)) if *existing != id_type => {
                        return Err(RestrictionViolation::new("id_type_conflict"))
                    }
                    Some(_) => {}
                    None => {
                        self.attributes.insert(key, (id_type, location.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    // An open attribute declaration must not match an ID-typed pair
    fn check_open_attributes(&self) -> Result<(), RestrictionViolation> {
        for (element_name, attribute_name, location) in &self.open_attributes {
            for ((e, a), (id_type, id_location)) in &self.attributes {
                if id_type.is_some() && element_name.contains(e) && attribute_name.contains(a) {
                    let mut err = RestrictionViolation::new("id_type_conflict");
                    err.maybe_set_location(id_location.as_ref().or(location.as_ref()));
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    // An open element declaration must not match an ID-typed element name
    fn check_open_elements(&self) -> Result<(), RestrictionViolation> {
        for (element_name, location) in &self.open_elements {
            for (name, (id_type, id_location)) in &self.elements {
                if id_type.is_some() && element_name.contains(name) {
                    let mut err = RestrictionViolation::new("id_type_conflict");
                    err.maybe_set_location(id_location.as_ref().or(location.as_ref()));
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

// ID-family datatypes may only be the whole value of an attribute or element
fn check_no_id(graph: &PatternGraph, id: PatternId) -> Result<(), RestrictionViolation> {
    let mut seen = HashSet::new();
    let mut stack = vec![id];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        match graph.kind(id) {
            PatternKind::Data { datatype, .. } | PatternKind::Value { datatype, .. } => {
                if IdType::of_datatype(datatype).is_some() {
                    return Err(RestrictionViolation::new("id_parent"));
                }
            }
            PatternKind::DataExcept {
                datatype, except, ..
            } => {
                if IdType::of_datatype(datatype).is_some() {
                    return Err(RestrictionViolation::new("id_parent"));
                }
                stack.push(*except);
            }
            PatternKind::Choice(p1, p2)
            | PatternKind::Group(p1, p2)
            | PatternKind::Interleave(p1, p2) => {
                stack.push(*p1);
                stack.push(*p2);
            }
            PatternKind::OneOrMore(p) | PatternKind::List(p) => stack.push(*p),
            PatternKind::Ref(define) => {
                if let Some(body) = graph.definition_body(*define) {
                    stack.push(body);
                }
            }
            // elements and attributes are checked on their own
            PatternKind::Attribute { .. }
            | PatternKind::Element(_)
            | PatternKind::Empty
            | PatternKind::NotAllowed
            | PatternKind::Text => {}
        }
    }
    Ok(())
}
