//! RELAX NG restriction checking (section 7)
//!
//! A single walk over the expanded grammar, carrying the context in which each
//! pattern occurs. The first violation ends the walk; its location is filled by
//! the innermost attribute, element, list or data pattern that has one. The
//! walk nests no deeper than [`Limits::max_recursion_depth`].

use std::collections::HashSet;

use super::alphabet::Alphabet;
use super::duplicate_attributes::DuplicateAttributeDetector;
use super::graph::PatternGraph;
use super::name_class::NameClass;
use super::node::{DefineId, ElementId, PatternId, PatternKind};
use super::ContentType;
use crate::error::{Error, RecursionError, Result, RestrictionViolation};
use crate::limits::Limits;
use crate::locations::SourceLocation;

type CheckResult = Result<()>;

/// The context a pattern is checked in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// The start pattern
    Start,
    /// Element content
    Element,
    /// Element content under `oneOrMore`
    ElementRepeat,
    /// `group` under `oneOrMore` in element content
    ElementRepeatGroup,
    /// `interleave` under `oneOrMore` in element content
    ElementRepeatInterleave,
    /// List content
    List,
    /// Attribute value
    Attribute,
    /// The `except` of a `data` pattern
    DataExcept,
}

fn violation(code: &'static str) -> CheckResult {
    Err(RestrictionViolation::new(code).into())
}

// Fill in the location of a restriction violation passing through
fn locate(location: Option<&SourceLocation>) -> impl FnOnce(Error) -> Error + '_ {
    move |mut e| {
        if let Error::Restriction(ref mut violation) = e {
            violation.maybe_set_location(location);
        }
        e
    }
}

/// Walks a grammar checking every restriction
pub struct RestrictionChecker<'a> {
    graph: &'a PatternGraph,
    checked_elements: HashSet<ElementId>,
    active_refs: HashSet<DefineId>,
    depth: usize,
    max_depth: usize,
}

impl<'a> RestrictionChecker<'a> {
    /// Create a checker bounded by the default limits
    pub fn new(graph: &'a PatternGraph) -> Self {
        Self {
            graph,
            checked_elements: HashSet::new(),
            active_refs: HashSet::new(),
            depth: 0,
            max_depth: Limits::default().max_recursion_depth,
        }
    }

    /// Bound the nesting of the walk by `limits`
    pub fn with_limits(mut self, limits: &Limits) -> Self {
        self.max_depth = limits.max_recursion_depth;
        self
    }

    /// Check a start pattern and every element reachable from it
    pub fn check_start(&mut self, start: PatternId) -> CheckResult {
        self.check(start, Context::Start, None, None)
    }

    /// Check `id` in `context`.
    ///
    /// `dad` collects the attributes of the enclosing element; `alpha`
    /// collects element names when the caller is an interleave branch.
    pub fn check(
        &mut self,
        id: PatternId,
        context: Context,
        dad: Option<&mut DuplicateAttributeDetector>,
        alpha: Option<&mut Alphabet>,
    ) -> CheckResult {
        if self.depth > self.max_depth {
            return Err(RecursionError::DepthExceeded {
                depth: self.depth,
                limit: self.max_depth,
            }
            .into());
        }
        self.depth += 1;
        let result = self.check_pattern(id, context, dad, alpha);
        self.depth -= 1;
        result
    }

    fn check_pattern(
        &mut self,
        id: PatternId,
        context: Context,
        mut dad: Option<&mut DuplicateAttributeDetector>,
        mut alpha: Option<&mut Alphabet>,
    ) -> CheckResult {
        let graph = self.graph;
        let location = graph.location(id);
        match graph.kind(id) {
            PatternKind::NotAllowed => Ok(()),
            PatternKind::Empty => match context {
                Context::Start => violation("start_contains_empty"),
                Context::DataExcept => violation("data_except_contains_empty"),
                _ => Ok(()),
            },
            PatternKind::Text => match context {
                Context::Start => violation("start_contains_text"),
                Context::List => violation("list_contains_text"),
                Context::DataExcept => violation("data_except_contains_text"),
                _ => Ok(()),
            },
            PatternKind::Data { .. } => match context {
                Context::Start => violation("start_contains_data"),
                _ => Ok(()),
            },
            PatternKind::Value { .. } => match context {
                Context::Start => violation("start_contains_value"),
                _ => Ok(()),
            },
            PatternKind::DataExcept { except, .. } => {
                if context == Context::Start {
                    return violation("start_contains_data");
                }
                self.check(*except, Context::DataExcept, None, None)
                    .map_err(locate(location))
            }
            PatternKind::List(p) => {
                match context {
                    Context::Start => return violation("start_contains_list"),
                    Context::List => return violation("list_contains_list"),
                    Context::DataExcept => return violation("data_except_contains_list"),
                    _ => {}
                }
                self.check(*p, Context::List, None, None)
                    .map_err(locate(location))
            }
            PatternKind::Attribute {
                name_class, value, ..
            } => self
                .check_attribute(name_class, *value, context, dad)
                .map_err(locate(location)),
            PatternKind::Element(element) => {
                let slot = graph.element(*element);
                if let Some(alpha) = alpha {
                    alpha.add_element(&slot.name_class);
                }
                if self.checked_elements.contains(element) {
                    return Ok(());
                }
                let result = match context {
                    Context::DataExcept => violation("data_except_contains_element"),
                    Context::List => violation("list_contains_element"),
                    Context::Attribute => violation("attribute_contains_element"),
                    _ => {
                        self.checked_elements.insert(*element);
                        let mut element_dad = DuplicateAttributeDetector::new();
                        self.check(slot.content, Context::Element, Some(&mut element_dad), None)
                    }
                };
                result.map_err(locate(slot.location.as_ref().or(location)))
            }
            PatternKind::Choice(p1, p2) => {
                if let Some(dad) = dad.as_deref_mut() {
                    dad.start_choice();
                }
                self.check(*p1, context, dad.as_deref_mut(), alpha.as_deref_mut())?;
                if let Some(dad) = dad.as_deref_mut() {
                    dad.alternative();
                }
                self.check(*p2, context, dad.as_deref_mut(), alpha.as_deref_mut())?;
                if let Some(dad) = dad {
                    dad.end_choice();
                }
                Ok(())
            }
            PatternKind::Group(p1, p2) => {
                match context {
                    Context::Start => return violation("start_contains_group"),
                    Context::DataExcept => return violation("data_except_contains_group"),
                    _ => {}
                }
                let inner = if context == Context::ElementRepeat {
                    Context::ElementRepeatGroup
                } else {
                    context
                };
                self.check(*p1, inner, dad.as_deref_mut(), alpha.as_deref_mut())?;
                self.check(*p2, inner, dad, alpha)?;
                if context != Context::List
                    && !self.content_type(*p1).groupable(self.content_type(*p2))
                {
                    return violation("group_string");
                }
                Ok(())
            }
            PatternKind::Interleave(p1, p2) => {
                match context {
                    Context::Start => return violation("start_contains_interleave"),
                    Context::DataExcept => return violation("data_except_contains_interleave"),
                    Context::List => return violation("list_contains_interleave"),
                    _ => {}
                }
                let inner = if context == Context::ElementRepeat {
                    Context::ElementRepeatInterleave
                } else {
                    context
                };
                let mut a1 = Alphabet::new();
                self.check(*p1, inner, dad.as_deref_mut(), Some(&mut a1))?;
                let mut a2 = Alphabet::new();
                self.check(*p2, inner, dad, Some(&mut a2))?;
                a1.check_overlap(&a2)?;
                if let Some(alpha) = alpha {
                    alpha.add_alphabet(&a1);
                    alpha.add_alphabet(&a2);
                }
                let (t1, t2) = (self.content_type(*p1), self.content_type(*p2));
                if !t1.groupable(t2) {
                    return violation("interleave_string");
                }
                if t1 == ContentType::Mixed && t2 == ContentType::Mixed {
                    return violation("interleave_text_overlap");
                }
                Ok(())
            }
            PatternKind::OneOrMore(p) => {
                match context {
                    Context::Start => return violation("start_contains_one_or_more"),
                    Context::DataExcept => return violation("data_except_contains_one_or_more"),
                    _ => {}
                }
                let inner = if context == Context::Element {
                    Context::ElementRepeat
                } else {
                    context
                };
                self.check(*p, inner, dad, alpha)?;
                let t = self.content_type(*p);
                if context != Context::List && !t.groupable(t) {
                    return violation("one_or_more_string");
                }
                Ok(())
            }
            PatternKind::Ref(define) => {
                // only reachable when checking a grammar that was not expanded
                let Some(body) = graph.definition_body(*define) else {
                    return Ok(());
                };
                if !self.active_refs.insert(*define) {
                    return Ok(());
                }
                let result = self.check(body, context, dad, alpha);
                self.active_refs.remove(define);
                result
            }
        }
    }

    fn check_attribute(
        &mut self,
        name_class: &NameClass,
        value: PatternId,
        context: Context,
        dad: Option<&mut DuplicateAttributeDetector>,
    ) -> CheckResult {
        match context {
            Context::Start => return violation("start_contains_attribute"),
            Context::Element => {
                if name_class.is_open() {
                    return violation("open_name_class_not_repeated");
                }
            }
            Context::ElementRepeatGroup => {
                return violation("one_or_more_contains_group_contains_attribute")
            }
            Context::ElementRepeatInterleave => {
                return violation("one_or_more_contains_interleave_contains_attribute")
            }
            Context::List => return violation("list_contains_attribute"),
            Context::Attribute => return violation("attribute_contains_attribute"),
            Context::DataExcept => return violation("data_except_contains_attribute"),
            Context::ElementRepeat => {}
        }
        if names_xmlns(name_class) {
            return violation("xmlns_attribute_name");
        }
        if let Some(dad) = dad {
            dad.add_attribute(name_class)?;
        }
        self.check(value, Context::Attribute, None, None)
    }

    fn content_type(&self, id: PatternId) -> ContentType {
        self.graph.pattern(id).content_type()
    }
}

// An attribute may not be named xmlns nor live in the xmlns namespace
fn names_xmlns(name_class: &NameClass) -> bool {
    match name_class {
        NameClass::Name(name) => {
            name.namespace == crate::XMLNS_NAMESPACE
                || (name.namespace.is_empty() && name.local_name == "xmlns")
        }
        NameClass::NsName(ns) | NameClass::NsNameExcept(ns, _) => ns == crate::XMLNS_NAMESPACE,
        NameClass::Choice(a, b) => names_xmlns(a) || names_xmlns(b),
        NameClass::AnyName | NameClass::AnyNameExcept(_) => false,
    }
}
