//! Pattern construction and hash-consing
//!
//! [`SchemaPatternBuilder`] is the only way to create patterns. Every
//! constructor returns the canonical node for its structure, so structurally
//! equal patterns share one [`PatternId`] and compare by id.

use log::{debug, trace, warn};
use std::collections::{HashMap, HashSet};

use super::graph::{Definition, ElementSlot, PatternGraph};
use super::id_type_map::IdTypeMap;
use super::name_class::NameClass;
use super::node::{
    Annotations, Datatype, DefineId, ElementId, Param, Pattern, PatternId, PatternKind,
};
use super::restrictions::RestrictionChecker;
use crate::error::{Error, Result};
use crate::locations::SourceLocation;
use crate::validators::content_model::ContentModel;
use crate::validators::schemas::{RelaxNgSchema, SchemaOptions};

// Stack for the compile thread: a floor, and room per level of grammar nesting
const MIN_COMPILE_STACK_SIZE: usize = 32 * 1024 * 1024;
const COMPILE_STACK_PER_LEVEL: usize = 8 * 1024;

/// Factory and intern table for patterns
#[derive(Debug, Clone)]
pub struct SchemaPatternBuilder {
    pub(crate) graph: PatternGraph,
    intern: HashMap<u64, Vec<PatternId>>,
    pub(crate) expanded_elements: HashSet<ElementId>,
    empty: PatternId,
    not_allowed: PatternId,
    text: PatternId,
}

impl Default for SchemaPatternBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaPatternBuilder {
    /// Create a builder holding only the leaf patterns
    pub fn new() -> Self {
        let mut builder = Self {
            graph: PatternGraph::default(),
            intern: HashMap::new(),
            expanded_elements: HashSet::new(),
            empty: PatternId(0),
            not_allowed: PatternId(0),
            text: PatternId(0),
        };
        builder.empty = builder.intern(PatternKind::Empty, None);
        builder.not_allowed = builder.intern(PatternKind::NotAllowed, None);
        builder.text = builder.intern(PatternKind::Text, None);
        builder
    }

    /// The arena built so far
    pub fn graph(&self) -> &PatternGraph {
        &self.graph
    }

    /// The pattern stored under `id`
    pub fn pattern(&self, id: PatternId) -> &Pattern {
        self.graph.pattern(id)
    }

    /// Number of distinct patterns interned so far
    pub fn pattern_count(&self) -> usize {
        self.graph.len()
    }

    /// Return the canonical id for `kind`, creating it if needed.
    ///
    /// A location is attached to the first node that supplies one; it never
    /// takes part in structural equality.
    fn intern(&mut self, kind: PatternKind, location: Option<SourceLocation>) -> PatternId {
        let graph = &self.graph;
        let pattern = Pattern::new(kind, |id| graph.pattern(id));
        let hash = pattern.structural_hash();

        if let Some(bucket) = self.intern.get(&hash) {
            if let Some(&existing) = bucket
                .iter()
                .find(|id| self.graph.kind(**id) == pattern.kind())
            {
                trace!("intern hit {} for {}", existing, pattern.kind_name());
                let slot = &mut self.graph.locations[existing.index()];
                if slot.is_none() {
                    *slot = location;
                }
                return existing;
            }
        }

        let id = PatternId(self.graph.patterns.len() as u32);
        trace!("intern new {} for {}", id, pattern.kind_name());
        self.graph.patterns.push(pattern);
        self.graph.locations.push(location);
        self.intern.entry(hash).or_default().push(id);
        id
    }

    /// `empty`
    pub fn make_empty(&self) -> PatternId {
        self.empty
    }

    /// `notAllowed`
    pub fn make_not_allowed(&self) -> PatternId {
        self.not_allowed
    }

    /// `text`
    pub fn make_text(&self) -> PatternId {
        self.text
    }

    /// `p1 | p2`
    pub fn make_choice(&mut self, p1: PatternId, p2: PatternId) -> PatternId {
        if p1 == p2 || p2 == self.not_allowed {
            return p1;
        }
        if p1 == self.not_allowed {
            return p2;
        }
        if p1 == self.empty && self.pattern(p2).is_nullable() {
            return p2;
        }
        if p2 == self.empty && self.pattern(p1).is_nullable() {
            return p1;
        }
        let mut result = p1;
        for leaf in self.choice_leaves(p2) {
            if !self.choice_contains(result, leaf) {
                result = self.intern(PatternKind::Choice(result, leaf), None);
            }
        }
        result
    }

    // Alternatives of a choice, left to right
    fn choice_leaves(&self, p: PatternId) -> Vec<PatternId> {
        let mut leaves = Vec::new();
        let mut stack = vec![p];
        while let Some(id) = stack.pop() {
            match self.graph.kind(id) {
                PatternKind::Choice(a, b) => {
                    stack.push(*b);
                    stack.push(*a);
                }
                _ => leaves.push(id),
            }
        }
        leaves
    }

    fn choice_contains(&self, choice: PatternId, p: PatternId) -> bool {
        let mut stack = vec![choice];
        while let Some(id) = stack.pop() {
            if id == p {
                return true;
            }
            if let PatternKind::Choice(a, b) = self.graph.kind(id) {
                stack.push(*b);
                stack.push(*a);
            }
        }
        false
    }

    /// `p1 , p2`
    pub fn make_group(&mut self, p1: PatternId, p2: PatternId) -> PatternId {
        if p1 == self.empty {
            return p2;
        }
        if p2 == self.empty {
            return p1;
        }
        if p1 == self.not_allowed || p2 == self.not_allowed {
            return self.not_allowed;
        }
        self.intern(PatternKind::Group(p1, p2), None)
    }

    /// `p1 & p2`
    pub fn make_interleave(&mut self, p1: PatternId, p2: PatternId) -> PatternId {
        if p1 == self.empty {
            return p2;
        }
        if p2 == self.empty {
            return p1;
        }
        if p1 == self.not_allowed || p2 == self.not_allowed {
            return self.not_allowed;
        }
        self.intern(PatternKind::Interleave(p1, p2), None)
    }

    /// `p+`
    pub fn make_one_or_more(&mut self, p: PatternId) -> PatternId {
        if p == self.empty
            || p == self.not_allowed
            || matches!(self.graph.kind(p), PatternKind::OneOrMore(_))
        {
            return p;
        }
        self.intern(PatternKind::OneOrMore(p), None)
    }

    /// `p?`
    pub fn make_optional(&mut self, p: PatternId) -> PatternId {
        let empty = self.empty;
        self.make_choice(p, empty)
    }

    /// `p*`
    pub fn make_zero_or_more(&mut self, p: PatternId) -> PatternId {
        let repeated = self.make_one_or_more(p);
        self.make_optional(repeated)
    }

    /// `mixed { p }`
    pub fn make_mixed(&mut self, p: PatternId) -> PatternId {
        let text = self.text;
        self.make_interleave(p, text)
    }

    /// `list { p }`
    pub fn make_list(&mut self, p: PatternId, location: Option<SourceLocation>) -> PatternId {
        if p == self.not_allowed {
            return p;
        }
        self.intern(PatternKind::List(p), location)
    }

    /// `datatype { params }`
    pub fn make_data(&mut self, datatype: Datatype, params: Vec<Param>) -> PatternId {
        self.intern(PatternKind::Data { datatype, params }, None)
    }

    /// `datatype { params } - except`
    pub fn make_data_except(
        &mut self,
        datatype: Datatype,
        params: Vec<Param>,
        except: PatternId,
        location: Option<SourceLocation>,
    ) -> PatternId {
        if except == self.not_allowed {
            return self.make_data(datatype, params);
        }
        self.intern(
            PatternKind::DataExcept {
                datatype,
                params,
                except,
            },
            location,
        )
    }

    /// `datatype "value"`
    pub fn make_value(&mut self, datatype: Datatype, value: impl Into<String>) -> PatternId {
        self.intern(
            PatternKind::Value {
                datatype,
                value: value.into(),
            },
            None,
        )
    }

    /// `attribute name_class { value }`
    pub fn make_attribute(
        &mut self,
        name_class: NameClass,
        value: PatternId,
        location: Option<SourceLocation>,
    ) -> PatternId {
        self.make_attribute_with_annotations(name_class, value, location, Annotations::default())
    }

    /// An attribute carrying documentation annotations
    pub fn make_attribute_with_annotations(
        &mut self,
        name_class: NameClass,
        value: PatternId,
        location: Option<SourceLocation>,
        annotations: Annotations,
    ) -> PatternId {
        if value == self.not_allowed {
            return value;
        }
        self.intern(
            PatternKind::Attribute {
                name_class,
                value,
                annotations,
            },
            location,
        )
    }

    /// `element name_class { content }`
    ///
    /// Every call creates a distinct element, even for equal arguments.
    pub fn make_element(
        &mut self,
        name_class: NameClass,
        content: PatternId,
        location: Option<SourceLocation>,
    ) -> PatternId {
        self.make_element_with_annotations(name_class, content, location, Annotations::default())
    }

    /// `element nc { content }` carrying foreign annotations
    pub fn make_element_with_annotations(
        &mut self,
        name_class: NameClass,
        content: PatternId,
        location: Option<SourceLocation>,
        annotations: Annotations,
    ) -> PatternId {
        let element = ElementId(self.graph.elements.len() as u32);
        self.graph.elements.push(ElementSlot {
            name_class,
            content,
            location: location.clone(),
            annotations,
        });
        self.intern(PatternKind::Element(element), location)
    }

    /// A reference to the definition `name`, which may be defined later
    pub fn make_ref(&mut self, name: &str, location: Option<SourceLocation>) -> PatternId {
        let index = match self.graph.definitions.get_index_of(name) {
            Some(index) => index,
            None => {
                let definition = Definition {
                    body: None,
                    location: location.clone(),
                };
                self.graph.definitions.insert_full(name.to_string(), definition).0
            }
        };
        self.intern(PatternKind::Ref(DefineId(index as u32)), location)
    }

    /// Bind `name` to `body`
    pub fn define(&mut self, name: &str, body: PatternId) -> Result<()> {
        match self.graph.definitions.get_mut(name) {
            Some(Definition { body: Some(_), .. }) => Err(Error::Schema(format!(
                "duplicate definition of \"{}\"",
                name
            ))),
            Some(definition) => {
                definition.body = Some(body);
                Ok(())
            }
            None => {
                self.graph.definitions.insert(
                    name.to_string(),
                    Definition {
                        body: Some(body),
                        location: None,
                    },
                );
                Ok(())
            }
        }
    }

    /// Check, simplify and restriction-check the grammar rooted at `start`,
    /// consuming the builder.
    ///
    /// Nothing is published unless every stage succeeds. The stages run on a
    /// dedicated thread whose stack is sized for
    /// [`Limits::max_recursion_depth`](crate::Limits::max_recursion_depth).
    pub fn compile(self, start: PatternId, options: &SchemaOptions) -> Result<RelaxNgSchema> {
        let options = options.clone();
        let stack_size = MIN_COMPILE_STACK_SIZE.max(
            options
                .limits
                .max_recursion_depth
                .saturating_mul(COMPILE_STACK_PER_LEVEL),
        );
        debug!("compiling on a thread with a {} byte stack", stack_size);

        let handle = std::thread::Builder::new()
            .name("rng-compile".to_string())
            .stack_size(stack_size)
            .spawn(move || self.compile_stages(start, &options))
            .map_err(|e| Error::Schema(format!("Failed to spawn compile thread: {}", e)))?;

        handle
            .join()
            .map_err(|_| Error::Schema("Compile thread panicked".to_string()))?
    }

    fn compile_stages(mut self, start: PatternId, options: &SchemaOptions) -> Result<RelaxNgSchema> {
        options.limits.check_patterns(self.pattern_count())?;

        self.check_recursion(start, &options.limits)?;
        debug!("recursion check passed for {} definitions", self.graph.definitions.len());

        let start = self.expand(start)?;
        debug!(
            "expanded start {} ({} patterns, {} elements)",
            start,
            self.pattern_count(),
            self.graph.element_count()
        );

        RestrictionChecker::new(&self.graph)
            .with_limits(&options.limits)
            .check_start(start)?;
        debug!("restriction check passed");

        let id_types = if options.check_id_idref {
            let map = IdTypeMap::build(&self.graph, start)?;
            debug!("ID type map has {} entries", map.len());
            map
        } else {
            warn!("ID/IDREF checking disabled by schema options");
            IdTypeMap::default()
        };

        let content_model = if options.track_content_model {
            Some(ContentModel::build(&self.graph, start))
        } else {
            None
        };

        Ok(RelaxNgSchema::new(
            self.graph,
            start,
            id_types,
            content_model,
            options.clone(),
        ))
    }
}
