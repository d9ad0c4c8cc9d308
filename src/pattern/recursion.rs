//! Recursion guard for named definitions
//!
//! A definition may refer to itself only through an element. The check walks
//! the grammar with an explicit stack, tracking element nesting; re-entering
//! a definition that is still being visited at the same element depth means
//! the recursion is unguarded. Every step of the walk counts against
//! [`Limits::max_recursion_depth`].

use std::collections::{HashMap, HashSet};

use super::builder::SchemaPatternBuilder;
use super::graph::PatternGraph;
use super::node::{DefineId, ElementId, PatternId, PatternKind};
use crate::error::{Error, RecursionError, Result};
use crate::limits::Limits;
use crate::locations::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefState {
    InProgress(usize),
    Done,
}

enum Task {
    // pattern, element depth, walk level
    Visit(PatternId, usize, usize),
    LeaveRef(DefineId),
}

struct RecursionChecker<'a> {
    graph: &'a PatternGraph,
    limits: &'a Limits,
    refs: HashMap<DefineId, RefState>,
    elements: HashSet<ElementId>,
    visited: HashSet<(PatternId, usize)>,
    tasks: Vec<Task>,
}

impl SchemaPatternBuilder {
    /// Reject definitions that expand to themselves without an intervening
    /// element, and grammars nested deeper than the limit.
    pub fn check_recursion(&self, start: PatternId, limits: &Limits) -> Result<()> {
        RecursionChecker {
            graph: &self.graph,
            limits,
            refs: HashMap::new(),
            elements: HashSet::new(),
            visited: HashSet::new(),
            tasks: vec![Task::Visit(start, 0, 0)],
        }
        .run()
    }
}

impl RecursionChecker<'_> {
    fn run(&mut self) -> Result<()> {
        while let Some(task) = self.tasks.pop() {
            match task {
                Task::Visit(id, depth, level) => self.visit(id, depth, level)?,
                Task::LeaveRef(define) => {
                    self.refs.insert(define, RefState::Done);
                }
            }
        }
        Ok(())
    }

    fn visit(&mut self, id: PatternId, depth: usize, level: usize) -> Result<()> {
        self.limits.check_recursion_depth(level)?;
        let graph = self.graph;
        let kind = graph.kind(id);
        // refs carry their own state; every other node is walked once per depth
        if !matches!(kind, PatternKind::Ref(_)) && !self.visited.insert((id, depth)) {
            return Ok(());
        }
        match kind {
            PatternKind::Empty
            | PatternKind::NotAllowed
            | PatternKind::Text
            | PatternKind::Data { .. }
            | PatternKind::Value { .. } => {}
            PatternKind::Choice(p1, p2)
            | PatternKind::Group(p1, p2)
            | PatternKind::Interleave(p1, p2) => {
                self.tasks.push(Task::Visit(*p2, depth, level + 1));
                self.tasks.push(Task::Visit(*p1, depth, level + 1));
            }
            PatternKind::OneOrMore(p) | PatternKind::List(p) => {
                self.tasks.push(Task::Visit(*p, depth, level + 1))
            }
            PatternKind::DataExcept { except, .. } => {
                self.tasks.push(Task::Visit(*except, depth, level + 1))
            }
            PatternKind::Attribute { value, .. } => {
                self.tasks.push(Task::Visit(*value, depth, level + 1))
            }
            PatternKind::Element(element) => {
                if self.elements.insert(*element) {
                    let content = graph.element(*element).content;
                    self.tasks.push(Task::Visit(content, depth + 1, level + 1));
                }
            }
            PatternKind::Ref(define) => {
                let define = *define;
                match self.refs.get(&define).copied() {
                    None => {
                        let body = graph.definition_body(define).ok_or_else(|| {
                            Error::UndefinedReference {
                                name: graph.definition_name(define).to_string(),
                                location: self.ref_location(id, define),
                            }
                        })?;
                        self.refs.insert(define, RefState::InProgress(depth));
                        self.tasks.push(Task::LeaveRef(define));
                        self.tasks.push(Task::Visit(body, depth, level + 1));
                    }
                    Some(RefState::InProgress(entered)) if entered == depth => {
                        return Err(RecursionError::RecursiveReference {
                            name: graph.definition_name(define).to_string(),
                            location: self.ref_location(id, define),
                        }
                        .into());
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    fn ref_location(&self, id: PatternId, define: DefineId) -> Option<SourceLocation> {
        self.graph
            .location(id)
            .or_else(|| self.graph.definition_location(define))
            .cloned()
    }
}
