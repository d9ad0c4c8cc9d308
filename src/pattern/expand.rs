//! One-shot expansion
//!
//! Replaces every reference by the expansion of its definition and rebuilds
//! the nodes whose children changed through the builder, so that the result
//! is canonical again. Element contents are expanded in place, once. The
//! walk keeps its own stack, so deep grammars do not grow the thread stack.

use std::collections::{HashMap, HashSet};

use super::builder::SchemaPatternBuilder;
use super::node::{DefineId, ElementId, PatternId, PatternKind};
use crate::error::{Error, RecursionError, Result};

enum Task {
    Visit(PatternId),
    // rebuild a node from the expansions of its children
    Rebuild(PatternId),
    LeaveRef(PatternId, DefineId),
    LeaveElement(PatternId, ElementId, HashSet<DefineId>),
}

struct Expander {
    memo: HashMap<PatternId, PatternId>,
    active_refs: HashSet<DefineId>,
    tasks: Vec<Task>,
    results: Vec<PatternId>,
}

impl SchemaPatternBuilder {
    /// Expand `p`, returning the canonical reference-free pattern.
    ///
    /// Expanding an already expanded pattern returns it unchanged.
    pub fn expand(&mut self, p: PatternId) -> Result<PatternId> {
        let mut expander = Expander {
            memo: HashMap::new(),
            active_refs: HashSet::new(),
            tasks: vec![Task::Visit(p)],
            results: Vec::new(),
        };
        expander.run(self)
    }
}

impl Expander {
    fn run(&mut self, b: &mut SchemaPatternBuilder) -> Result<PatternId> {
        while let Some(task) = self.tasks.pop() {
            match task {
                Task::Visit(id) => self.visit(b, id)?,
                Task::Rebuild(id) => {
                    let result = self.rebuild(b, id)?;
                    self.finish(id, result);
                }
                Task::LeaveRef(id, define) => {
                    let expanded = self.pop()?;
                    self.active_refs.remove(&define);
                    self.finish(id, expanded);
                }
                Task::LeaveElement(id, element, outer_refs) => {
                    let expanded = self.pop()?;
                    b.graph.elements[element.index()].content = expanded;
                    self.active_refs = outer_refs;
                    self.finish(id, id);
                }
            }
        }
        self.pop()
    }

    fn visit(&mut self, b: &mut SchemaPatternBuilder, id: PatternId) -> Result<()> {
        if let Some(&done) = self.memo.get(&id) {
            self.results.push(done);
            return Ok(());
        }
        match b.graph.kind(id) {
            PatternKind::Empty
            | PatternKind::NotAllowed
            | PatternKind::Text
            | PatternKind::Data { .. }
            | PatternKind::Value { .. } => self.finish(id, id),
            PatternKind::Choice(p1, p2)
            | PatternKind::Group(p1, p2)
            | PatternKind::Interleave(p1, p2) => {
                let (p1, p2) = (*p1, *p2);
                self.tasks.push(Task::Rebuild(id));
                self.tasks.push(Task::Visit(p2));
                self.tasks.push(Task::Visit(p1));
            }
            PatternKind::OneOrMore(p) | PatternKind::List(p) => {
                let p = *p;
                self.tasks.push(Task::Rebuild(id));
                self.tasks.push(Task::Visit(p));
            }
            PatternKind::DataExcept { except, .. } => {
                let except = *except;
                self.tasks.push(Task::Rebuild(id));
                self.tasks.push(Task::Visit(except));
            }
            PatternKind::Attribute { value, .. } => {
                let value = *value;
                self.tasks.push(Task::Rebuild(id));
                self.tasks.push(Task::Visit(value));
            }
            PatternKind::Element(element) => {
                let element = *element;
                if b.expanded_elements.insert(element) {
                    // references are guarded by the element
                    let outer_refs = std::mem::take(&mut self.active_refs);
                    self.tasks.push(Task::LeaveElement(id, element, outer_refs));
                    self.tasks.push(Task::Visit(b.graph.element(element).content));
                } else {
                    self.finish(id, id);
                }
            }
            PatternKind::Ref(define) => {
                let define = *define;
                let body = b.graph.definition_body(define).ok_or_else(|| {
                    Error::UndefinedReference {
                        name: b.graph.definition_name(define).to_string(),
                        location: b.graph.location(id).cloned(),
                    }
                })?;
                if !self.active_refs.insert(define) {
                    return Err(RecursionError::RecursiveReference {
                        name: b.graph.definition_name(define).to_string(),
                        location: b.graph.location(id).cloned(),
                    }
                    .into());
                }
                self.tasks.push(Task::LeaveRef(id, define));
                self.tasks.push(Task::Visit(body));
            }
        }
        Ok(())
    }

    // Children were pushed first to last, so their expansions come off the
    // result stack last to first.
    fn rebuild(&mut self, b: &mut SchemaPatternBuilder, id: PatternId) -> Result<PatternId> {
        let location = b.graph.location(id).cloned();
        let result = match b.graph.kind(id).clone() {
            PatternKind::Choice(p1, p2) => {
                let (e2, e1) = (self.pop()?, self.pop()?);
                if e1 == p1 && e2 == p2 {
                    id
                } else {
                    b.make_choice(e1, e2)
                }
            }
            PatternKind::Group(p1, p2) => {
                let (e2, e1) = (self.pop()?, self.pop()?);
                if e1 == p1 && e2 == p2 {
                    id
                } else {
                    b.make_group(e1, e2)
                }
            }
            PatternKind::Interleave(p1, p2) => {
                let (e2, e1) = (self.pop()?, self.pop()?);
                if e1 == p1 && e2 == p2 {
                    id
                } else {
                    b.make_interleave(e1, e2)
                }
            }
            PatternKind::OneOrMore(p) => {
                let e = self.pop()?;
                if e == p {
                    id
                } else {
                    b.make_one_or_more(e)
                }
            }
            PatternKind::List(p) => {
                let e = self.pop()?;
                if e == p {
                    id
                } else {
                    b.make_list(e, location)
                }
            }
            PatternKind::DataExcept {
                datatype,
                params,
                except,
            } => {
                let e = self.pop()?;
                if e == except {
                    id
                } else {
                    b.make_data_except(datatype, params, e, location)
                }
            }
            PatternKind::Attribute {
                name_class,
                value,
                annotations,
            } => {
                let e = self.pop()?;
                if e == value {
                    id
                } else {
                    b.make_attribute_with_annotations(name_class, e, location, annotations)
                }
            }
            other => {
                return Err(Error::Schema(format!(
                    "cannot rebuild {:?} during expansion",
                    other
                )))
            }
        };
        Ok(result)
    }

    fn finish(&mut self, id: PatternId, result: PatternId) {
        self.memo.insert(id, result);
        self.results.push(result);
    }

    fn pop(&mut self) -> Result<PatternId> {
        self.results
            .pop()
            .ok_or_else(|| Error::Schema("expansion result stack is empty".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Datatype, NameClass};

    #[test]
    fn test_expand_replaces_refs() {
        let mut b = SchemaPatternBuilder::new();
        let text = b.make_text();
        let attr = b.make_attribute(NameClass::local("a"), text, None);
        let r = b.make_ref("attrs", None);
        b.define("attrs", attr).unwrap();
        let empty = b.make_empty();
        let group = b.make_group(r, empty);
        assert_eq!(group, r);

        let expanded = b.expand(r).unwrap();
        assert_eq!(expanded, attr);
    }

    #[test]
    fn test_expand_rebuilds_parents() {
        let mut b = SchemaPatternBuilder::new();
        let data = b.make_data(Datatype::token(), vec![]);
        let r = b.make_ref("value", None);
        b.define("value", data).unwrap();
        let attr = b.make_attribute(NameClass::local("a"), r, None);
        let expanded = b.expand(attr).unwrap();
        assert_ne!(expanded, attr);
        assert_eq!(expanded, b.make_attribute(NameClass::local("a"), data, None));
    }

    #[test]
    fn test_expand_unchanged_keeps_identity() {
        let mut b = SchemaPatternBuilder::new();
        let text = b.make_text();
        let attr = b.make_attribute(NameClass::local("a"), text, None);
        let empty = b.make_empty();
        let elem = b.make_element(NameClass::local("e"), empty, None);
        let group = b.make_group(attr, elem);
        assert_eq!(b.expand(group).unwrap(), group);
    }

    #[test]
    fn test_expand_recursive_element() {
        let mut b = SchemaPatternBuilder::new();
        let r = b.make_ref("node", None);
        let children = b.make_zero_or_more(r);
        let node = b.make_element(NameClass::local("node"), children, None);
        b.define("node", node).unwrap();

        let start = b.expand(r).unwrap();
        assert_eq!(start, node);
        let slot = match b.graph().kind(node) {
            PatternKind::Element(element) => b.graph().element(*element).clone(),
            other => panic!("unexpected {:?}", other),
        };
        // node* with the reference replaced by the element itself
        let expected = b.make_zero_or_more(node);
        assert_eq!(slot.content, expected);
        assert_eq!(b.expand(start).unwrap(), start);
    }

    #[test]
    fn test_expand_undefined_reference() {
        let mut b = SchemaPatternBuilder::new();
        let r = b.make_ref("missing", None);
        assert!(matches!(
            b.expand(r),
            Err(Error::UndefinedReference { ref name, .. }) if name == "missing"
        ));
    }

    #[test]
    fn test_expand_detects_unguarded_cycle() {
        let mut b = SchemaPatternBuilder::new();
        let r = b.make_ref("loop", None);
        let text = b.make_text();
        let choice = b.make_choice(r, text);
        b.define("loop", choice).unwrap();
        assert!(matches!(b.expand(r), Err(Error::Recursion(_))));
    }

    #[test]
    fn test_expand_deep_chain() {
        let mut b = SchemaPatternBuilder::new();
        let text = b.make_text();
        let r = b.make_ref("leaf", None);
        b.define("leaf", text).unwrap();
        let mut chain = r;
        for _ in 0..100_000 {
            chain = b.make_group(chain, text);
        }
        let mut expected = text;
        for _ in 0..100_000 {
            expected = b.make_group(expected, text);
        }
        assert_eq!(b.expand(chain).unwrap(), expected);
    }
}
