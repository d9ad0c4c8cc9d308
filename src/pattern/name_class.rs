//! RELAX NG name classes
//!
//! A name class matches qualified element or attribute names: a single
//! `name`, `anyName`, `nsName`, their `except` forms, or a `choice`.
//!
//! Reference: https://relaxng.org/jclark/nameclass.html

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::namespaces::QName;

/// A name class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum NameClass {
    /// Exactly one name
    Name(QName),
    /// Any name in any namespace
    AnyName,
    /// Any name except those matched by the inner class
    AnyNameExcept(Box<NameClass>),
    /// Any name in the given namespace ("" for no namespace)
    NsName(String),
    /// Any name in the namespace except those matched by the inner class
    NsNameExcept(String, Box<NameClass>),
    /// Either of two classes
    Choice(Box<NameClass>, Box<NameClass>),
}

// A namespace URI no real name can have; used to stand for "some other namespace"
const IMPOSSIBLE_NAMESPACE: &str = "\u{1}";
// A local name no real name can have; used to stand for "some other local name"
const IMPOSSIBLE_LOCAL_NAME: &str = "";

impl NameClass {
    /// A single name
    pub fn name(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self::Name(QName::new(namespace, local_name))
    }

    /// A single name in no namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::Name(QName::local(local_name))
    }

    /// Choice of two classes
    pub fn choice(a: NameClass, b: NameClass) -> Self {
        Self::Choice(Box::new(a), Box::new(b))
    }

    /// Check whether the class matches `name`
    pub fn contains(&self, name: &QName) -> bool {
        match self {
            Self::Name(n) => n == name,
            Self::AnyName => true,
            Self::AnyNameExcept(except) => !except.contains(name),
            Self::NsName(ns) => ns == &name.namespace,
            Self::NsNameExcept(ns, except) => ns == &name.namespace && !except.contains(name),
            Self::Choice(a, b) => a.contains(name) || b.contains(name),
        }
    }

    /// Whether the class can match more than one concrete name
    pub fn is_open(&self) -> bool {
        match self {
            Self::Name(_) => false,
            Self::AnyName
            | Self::AnyNameExcept(_)
            | Self::NsName(_)
            | Self::NsNameExcept(_, _) => true,
            Self::Choice(a, b) => a.is_open() || b.is_open(),
        }
    }

    /// The finite set of names this class matches, or `None` if it is open
    pub fn simple_names(&self) -> Option<Vec<QName>> {
        let mut names = Vec::new();
        if self.collect_simple_names(&mut names) {
            Some(names)
        } else {
            None
        }
    }

    fn collect_simple_names(&self, names: &mut Vec<QName>) -> bool {
        match self {
            Self::Name(n) => {
                if !names.contains(n) {
                    names.push(n.clone());
                }
                true
            }
            Self::Choice(a, b) => a.collect_simple_names(names) && b.collect_simple_names(names),
            _ => false,
        }
    }

    /// Check whether some name is matched by both classes.
    ///
    /// Every name class is characterised by a finite set of representative
    /// names: its explicit names plus, for each wildcard, one name standing for
    /// "any other name" in that namespace or in any namespace. Two classes
    /// overlap iff one of the representatives of either is in both.
    pub fn overlaps(&self, other: &NameClass) -> bool {
        let mut representatives = HashSet::new();
        self.collect_representatives(&mut representatives);
        other.collect_representatives(&mut representatives);
        representatives
            .iter()
            .any(|name| self.contains(name) && other.contains(name))
    }

    fn collect_representatives(&self, out: &mut HashSet<QName>) {
        match self {
            Self::Name(n) => {
                out.insert(n.clone());
            }
            Self::AnyName => {
                out.insert(QName::new(IMPOSSIBLE_NAMESPACE, IMPOSSIBLE_LOCAL_NAME));
            }
            Self::AnyNameExcept(except) => {
                out.insert(QName::new(IMPOSSIBLE_NAMESPACE, IMPOSSIBLE_LOCAL_NAME));
                except.collect_representatives(out);
            }
            Self::NsName(ns) => {
                out.insert(QName::new(ns.clone(), IMPOSSIBLE_LOCAL_NAME));
            }
            Self::NsNameExcept(ns, except) => {
                out.insert(QName::new(ns.clone(), IMPOSSIBLE_LOCAL_NAME));
                except.collect_representatives(out);
            }
            Self::Choice(a, b) => {
                a.collect_representatives(out);
                b.collect_representatives(out);
            }
        }
    }
}

impl fmt::Display for NameClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(n) => write!(f, "{}", n),
            Self::AnyName => write!(f, "*"),
            Self::AnyNameExcept(except) => write!(f, "* - ({})", except),
            Self::NsName(ns) => write!(f, "{{{}}}*", ns),
            Self::NsNameExcept(ns, except) => write!(f, "{{{}}}* - ({})", ns, except),
            Self::Choice(a, b) => write!(f, "{} | {}", a, b),
        }
    }
}
