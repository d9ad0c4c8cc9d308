//! XML namespace handling
//!
//! This module provides qualified names and the scoped prefix mappings used
//! while streaming a document through a validator.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
///
/// The empty string is "no namespace", as in RELAX NG.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QName {
    /// Namespace URI (empty for no namespace)
    pub namespace: NamespaceUri,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new("", local_name)
    }

    /// Whether the name is in no namespace
    pub fn has_namespace(&self) -> bool {
        !self.namespace.is_empty()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

/// Namespace context for resolving prefixes
///
/// Each element pushes a scope; declarations made in a scope are visible until
/// it is popped.
#[derive(Debug, Clone)]
pub struct NamespaceContext {
    /// Declarations, innermost scope last
    scopes: Vec<Vec<(Prefix, Option<NamespaceUri>)>>,
}

impl NamespaceContext {
    /// Create a new namespace context with a single (document) scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Vec::new()],
        }
    }

    /// Discard all scopes and declarations
    pub fn reset(&mut self) {
        self.scopes.clear();
        self.scopes.push(Vec::new());
    }

    /// Open a new scope
    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Close the innermost scope, dropping its declarations
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Number of open scopes
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare a prefix in the innermost scope.
    ///
    /// An empty prefix is the default namespace; an empty URI undeclares it.
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        let namespace = namespace.into();
        let namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((prefix.into(), namespace));
        }
    }

    /// Get the namespace bound to a prefix, if any
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(crate::XML_NAMESPACE);
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(p, _)| p == prefix)
            .and_then(|(_, ns)| ns.as_deref())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.get_namespace("")
    }

    /// Find a prefix currently bound to `namespace`.
    ///
    /// Returns `Some("")` when it is the default namespace.
    pub fn get_prefix(&self, namespace: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .filter(|(_, ns)| ns.as_deref() == Some(namespace))
            .map(|(p, _)| p.as_str())
            .find(|p| self.get_namespace(p) == Some(namespace))
    }

    /// Resolve a prefixed element name to a QName
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        if let Some((prefix, local)) = prefixed_name.split_once(':') {
            let namespace = self
                .get_namespace(prefix)
                .ok_or_else(|| Error::Namespace(format!("Unknown prefix: {}", prefix)))?;
            Ok(QName::new(namespace, local))
        } else {
            Ok(QName::new(
                self.get_default_namespace().unwrap_or(""),
                prefixed_name,
            ))
        }
    }

    /// Resolve a prefixed attribute name; unprefixed attributes are in no namespace
    pub fn resolve_attribute(&self, prefixed_name: &str) -> Result<QName> {
        if prefixed_name.contains(':') {
            self.resolve(prefixed_name)
        } else {
            Ok(QName::local(prefixed_name))
        }
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::new("http://example.com", "element");
        assert_eq!(qname.namespace, "http://example.com");
        assert_eq!(qname.local_name, "element");
        assert!(qname.has_namespace());
    }

    #[test]
    fn test_qname_to_string() {
        let qname = QName::new("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");

        let qname_local = QName::local("element");
        assert_eq!(qname_local.to_string(), "element");
    }

    #[test]
    fn test_scoped_prefixes() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("a", "urn:outer");
        ctx.push_scope();
        ctx.add_prefix("a", "urn:inner");
        assert_eq!(ctx.get_namespace("a"), Some("urn:inner"));
        ctx.pop_scope();
        assert_eq!(ctx.get_namespace("a"), Some("urn:outer"));
    }

    #[test]
    fn test_default_namespace_undeclared() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("", "urn:default");
        ctx.push_scope();
        ctx.add_prefix("", "");
        assert_eq!(ctx.get_default_namespace(), None);
        assert_eq!(ctx.resolve("x").unwrap(), QName::local("x"));
        ctx.pop_scope();
        assert_eq!(ctx.resolve("x").unwrap(), QName::new("urn:default", "x"));
    }

    #[test]
    fn test_get_prefix_skips_shadowed() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("p", "urn:one");
        ctx.push_scope();
        ctx.add_prefix("p", "urn:two");
        assert_eq!(ctx.get_prefix("urn:one"), None);
        assert_eq!(ctx.get_prefix("urn:two"), Some("p"));
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", "http://www.w3.org/2001/XMLSchema");

        let qname = ctx.resolve("xs:element").unwrap();
        assert_eq!(qname.namespace, "http://www.w3.org/2001/XMLSchema");
        assert_eq!(qname.local_name, "element");
        assert!(ctx.resolve("nope:element").is_err());
        assert_eq!(
            ctx.resolve("xml:lang").unwrap().namespace,
            crate::XML_NAMESPACE
        );
    }
}
