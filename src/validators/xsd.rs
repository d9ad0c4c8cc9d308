//! XML Schema validation through a delegated engine
//!
//! XSD validation itself is performed by an external streaming engine. This
//! module adapts the engine's event contract to the crate's [`Schema`] and
//! [`Validator`] traits: it maintains the namespace context the engine reads,
//! builds qualified names, records unparsed entities and latches the errors
//! the engine reports.

use indexmap::IndexSet;
use log::{debug, trace};
use std::fmt;
use std::sync::Arc;

use super::base::{Attribute, Schema, Validator, ValidatorProperties};
use super::exceptions::{Diagnostic, ErrorLatch};
use super::validation::ValidationContext;
use crate::error::Result;
use crate::limits::Limits;
use crate::locations::SourceLocation;
use crate::namespaces::{NamespaceContext, QName};

/// Engine settings fixed at session creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XsdEngineConfig {
    /// Produce post-schema-validation infoset augmentation
    pub augment_psvi: bool,
    /// Check the schema components themselves fully
    pub full_checking: bool,
    /// Check ID/IDREF integrity
    pub id_idref_checking: bool,
    /// Check identity constraints (key, keyref, unique)
    pub identity_constraint_checking: bool,
}

impl Default for XsdEngineConfig {
    fn default() -> Self {
        Self {
            augment_psvi: false,
            full_checking: true,
            id_idref_checking: true,
            identity_constraint_checking: true,
        }
    }
}

/// Receiver of diagnostics produced by an engine session.
///
/// An `Err` return aborts the document.
pub trait DiagnosticSink {
    /// Report a diagnostic
    fn report(&mut self, diagnostic: Diagnostic) -> Result<()>;

    fn error(&mut self, message: String, location: Option<SourceLocation>) -> Result<()> {
        self.report(Diagnostic::error(message, location))
    }

    fn warning(&mut self, message: String, location: Option<SourceLocation>) -> Result<()> {
        self.report(Diagnostic::warning(message, location))
    }

    fn fatal_error(&mut self, message: String, location: Option<SourceLocation>) -> Result<()> {
        self.report(Diagnostic::fatal(message, location))
    }
}

impl DiagnosticSink for ErrorLatch {
    fn report(&mut self, diagnostic: Diagnostic) -> Result<()> {
        ErrorLatch::report(self, diagnostic)
    }
}

impl DiagnosticSink for ValidationContext {
    fn report(&mut self, diagnostic: Diagnostic) -> Result<()> {
        ValidationContext::report(self, diagnostic)
    }
}

/// A qualified name as handed to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XsdName {
    /// Prefix; empty when unprefixed or unknown
    pub prefix: String,
    /// Local part
    pub local_name: String,
    /// Name as written
    pub raw_name: String,
    /// Namespace; `None` for no namespace
    pub namespace: Option<String>,
}

impl XsdName {
    /// Build a name from a resolved name and its raw form.
    ///
    /// The prefix comes from `raw_name` when it has one, otherwise from a
    /// prefix bound to the namespace in `namespaces`.
    pub fn new(name: &QName, raw_name: &str, namespaces: &NamespaceContext) -> Self {
        if !name.has_namespace() {
            return Self {
                prefix: String::new(),
                local_name: name.local_name.clone(),
                raw_name: name.local_name.clone(),
                namespace: None,
            };
        }
        let (prefix, raw_name) = if raw_name.is_empty() {
            match namespaces.get_prefix(&name.namespace) {
                Some(prefix) if !prefix.is_empty() => (
                    prefix.to_string(),
                    format!("{}:{}", prefix, name.local_name),
                ),
                _ => (String::new(), name.local_name.clone()),
            }
        } else {
            let prefix = match raw_name.find(':') {
                Some(colon) if colon > 0 => raw_name[..colon].to_string(),
                _ => String::new(),
            };
            (prefix, raw_name.to_string())
        };
        Self {
            prefix,
            local_name: name.local_name.clone(),
            raw_name,
            namespace: Some(name.namespace.clone()),
        }
    }
}

impl fmt::Display for XsdName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_name)
    }
}

/// An attribute as handed to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XsdAttribute {
    /// Attribute name
    pub name: XsdName,
    /// Attribute value
    pub value: String,
}

/// Document state visible to the engine during an event
#[derive(Debug, Clone, Copy)]
pub struct XsdEnvironment<'a> {
    /// In-scope namespace declarations
    pub namespaces: &'a NamespaceContext,
    entities: &'a IndexSet<String>,
    /// Location of the event
    pub location: Option<&'a SourceLocation>,
}

impl<'a> XsdEnvironment<'a> {
    fn new(
        namespaces: &'a NamespaceContext,
        entities: &'a IndexSet<String>,
        location: Option<&'a SourceLocation>,
    ) -> Self {
        Self {
            namespaces,
            entities,
            location,
        }
    }

    /// Whether the document declared an entity named `name`
    pub fn is_entity_declared(&self, name: &str) -> bool {
        self.entities.contains(name)
    }

    /// Whether `name` is an unparsed entity
    pub fn is_entity_unparsed(&self, name: &str) -> bool {
        self.entities.contains(name)
    }
}

/// A compiled XSD grammar pool
pub trait XsdEngine: Send + Sync + fmt::Debug {
    /// Start validating one document
    fn create_session(&self, config: &XsdEngineConfig) -> Box<dyn XsdSession>;
}

/// Per-document state of an [`XsdEngine`]
pub trait XsdSession: Send + fmt::Debug {
    fn start_document(
        &mut self,
        env: &XsdEnvironment<'_>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<()>;

    fn end_document(&mut self, env: &XsdEnvironment<'_>, sink: &mut dyn DiagnosticSink)
        -> Result<()>;

    fn start_element(
        &mut self,
        name: &XsdName,
        attributes: &[XsdAttribute],
        env: &XsdEnvironment<'_>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<()>;

    fn end_element(
        &mut self,
        name: &XsdName,
        env: &XsdEnvironment<'_>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<()>;

    fn characters(
        &mut self,
        text: &str,
        env: &XsdEnvironment<'_>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<()>;

    /// Whitespace in element-only content
    fn ignorable_whitespace(
        &mut self,
        text: &str,
        env: &XsdEnvironment<'_>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<()> {
        let _ = (text, env, sink);
        Ok(())
    }

    /// Discard all per-document state
    fn reset(&mut self);
}

/// A schema validated by a delegated XSD engine
#[derive(Debug, Clone)]
pub struct XsdSchema {
    engine: Arc<dyn XsdEngine>,
    config: XsdEngineConfig,
    limits: Limits,
}

impl XsdSchema {
    /// Wrap `engine` with the default engine configuration
    pub fn new(engine: Arc<dyn XsdEngine>) -> Self {
        Self {
            engine,
            config: XsdEngineConfig::default(),
            limits: Limits::default(),
        }
    }

    /// Set the document limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Engine configuration used for new sessions
    pub fn config(&self) -> &XsdEngineConfig {
        &self.config
    }
}

impl Schema for XsdSchema {
    fn create_validator(&self, properties: ValidatorProperties) -> Box<dyn Validator> {
        debug!("creating XSD session with {:?}", self.config);
        Box::new(XsdValidator {
            context: ValidationContext::new(properties.error_handler)
                .with_limits(self.limits.clone())
                .with_system_id(properties.system_id),
            session: self.engine.create_session(&self.config),
            namespaces: NamespaceContext::new(),
            entities: IndexSet::new(),
            location: None,
            pushed_context: false,
        })
    }
}

/// Validator created by [`XsdSchema`]
#[derive(Debug)]
pub struct XsdValidator {
    context: ValidationContext,
    session: Box<dyn XsdSession>,
    namespaces: NamespaceContext,
    entities: IndexSet<String>,
    location: Option<SourceLocation>,
    // a scope was opened by a prefix mapping for the next start tag
    pushed_context: bool,
}

impl XsdValidator {
    fn open_scope(&mut self) {
        if !self.pushed_context {
            self.namespaces.push_scope();
        } else {
            self.pushed_context = false;
        }
    }
}

impl Validator for XsdValidator {
    fn set_location(&mut self, location: Option<SourceLocation>) {
        self.context.set_location(location);
        self.location = self.context.location().cloned();
    }

    fn start_document(&mut self) -> Result<()> {
        let env = XsdEnvironment::new(&self.namespaces, &self.entities, self.location.as_ref());
        self.session.start_document(&env, &mut self.context)
    }

    fn end_document(&mut self) -> Result<()> {
        let env = XsdEnvironment::new(&self.namespaces, &self.entities, self.location.as_ref());
        self.session.end_document(&env, &mut self.context)
    }

    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()> {
        trace!("prefix mapping {:?} -> {:?}", prefix, uri);
        if !self.pushed_context {
            self.namespaces.push_scope();
            self.pushed_context = true;
        }
        self.namespaces.add_prefix(prefix, uri);
        Ok(())
    }

    fn end_prefix_mapping(&mut self, _prefix: &str) -> Result<()> {
        Ok(())
    }

    fn start_element(&mut self, name: &QName, qname: &str, attributes: &[Attribute]) -> Result<()> {
        self.context.enter_level(attributes.len())?;
        self.open_scope();
        let element = XsdName::new(name, qname, &self.namespaces);
        let attributes: Vec<XsdAttribute> = attributes
            .iter()
            .map(|attribute| XsdAttribute {
                name: XsdName::new(&attribute.name, &attribute.qname, &self.namespaces),
                value: attribute.value.clone(),
            })
            .collect();
        trace!("start element {}", element);
        let env = XsdEnvironment::new(&self.namespaces, &self.entities, self.location.as_ref());
        self.session
            .start_element(&element, &attributes, &env, &mut self.context)
    }

    fn end_element(&mut self, name: &QName, qname: &str) -> Result<()> {
        self.context.exit_level();
        let element = XsdName::new(name, qname, &self.namespaces);
        let env = XsdEnvironment::new(&self.namespaces, &self.entities, self.location.as_ref());
        let result = self.session.end_element(&element, &env, &mut self.context);
        self.namespaces.pop_scope();
        result
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        let env = XsdEnvironment::new(&self.namespaces, &self.entities, self.location.as_ref());
        self.session.characters(text, &env, &mut self.context)
    }

    fn ignorable_whitespace(&mut self, text: &str) -> Result<()> {
        let env = XsdEnvironment::new(&self.namespaces, &self.entities, self.location.as_ref());
        self.session
            .ignorable_whitespace(text, &env, &mut self.context)
    }

    fn unparsed_entity_decl(
        &mut self,
        name: &str,
        _public_id: Option<&str>,
        _system_id: &str,
        _notation: &str,
    ) -> Result<()> {
        self.entities.insert(name.to_string());
        Ok(())
    }

    fn had_error(&self) -> bool {
        self.context.had_error()
    }

    fn reset(&mut self) {
        self.context.clear();
        self.session.reset();
        self.namespaces.reset();
        self.entities.clear();
        self.location = None;
        self.pushed_context = false;
    }
}
