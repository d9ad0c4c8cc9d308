//! Compiled schemas
//!
//! This module contains the schema options, the compiled RELAX NG schema with
//! its validator, and the ID-only schema.

use log::trace;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use super::base::{Attribute, Schema, Validator, ValidatorProperties};
use super::content_model::{ContentModel, ContentModelTracker};
use super::id_validator::{IdTracker, IdValidator};
use super::validation::ValidationContext;
use crate::error::Result;
use crate::limits::Limits;
use crate::locations::SourceLocation;
use crate::namespaces::QName;
use crate::pattern::{IdTypeMap, PatternGraph, PatternId};

/// Options controlling schema compilation and the validators it creates
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    /// Compile-time and document limits
    pub limits: Limits,
    /// Build the ID type map and check ID/IDREF integrity
    pub check_id_idref: bool,
    /// Track content models for suggestions
    pub track_content_model: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            check_id_idref: true,
            track_content_model: true,
        }
    }
}

impl SchemaOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Read options from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

struct RelaxNgSchemaInner {
    graph: PatternGraph,
    start: PatternId,
    id_types: Arc<IdTypeMap>,
    content_model: Option<Arc<ContentModel>>,
    options: SchemaOptions,
}

/// A compiled RELAX NG schema.
///
/// Cloning is cheap; clones share the compiled grammar.
#[derive(Clone)]
pub struct RelaxNgSchema {
    inner: Arc<RelaxNgSchemaInner>,
}

impl fmt::Debug for RelaxNgSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaxNgSchema")
            .field("start", &self.inner.start)
            .field("patterns", &self.inner.graph.len())
            .field("elements", &self.inner.graph.element_count())
            .field("id_types", &self.inner.id_types.len())
            .finish()
    }
}

impl RelaxNgSchema {
    pub(crate) fn new(
        graph: PatternGraph,
        start: PatternId,
        id_types: IdTypeMap,
        content_model: Option<ContentModel>,
        options: SchemaOptions,
    ) -> Self {
        Self {
            inner: Arc::new(RelaxNgSchemaInner {
                graph,
                start,
                id_types: Arc::new(id_types),
                content_model: content_model.map(Arc::new),
                options,
            }),
        }
    }

    /// The compiled pattern arena
    pub fn graph(&self) -> &PatternGraph {
        &self.inner.graph
    }

    /// The expanded start pattern
    pub fn start(&self) -> PatternId {
        self.inner.start
    }

    /// ID roles of attributes and elements
    pub fn id_type_map(&self) -> &IdTypeMap {
        &self.inner.id_types
    }

    /// Content summary, when tracking is enabled
    pub fn content_model(&self) -> Option<&ContentModel> {
        self.inner.content_model.as_deref()
    }

    /// Options the schema was compiled with
    pub fn options(&self) -> &SchemaOptions {
        &self.inner.options
    }

    /// A schema that checks only ID/IDREF integrity against this grammar
    pub fn id_schema(&self) -> IdSchema {
        IdSchema::new(self.inner.id_types.clone(), self.inner.options.limits.clone())
    }
}

impl Schema for RelaxNgSchema {
    fn create_validator(&self, properties: ValidatorProperties) -> Box<dyn Validator> {
        Box::new(RelaxNgValidator::new(self, properties))
    }
}

/// Validator created by [`RelaxNgSchema`]: ID/IDREF integrity plus
/// content-model tracking
#[derive(Debug)]
pub struct RelaxNgValidator {
    context: ValidationContext,
    ids: Option<IdTracker>,
    content: Option<ContentModelTracker>,
}

impl RelaxNgValidator {
    fn new(schema: &RelaxNgSchema, properties: ValidatorProperties) -> Self {
        let inner = &schema.inner;
        Self {
            context: ValidationContext::new(properties.error_handler)
                .with_limits(inner.options.limits.clone())
                .with_system_id(properties.system_id),
            ids: (!inner.id_types.is_empty()).then(|| IdTracker::new(inner.id_types.clone())),
            content: inner
                .content_model
                .as_ref()
                .map(|model| ContentModelTracker::new(model.clone())),
        }
    }
}

impl Validator for RelaxNgValidator {
    fn set_location(&mut self, location: Option<SourceLocation>) {
        self.context.set_location(location);
    }

    fn start_document(&mut self) -> Result<()> {
        trace!("start document");
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        trace!("end document");
        match self.ids {
            Some(ref mut ids) => ids.end_document(&mut self.context),
            None => Ok(()),
        }
    }

    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()> {
        trace!("prefix mapping {:?} -> {:?}", prefix, uri);
        Ok(())
    }

    fn end_prefix_mapping(&mut self, _prefix: &str) -> Result<()> {
        Ok(())
    }

    fn start_element(&mut self, name: &QName, qname: &str, attributes: &[Attribute]) -> Result<()> {
        trace!("start element {} ({})", name, qname);
        self.context.enter_level(attributes.len())?;
        if let Some(ref mut content) = self.content {
            content.start_element(&mut self.context, name, attributes)?;
        }
        if let Some(ref mut ids) = self.ids {
            ids.start_element(&mut self.context, name, attributes)?;
        }
        Ok(())
    }

    fn end_element(&mut self, name: &QName, _qname: &str) -> Result<()> {
        trace!("end element {}", name);
        self.context.exit_level();
        if let Some(ref mut content) = self.content {
            content.end_element();
        }
        match self.ids {
            Some(ref mut ids) => ids.end_element(&mut self.context),
            None => Ok(()),
        }
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        if let Some(ref mut content) = self.content {
            content.characters(&mut self.context, text)?;
        }
        if let Some(ref mut ids) = self.ids {
            ids.characters(text);
        }
        Ok(())
    }

    fn had_error(&self) -> bool {
        self.context.had_error()
    }

    fn reset(&mut self) {
        self.context.clear();
        if let Some(ref mut ids) = self.ids {
            ids.reset();
        }
        if let Some(ref mut content) = self.content {
            content.reset();
        }
    }

    fn content_model(&self) -> Option<&ContentModelTracker> {
        self.content.as_ref()
    }
}

/// A schema that checks only ID/IDREF integrity
#[derive(Debug, Clone)]
pub struct IdSchema {
    id_types: Arc<IdTypeMap>,
    limits: Limits,
}

impl IdSchema {
    /// Create a schema for the roles in `id_types`
    pub fn new(id_types: Arc<IdTypeMap>, limits: Limits) -> Self {
        Self { id_types, limits }
    }

    /// ID roles of attributes and elements
    pub fn id_type_map(&self) -> &IdTypeMap {
        &self.id_types
    }
}

impl Schema for IdSchema {
    fn create_validator(&self, properties: ValidatorProperties) -> Box<dyn Validator> {
        Box::new(IdValidator::new(
            self.id_types.clone(),
            self.limits.clone(),
            properties,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_json() {
        let options =
            SchemaOptions::from_json(r#"{"check_id_idref": false, "limits": {"max_xml_depth": 5}}"#)
                .unwrap();
        assert!(!options.check_id_idref);
        assert!(options.track_content_model);
        assert_eq!(options.limits.max_xml_depth, 5);
        assert_eq!(options.limits.max_attributes, Limits::default().max_attributes);
    }

    #[test]
    fn test_options_from_bad_json() {
        assert!(matches!(
            SchemaOptions::from_json("{"),
            Err(crate::error::Error::Config(_))
        ));
    }

    #[test]
    fn test_schema_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RelaxNgSchema>();
        assert_send_sync::<IdSchema>();
    }
}
