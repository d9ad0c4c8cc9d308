//! ID/IDREF/IDREFS validation
//!
//! Checks that ID values are unique within a document and that every IDREF
//! names some ID. Which attributes and elements carry these roles comes from
//! the schema's [`IdTypeMap`].

use indexmap::IndexMap;
use log::trace;
use std::sync::Arc;

use super::base::{Attribute, Validator, ValidatorProperties};
use super::validation::ValidationContext;
use crate::error::Result;
use crate::limits::Limits;
use crate::locations::SourceLocation;
use crate::names::{is_valid_ncname, single_token, tokens};
use crate::namespaces::QName;
use crate::pattern::{IdType, IdTypeMap};

#[derive(Debug)]
struct ElementValue {
    id_type: IdType,
    text: String,
    location: Option<SourceLocation>,
}

/// ID bookkeeping for one document
#[derive(Debug)]
pub struct IdTracker {
    id_types: Arc<IdTypeMap>,
    // first declaration of each ID
    ids: IndexMap<String, Option<SourceLocation>>,
    // every location that referenced each value
    refs: IndexMap<String, Vec<Option<SourceLocation>>>,
    // one entry per open element; `Some` when its content is ID-typed
    open_elements: Vec<Option<ElementValue>>,
}

impl IdTracker {
    /// Create a tracker for the roles in `id_types`
    pub fn new(id_types: Arc<IdTypeMap>) -> Self {
        Self {
            id_types,
            ids: IndexMap::new(),
            refs: IndexMap::new(),
            open_elements: Vec::new(),
        }
    }

    /// Forget everything seen so far
    pub fn reset(&mut self) {
        self.ids.clear();
        self.refs.clear();
        self.open_elements.clear();
    }

    /// Check the ID-typed attributes of a start tag
    pub fn start_element(
        &mut self,
        context: &mut ValidationContext,
        name: &QName,
        attributes: &[Attribute],
    ) -> Result<()> {
        let location = context.location().cloned();
        for attribute in attributes {
            if let Some(id_type) = self.id_types.attribute_id_type(name, &attribute.name) {
                self.check_value(context, id_type, &attribute.value, location.clone())?;
            }
        }
        let value = self
            .id_types
            .element_id_type(name)
            .map(|id_type| ElementValue {
                id_type,
                text: String::new(),
                location,
            });
        self.open_elements.push(value);
        Ok(())
    }

    /// Buffer text of an ID-typed element
    pub fn characters(&mut self, text: &str) {
        if let Some(Some(value)) = self.open_elements.last_mut() {
            value.text.push_str(text);
        }
    }

    /// Check the buffered value of an ID-typed element
    pub fn end_element(&mut self, context: &mut ValidationContext) -> Result<()> {
        if let Some(Some(value)) = self.open_elements.pop() {
            self.check_value(context, value.id_type, &value.text, value.location)?;
        }
        Ok(())
    }

    /// Report every reference to an undeclared ID
    pub fn end_document(&mut self, context: &mut ValidationContext) -> Result<()> {
        for (value, locations) in &self.refs {
            if self.ids.contains_key(value) {
                continue;
            }
            for location in locations {
                context.error_at(
                    format!("IDREF \"{}\" without matching ID", value),
                    location.clone(),
                )?;
            }
        }
        Ok(())
    }

    /// Whether `id` has been declared
    pub fn check_idref(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    fn check_value(
        &mut self,
        context: &mut ValidationContext,
        id_type: IdType,
        value: &str,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        trace!("{} value {:?}", id_type, value);
        match id_type {
            IdType::Id => match single_token(value).filter(|t| is_valid_ncname(t)) {
                Some(id) => self.register_id(context, id, location),
                None => context.error_at(format!("invalid ID value \"{}\"", value), location),
            },
            IdType::Idref => match single_token(value).filter(|t| is_valid_ncname(t)) {
                Some(idref) => {
                    self.add_ref(idref, location);
                    Ok(())
                }
                None => context.error_at(format!("invalid IDREF value \"{}\"", value), location),
            },
            IdType::Idrefs => {
                let values: Vec<&str> = tokens(value).collect();
                if values.is_empty() {
                    return context.error_at("IDREFS value must not be empty", location);
                }
                for idref in values {
                    if is_valid_ncname(idref) {
                        self.add_ref(idref, location.clone());
                    } else {
                        context.error_at(
                            format!("invalid IDREFS token \"{}\"", idref),
                            location.clone(),
                        )?;
                    }
                }
                Ok(())
            }
        }
    }

    fn register_id(
        &mut self,
        context: &mut ValidationContext,
        id: &str,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        match self.ids.get(id) {
            Some(first) => {
                let first = first.clone();
                context.error_at(
                    format!("ID \"{}\" has already been defined", id),
                    location,
                )?;
                context.warning_at(format!("first occurrence of ID \"{}\"", id), first)
            }
            None => {
                self.ids.insert(id.to_string(), location);
                Ok(())
            }
        }
    }

    fn add_ref(&mut self, idref: &str, location: Option<SourceLocation>) {
        self.refs.entry(idref.to_string()).or_default().push(location);
    }
}

/// A validator that only checks ID/IDREF integrity
#[derive(Debug)]
pub struct IdValidator {
    context: ValidationContext,
    tracker: IdTracker,
}

impl IdValidator {
    /// Create a validator for `id_types`
    pub fn new(id_types: Arc<IdTypeMap>, limits: Limits, properties: ValidatorProperties) -> Self {
        Self {
            context: ValidationContext::new(properties.error_handler)
                .with_limits(limits)
                .with_system_id(properties.system_id),
            tracker: IdTracker::new(id_types),
        }
    }
}

impl Validator for IdValidator {
    fn set_location(&mut self, location: Option<SourceLocation>) {
        self.context.set_location(location);
    }

    fn start_document(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        self.tracker.end_document(&mut self.context)
    }

    fn start_prefix_mapping(&mut self, _prefix: &str, _uri: &str) -> Result<()> {
        Ok(())
    }

    fn end_prefix_mapping(&mut self, _prefix: &str) -> Result<()> {
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &QName,
        _qname: &str,
        attributes: &[Attribute],
    ) -> Result<()> {
        self.context.enter_level(attributes.len())?;
        self.tracker
            .start_element(&mut self.context, name, attributes)
    }

    fn end_element(&mut self, _name: &QName, _qname: &str) -> Result<()> {
        self.context.exit_level();
        self.tracker.end_element(&mut self.context)
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        self.tracker.characters(text);
        Ok(())
    }

    fn had_error(&self) -> bool {
        self.context.had_error()
    }

    fn reset(&mut self) {
        self.context.clear();
        self.tracker.reset();
    }
}
