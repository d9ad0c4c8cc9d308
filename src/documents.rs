//! Streaming documents through validators
//!
//! This module reads an XML document with `quick-xml` and replays it as
//! [`Validator`] events: namespace declarations become prefix mappings, names
//! are resolved against the in-scope declarations, and each event carries the
//! line and column where it starts.

use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

use crate::error::{Error, Result};
use crate::locations::SourceLocation;
use crate::namespaces::{NamespaceContext, QName};
use crate::validators::{Attribute, Validator};

/// Unparsed entity declarations in an internal subset
static UNPARSED_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<!ENTITY\s+([^\s%]+)\s+(?:PUBLIC\s+(?:"([^"]*)"|'([^']*)')\s+|SYSTEM\s+)(?:"([^"]*)"|'([^']*)')\s+NDATA\s+([^\s>]+)\s*>"#,
    )
    .expect("valid regex")
});

/// An unparsed entity declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparsedEntity {
    /// Entity name
    pub name: String,
    /// Public identifier, if declared
    pub public_id: Option<String>,
    /// System identifier
    pub system_id: String,
    /// Name of the NDATA notation
    pub notation: String,
}

/// Find the unparsed entity declarations in a document type declaration
pub fn unparsed_entities(doctype: &str) -> Vec<UnparsedEntity> {
    UNPARSED_ENTITY
        .captures_iter(doctype)
        .map(|caps| {
            let text = |a: usize, b: usize| caps.get(a).or_else(|| caps.get(b)).map(|m| m.as_str());
            UnparsedEntity {
                name: caps[1].to_string(),
                public_id: text(2, 3).map(String::from),
                system_id: text(4, 5).unwrap_or_default().to_string(),
                notation: caps[6].to_string(),
            }
        })
        .collect()
}

// One open element: its name and the prefixes it declared
struct OpenElement {
    name: QName,
    qname: String,
    prefixes: Vec<String>,
}

struct Driver<'v> {
    validator: &'v mut dyn Validator,
    namespaces: NamespaceContext,
    open: Vec<OpenElement>,
}

impl<'v> Driver<'v> {
    fn start(&mut self, start: &BytesStart<'_>) -> Result<()> {
        let qname = utf8(start.name().as_ref())?.to_string();
        let mut declared = Vec::new();
        let mut raw_attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;
            let key = utf8(attr.key.as_ref())?.to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .into_owned();
            if key == "xmlns" {
                declared.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declared.push((prefix.to_string(), value));
            } else {
                raw_attributes.push((key, value));
            }
        }

        self.namespaces.push_scope();
        let mut prefixes = Vec::with_capacity(declared.len());
        for (prefix, uri) in declared {
            self.validator.start_prefix_mapping(&prefix, &uri)?;
            self.namespaces.add_prefix(prefix.as_str(), uri);
            prefixes.push(prefix);
        }

        let name = self.namespaces.resolve(&qname)?;
        let attributes = raw_attributes
            .into_iter()
            .map(|(key, value)| {
                let name = self.namespaces.resolve_attribute(&key)?;
                Ok(Attribute::new(name, key, value))
            })
            .collect::<Result<Vec<_>>>()?;
        self.validator.start_element(&name, &qname, &attributes)?;
        self.open.push(OpenElement {
            name,
            qname,
            prefixes,
        });
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let element = match self.open.pop() {
            Some(element) => element,
            None => return Err(Error::Xml("Unexpected end tag".to_string())),
        };
        self.validator.end_element(&element.name, &element.qname)?;
        for prefix in &element.prefixes {
            self.validator.end_prefix_mapping(prefix)?;
        }
        self.namespaces.pop_scope();
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.validator.characters(text)
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Xml(format!("Invalid UTF-8: {}", e)))
}

/// Validate `xml` with `validator`.
///
/// Returns whether the document was valid; diagnostics go to the validator's
/// error handler. Malformed XML is an [`Error::Xml`], and an aborted
/// validation returns the error that aborted it.
pub fn validate_str(xml: &str, validator: &mut dyn Validator) -> Result<bool> {
    let mut reader = Reader::from_str(xml);
    reader.check_end_names(true);

    let mut driver = Driver {
        validator,
        namespaces: NamespaceContext::new(),
        open: Vec::new(),
    };
    driver.validator.set_location(Some(SourceLocation::from_offset(None, xml, 0)));
    driver.validator.start_document()?;

    loop {
        let position = reader.buffer_position();
        let event = reader.read_event().map_err(|e| {
            Error::Xml(format!(
                "Error parsing XML at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;
        driver
            .validator
            .set_location(Some(SourceLocation::from_offset(None, xml, position)));
        match event {
            Event::Start(e) => driver.start(&e)?,
            Event::Empty(e) => {
                driver.start(&e)?;
                driver.end()?;
            }
            Event::End(_) => driver.end()?,
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                driver.text(&text)?;
            }
            Event::CData(e) => {
                let bytes = e.into_inner();
                driver.text(utf8(&bytes)?)?;
            }
            Event::DocType(e) => {
                let doctype = utf8(&e)?;
                for entity in unparsed_entities(doctype) {
                    driver.validator.unparsed_entity_decl(
                        &entity.name,
                        entity.public_id.as_deref(),
                        &entity.system_id,
                        &entity.notation,
                    )?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !driver.open.is_empty() {
        return Err(Error::Xml("Unexpected end of document".to_string()));
    }
    driver.validator.end_document()?;
    Ok(!driver.validator.had_error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
        location: Option<SourceLocation>,
    }

    impl Recorder {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl Validator for Recorder {
        fn set_location(&mut self, location: Option<SourceLocation>) {
            self.location = location;
        }
        fn start_document(&mut self) -> Result<()> {
            self.push("start".into());
            Ok(())
        }
        fn end_document(&mut self) -> Result<()> {
            self.push("end".into());
            Ok(())
        }
        fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()> {
            self.push(format!("xmlns:{}={}", prefix, uri));
            Ok(())
        }
        fn end_prefix_mapping(&mut self, prefix: &str) -> Result<()> {
            self.push(format!("/xmlns:{}", prefix));
            Ok(())
        }
        fn start_element(
            &mut self,
            name: &QName,
            _qname: &str,
            attributes: &[Attribute],
        ) -> Result<()> {
            let mut event = format!("<{}", name);
            for attribute in attributes {
                event.push_str(&format!(" {}={}", attribute.name, attribute.value));
            }
            if let Some(ref location) = self.location {
                event.push_str(&format!(" @{}", location.line));
            }
            self.push(event);
            Ok(())
        }
        fn end_element(&mut self, name: &QName, _qname: &str) -> Result<()> {
            self.push(format!("</{}>", name));
            Ok(())
        }
        fn characters(&mut self, text: &str) -> Result<()> {
            self.push(format!("{:?}", text));
            Ok(())
        }
        fn unparsed_entity_decl(
            &mut self,
            name: &str,
            _public_id: Option<&str>,
            system_id: &str,
            notation: &str,
        ) -> Result<()> {
            self.push(format!("entity {} {} {}", name, system_id, notation));
            Ok(())
        }
        fn had_error(&self) -> bool {
            false
        }
        fn reset(&mut self) {}
    }

    fn events(xml: &str) -> Vec<String> {
        let mut recorder = Recorder::default();
        let events = recorder.events.clone();
        assert!(validate_str(xml, &mut recorder).unwrap());
        let result = events.lock().unwrap().clone();
        result
    }

    #[test]
    fn test_namespaces_and_locations() {
        let xml = "<r xmlns='urn:a' xmlns:b='urn:b'>\n  <b:c b:x='1&amp;2' y='3'/>\n</r>";
        assert_eq!(
            events(xml),
            vec![
                "start",
                "xmlns:=urn:a",
                "xmlns:b=urn:b",
                "<{urn:a}r @1",
                "\"\\n  \"",
                "<{urn:b}c {urn:b}x=1&2 y=3 @2",
                "</{urn:b}c>",
                "\"\\n\"",
                "</{urn:a}r>",
                "/xmlns:",
                "/xmlns:b",
                "end",
            ]
        );
    }

    #[test]
    fn test_cdata_and_entities() {
        let xml = "<!DOCTYPE r [<!ENTITY logo SYSTEM \"logo.png\" NDATA png>]><r><![CDATA[a<b]]></r>";
        let events = events(xml);
        assert!(events.contains(&"entity logo logo.png png".to_string()));
        assert!(events.contains(&"\"a<b\"".to_string()));
    }

    #[test]
    fn test_malformed() {
        let mut recorder = Recorder::default();
        assert!(matches!(
            validate_str("<a><b></a>", &mut recorder),
            Err(Error::Xml(_))
        ));
        assert!(matches!(
            validate_str("<a>", &mut recorder),
            Err(Error::Xml(_))
        ));
    }

    #[test]
    fn test_unknown_prefix() {
        let mut recorder = Recorder::default();
        assert!(matches!(
            validate_str("<p:a/>", &mut recorder),
            Err(Error::Namespace(_))
        ));
    }

    #[test]
    fn test_unparsed_entities_public() {
        let entities =
            unparsed_entities("r [<!ENTITY pic PUBLIC '-//X//pic' 'pic.gif' NDATA gif>]");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].public_id.as_deref(), Some("-//X//pic"));
        assert_eq!(entities[0].system_id, "pic.gif");
        assert_eq!(entities[0].notation, "gif");
    }
}
