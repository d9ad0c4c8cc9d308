//! Documents streamed through compiled RELAX NG schemas

use pretty_assertions::assert_eq;
use xmlsuggest::documents::validate_str;
use xmlsuggest::namespaces::QName;
use xmlsuggest::pattern::{Datatype, NameClass, SchemaPatternBuilder};
use xmlsuggest::validators::{
    Attribute, DiagnosticCollector, Schema, SchemaOptions, ValidatorProperties,
};
use xmlsuggest::{Error, Limits, RelaxNgSchema};

const NS: &str = "urn:example:book";

// book { attribute version { token }, title { text }, chapter { mixed { em { text }* } }+ }
fn book_schema(options: &SchemaOptions) -> RelaxNgSchema {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let token = b.make_data(Datatype::token(), vec![]);
    let version = b.make_attribute(NameClass::local("version"), token, None);
    let title = b.make_element(NameClass::name(NS, "title"), text, None);
    let em = b.make_element(NameClass::name(NS, "em"), text, None);
    let ems = b.make_zero_or_more(em);
    let mixed = b.make_mixed(ems);
    let chapter = b.make_element(NameClass::name(NS, "chapter"), mixed, None);
    let chapters = b.make_one_or_more(chapter);
    let body = b.make_group(title, chapters);
    let content = b.make_group(version, body);
    let book = b.make_element(NameClass::name(NS, "book"), content, None);
    b.compile(book, options).unwrap()
}

fn messages(schema: &RelaxNgSchema, xml: &str) -> (bool, Vec<String>) {
    let collector = DiagnosticCollector::new();
    let mut validator =
        schema.create_validator(ValidatorProperties::new().with_error_handler(collector.handler()));
    let valid = validate_str(xml, validator.as_mut()).unwrap();
    let messages = collector.errors().into_iter().map(|d| d.message).collect();
    (valid, messages)
}

#[test]
fn test_valid_book() {
    let schema = book_schema(&SchemaOptions::default());
    let xml = r#"<b:book xmlns:b="urn:example:book" version="1">
  <b:title>Rust</b:title>
  <b:chapter>Some <b:em>mixed</b:em> text</b:chapter>
</b:book>"#;
    let (valid, messages) = messages(&schema, xml);
    assert!(valid, "{:?}", messages);
}

#[test]
fn test_default_namespace() {
    let schema = book_schema(&SchemaOptions::default());
    let xml = r#"<book xmlns="urn:example:book" version="1"><title/><chapter/></book>"#;
    assert!(messages(&schema, xml).0);
}

#[test]
fn test_reports_misplaced_content() {
    let schema = book_schema(&SchemaOptions::default());
    let xml = r#"<book xmlns="urn:example:book" lang="en">
  stray
  <title/>
  <em/>
</book>"#;
    let (valid, messages) = messages(&schema, xml);
    assert!(!valid);
    assert_eq!(
        messages,
        vec![
            "attribute \"lang\" not allowed on element \"{urn:example:book}book\"",
            "text not allowed in element \"{urn:example:book}book\"",
            "element \"{urn:example:book}em\" not allowed in element \"{urn:example:book}book\"",
        ]
    );
}

#[test]
fn test_wrong_namespace_root() {
    let schema = book_schema(&SchemaOptions::default());
    let (valid, messages) = messages(&schema, "<book/>");
    assert!(!valid);
    assert_eq!(messages, vec!["undeclared root element \"book\""]);
}

#[test]
fn test_suggestions_at_position() {
    let schema = book_schema(&SchemaOptions::default());
    let mut validator = schema.create_validator(ValidatorProperties::new());
    let book = QName::new(NS, "book");
    validator.start_document().unwrap();
    validator
        .start_element(&book, "book", &[Attribute::local("version", "1")])
        .unwrap();

    let tracker = validator.content_model().unwrap();
    assert_eq!(
        tracker.expected_elements(),
        vec![NameClass::name(NS, "title"), NameClass::name(NS, "chapter")]
    );
    assert_eq!(
        tracker.expected_attributes(),
        vec![NameClass::local("version")]
    );
    assert!(!tracker.text_allowed());

    let chapter = QName::new(NS, "chapter");
    validator.start_element(&chapter, "chapter", &[]).unwrap();
    let tracker = validator.content_model().unwrap();
    assert!(tracker.text_allowed());
    assert_eq!(tracker.expected_elements(), vec![NameClass::name(NS, "em")]);
    assert!(!validator.had_error());
}

#[test]
fn test_tracking_disabled() {
    let options = SchemaOptions {
        track_content_model: false,
        ..SchemaOptions::default()
    };
    let schema = book_schema(&options);
    assert!(schema.content_model().is_none());
    let validator = schema.create_validator(ValidatorProperties::new());
    assert!(validator.content_model().is_none());
    assert!(messages(&schema, "<anything/>").0);
}

#[test]
fn test_validator_reuse() {
    let schema = book_schema(&SchemaOptions::default());
    let mut validator = schema.create_validator(ValidatorProperties::new());
    assert!(!validate_str("<book/>", validator.as_mut()).unwrap());
    validator.reset();
    let xml = r#"<book xmlns="urn:example:book" version="2"><title/><chapter/></book>"#;
    assert!(validate_str(xml, validator.as_mut()).unwrap());
}

#[test]
fn test_document_depth_limit() {
    let options = SchemaOptions::default().with_limits(Limits {
        max_xml_depth: 2,
        ..Limits::default()
    });
    let schema = book_schema(&options);
    let collector = DiagnosticCollector::new();
    let mut validator =
        schema.create_validator(ValidatorProperties::new().with_error_handler(collector.handler()));
    let xml = r#"<book xmlns="urn:example:book" version="1"><chapter><em><x/></em></chapter></book>"#;
    match validate_str(xml, validator.as_mut()) {
        Err(Error::Aborted(diagnostic)) => assert!(diagnostic.message.contains("depth")),
        other => panic!("expected an aborted validation, got {:?}", other),
    }
    assert!(validator.had_error());
}

#[test]
fn test_schema_shared_across_threads() {
    let schema = book_schema(&SchemaOptions::default());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let schema = schema.clone();
            std::thread::spawn(move || {
                let xml = format!(
                    r#"<book xmlns="urn:example:book" version="{}"><title/><chapter/></book>"#,
                    i
                );
                let mut validator = schema.create_validator(ValidatorProperties::new());
                validate_str(&xml, validator.as_mut()).unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
