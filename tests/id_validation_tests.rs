//! ID/IDREF typing and document-level integrity checks

use pretty_assertions::assert_eq;
use xmlsuggest::documents::validate_str;
use xmlsuggest::pattern::{Datatype, IdType, NameClass, PatternId, SchemaPatternBuilder};
use xmlsuggest::validators::{
    DiagnosticCollector, Schema, SchemaOptions, Severity, ValidatorProperties,
};
use xmlsuggest::namespaces::QName;
use xmlsuggest::{Error, RelaxNgSchema};

// doc { (section { attribute id { xsd:ID }, attribute see { xsd:IDREF }? } | label { xsd:ID })* }
fn schema() -> RelaxNgSchema {
    let mut b = SchemaPatternBuilder::new();
    let id = b.make_data(Datatype::xsd("ID"), vec![]);
    let idref = b.make_data(Datatype::xsd("IDREF"), vec![]);
    let id_attr = b.make_attribute(NameClass::local("id"), id, None);
    let see_attr = b.make_attribute(NameClass::local("see"), idref, None);
    let optional_see = b.make_optional(see_attr);
    let section_content = b.make_group(id_attr, optional_see);
    let section = b.make_element(NameClass::local("section"), section_content, None);
    let label = b.make_element(NameClass::local("label"), id, None);
    let choice = b.make_choice(section, label);
    let items = b.make_zero_or_more(choice);
    let doc = b.make_element(NameClass::local("doc"), items, None);
    b.compile(doc, &SchemaOptions::default()).unwrap()
}

fn validate(schema: &dyn Schema, xml: &str) -> (bool, DiagnosticCollector) {
    let collector = DiagnosticCollector::new();
    let mut validator = schema.create_validator(
        ValidatorProperties::new()
            .with_error_handler(collector.handler())
            .with_system_id("doc.xml"),
    );
    let valid = validate_str(xml, validator.as_mut()).unwrap();
    (valid, collector)
}

#[test]
fn test_id_type_map() {
    let schema = schema();
    let map = schema.id_type_map();
    assert_eq!(
        map.attribute_id_type(&QName::local("section"), &QName::local("id")),
        Some(IdType::Id)
    );
    assert_eq!(
        map.attribute_id_type(&QName::local("section"), &QName::local("see")),
        Some(IdType::Idref)
    );
    assert_eq!(map.element_id_type(&QName::local("label")), Some(IdType::Id));
    assert_eq!(map.element_id_type(&QName::local("doc")), None);
}

#[test]
fn test_valid_references() {
    let schema = schema();
    let xml = r#"<doc><section id="a" see="b"/><label> b </label></doc>"#;
    let (valid, collector) = validate(&schema, xml);
    assert!(valid, "{:?}", collector.diagnostics());
    assert!(collector.diagnostics().is_empty());
}

#[test]
fn test_duplicate_id() {
    let schema = schema();
    let xml = "<doc>\n<section id=\"a\"/>\n<section id=\"a\"/>\n</doc>";
    let (valid, collector) = validate(&schema, xml);
    assert!(!valid);
    let diagnostics = collector.diagnostics();
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].message, "ID \"a\" has already been defined");
    assert_eq!(diagnostics[0].location.as_ref().map(|l| l.line), Some(3));
    assert_eq!(diagnostics[1].severity, Severity::Warning);
    assert_eq!(diagnostics[1].location.as_ref().map(|l| l.line), Some(2));
    assert_eq!(
        diagnostics[1].location.as_ref().and_then(|l| l.system_id.as_deref()),
        Some("doc.xml")
    );
}

#[test]
fn test_dangling_reference() {
    let schema = schema();
    let xml = r#"<doc><section id="a" see="nowhere"/></doc>"#;
    let (valid, collector) = validate(&schema, xml);
    assert!(!valid);
    assert_eq!(
        collector.errors()[0].message,
        "IDREF \"nowhere\" without matching ID"
    );
}

#[test]
fn test_id_schema_alone() {
    let schema = schema();
    let ids = schema.id_schema();
    // an undeclared element is no concern of the ID-only schema
    let xml = r#"<doc><other/><section id="a"/><section id="a"/></doc>"#;
    let (valid, collector) = validate(&ids, xml);
    assert!(!valid);
    assert_eq!(collector.errors().len(), 1);
}

#[test]
fn test_checking_disabled() {
    let mut b = SchemaPatternBuilder::new();
    let id = b.make_data(Datatype::xsd("ID"), vec![]);
    let doc = b.make_element(NameClass::local("doc"), id, None);
    let options = SchemaOptions {
        check_id_idref: false,
        ..SchemaOptions::default()
    };
    let schema = b.compile(doc, &options).unwrap();
    assert!(schema.id_type_map().is_empty());
}

fn id_conflict(build: impl FnOnce(&mut SchemaPatternBuilder) -> PatternId) -> String {
    let mut b = SchemaPatternBuilder::new();
    let start = build(&mut b);
    match b.compile(start, &SchemaOptions::default()) {
        Err(Error::Restriction(violation)) => violation.code().to_string(),
        other => panic!("expected a restriction violation, got {:?}", other),
    }
}

#[test]
fn test_conflicting_id_types() {
    let code = id_conflict(|b| {
        let id = b.make_data(Datatype::xsd("ID"), vec![]);
        let idref = b.make_data(Datatype::xsd("IDREF"), vec![]);
        let a1 = b.make_attribute(NameClass::local("k"), id, None);
        let a2 = b.make_attribute(NameClass::local("k"), idref, None);
        let e1 = b.make_element(NameClass::local("item"), a1, None);
        let e2 = b.make_element(NameClass::local("item"), a2, None);
        let content = b.make_choice(e1, e2);
        b.make_element(NameClass::local("doc"), content, None)
    });
    assert_eq!(code, "id_type_conflict");
}

#[test]
fn test_id_on_open_element_name() {
    let code = id_conflict(|b| {
        let id = b.make_data(Datatype::xsd("ID"), vec![]);
        let attr = b.make_attribute(NameClass::local("id"), id, None);
        b.make_element(NameClass::AnyName, attr, None)
    });
    assert_eq!(code, "id_element_name_class");
}

#[test]
fn test_id_inside_list() {
    let code = id_conflict(|b| {
        let id = b.make_data(Datatype::xsd("ID"), vec![]);
        let list = b.make_list(id, None);
        let attr = b.make_attribute(NameClass::local("ids"), list, None);
        b.make_element(NameClass::local("doc"), attr, None)
    });
    assert_eq!(code, "id_parent");
}

#[test]
fn test_element_declared_with_and_without_id_content() {
    // root { a { key { xsd:ID } }, b { key { text } } }
    let code = id_conflict(|b| {
        let id = b.make_data(Datatype::xsd("ID"), vec![]);
        let text = b.make_text();
        let id_key = b.make_element(NameClass::local("key"), id, None);
        let text_key = b.make_element(NameClass::local("key"), text, None);
        let a = b.make_element(NameClass::local("a"), id_key, None);
        let other = b.make_element(NameClass::local("b"), text_key, None);
        let both = b.make_group(a, other);
        b.make_element(NameClass::local("root"), both, None)
    });
    assert_eq!(code, "id_type_conflict");
}
