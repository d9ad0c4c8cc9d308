//! Restriction checks run by schema compilation

use pretty_assertions::assert_eq;
use xmlsuggest::pattern::{Datatype, NameClass, PatternId, SchemaPatternBuilder};
use xmlsuggest::validators::SchemaOptions;
use xmlsuggest::{Error, SourceLocation};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn compile_error(builder: SchemaPatternBuilder, start: PatternId) -> (String, Option<SourceLocation>) {
    match builder.compile(start, &SchemaOptions::default()) {
        Err(Error::Restriction(violation)) => (
            violation.code().to_string(),
            violation.location().cloned(),
        ),
        other => panic!("expected a restriction violation, got {:?}", other),
    }
}

fn element(b: &mut SchemaPatternBuilder, name: &str, content: PatternId) -> PatternId {
    b.make_element(NameClass::local(name), content, None)
}

#[test]
fn test_start_with_attribute() {
    init();
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let loc = SourceLocation::new(Some("start.rnc"), 1, 7);
    let attr = b.make_attribute(NameClass::local("a"), text, Some(loc.clone()));
    let (code, location) = compile_error(b, attr);
    assert_eq!(code, "start_contains_attribute");
    assert_eq!(location, Some(loc));
}

#[test]
fn test_start_with_text_or_element() {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let doc = element(&mut b, "doc", text);
    let start = b.make_choice(doc, text);
    let (code, _) = compile_error(b, start);
    assert_eq!(code, "start_contains_text");
}

#[test]
fn test_valid_grammar_compiles() {
    init();
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let title = element(&mut b, "title", text);
    let lang = b.make_attribute(NameClass::local("lang"), text, None);
    let optional_lang = b.make_optional(lang);
    let content = b.make_group(optional_lang, title);
    let doc = element(&mut b, "doc", content);
    let schema = b.compile(doc, &SchemaOptions::default()).unwrap();
    assert_eq!(schema.graph().element_count(), 2);
}

#[test]
fn test_duplicate_attribute() {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let a1 = b.make_attribute(NameClass::local("a"), text, None);
    let token = b.make_data(Datatype::token(), vec![]);
    let a2 = b.make_attribute(NameClass::local("a"), token, None);
    let content = b.make_group(a1, a2);
    let doc = element(&mut b, "doc", content);
    let (code, _) = compile_error(b, doc);
    assert_eq!(code, "duplicate_attribute");
}

#[test]
fn test_attributes_in_alternatives_are_not_duplicates() {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let a1 = b.make_attribute(NameClass::local("a"), text, None);
    let token = b.make_data(Datatype::token(), vec![]);
    let a2 = b.make_attribute(NameClass::local("a"), token, None);
    let content = b.make_choice(a1, a2);
    let doc = element(&mut b, "doc", content);
    assert!(b.compile(doc, &SchemaOptions::default()).is_ok());
}

#[test]
fn test_open_attribute_must_repeat() {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let any = b.make_attribute(NameClass::AnyName, text, None);
    let doc = element(&mut b, "doc", any);
    let (code, _) = compile_error(b, doc);
    assert_eq!(code, "open_name_class_not_repeated");

    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let any = b.make_attribute(NameClass::AnyName, text, None);
    let any = b.make_zero_or_more(any);
    let doc = element(&mut b, "doc", any);
    assert!(b.compile(doc, &SchemaOptions::default()).is_ok());
}

#[test]
fn test_list_restrictions() {
    let mut b = SchemaPatternBuilder::new();
    let token = b.make_data(Datatype::token(), vec![]);
    let inner = b.make_list(token, None);
    let loc = SourceLocation::new(Some("list.rnc"), 4, 2);
    let outer = b.make_list(inner, Some(loc.clone()));
    let doc = element(&mut b, "doc", outer);
    let (code, location) = compile_error(b, doc);
    assert_eq!(code, "list_contains_list");
    assert_eq!(location, Some(loc));
}

#[test]
fn test_data_except_restrictions() {
    let mut b = SchemaPatternBuilder::new();
    let string = b.make_data(Datatype::string(), vec![]);
    let x = b.make_value(Datatype::string(), "x");
    let y = b.make_value(Datatype::string(), "y");
    let group = b.make_group(x, y);
    let except = b.make_data_except(Datatype::string(), vec![], group, None);
    let content = b.make_choice(except, string);
    let doc = element(&mut b, "doc", content);
    let (code, _) = compile_error(b, doc);
    assert_eq!(code, "data_except_contains_group");
}

#[test]
fn test_string_sequences() {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let child = element(&mut b, "child", text);
    let token = b.make_data(Datatype::token(), vec![]);
    let content = b.make_group(child, token);
    let doc = element(&mut b, "doc", content);
    let (code, _) = compile_error(b, doc);
    assert_eq!(code, "group_string");
}

#[test]
fn test_interleave_overlap() {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let a1 = element(&mut b, "a", text);
    let a2 = element(&mut b, "a", text);
    let content = b.make_interleave(a1, a2);
    let doc = element(&mut b, "doc", content);
    let (code, _) = compile_error(b, doc);
    assert_eq!(code, "interleave_element_overlap");
}

#[test]
fn test_interleave_of_text() {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let a = element(&mut b, "a", text);
    let left = b.make_mixed(a);
    let c = element(&mut b, "c", text);
    let right = b.make_mixed(c);
    let content = b.make_interleave(left, right);
    let doc = element(&mut b, "doc", content);
    let (code, _) = compile_error(b, doc);
    assert_eq!(code, "interleave_text_overlap");
}

#[test]
fn test_nested_interleave_overlap() {
    // (a & b) & (c & a) overlaps only through the nested alphabets
    let mut b = SchemaPatternBuilder::new();
    let empty = b.make_empty();
    let a1 = element(&mut b, "a", empty);
    let b1 = element(&mut b, "b", empty);
    let c1 = element(&mut b, "c", empty);
    let a2 = element(&mut b, "a", empty);
    let left = b.make_interleave(a1, b1);
    let right = b.make_interleave(c1, a2);
    let content = b.make_interleave(left, right);
    let doc = element(&mut b, "doc", content);
    let (code, _) = compile_error(b, doc);
    assert_eq!(code, "interleave_element_overlap");
}

#[test]
fn test_xmlns_attribute() {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let xmlns = b.make_attribute(NameClass::local("xmlns"), text, None);
    let doc = element(&mut b, "doc", xmlns);
    let (code, _) = compile_error(b, doc);
    assert_eq!(code, "xmlns_attribute_name");
}

#[test]
fn test_violation_display() {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let loc = SourceLocation::new(Some("s.rnc"), 3, 5);
    let attr = b.make_attribute(NameClass::local("a"), text, Some(loc));
    let err = b.compile(attr, &SchemaOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "restriction violation: found attribute in start pattern (start_contains_attribute) at s.rnc:3:5"
    );
}

#[test]
fn test_repeated_group_with_attribute() {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let attr = b.make_attribute(NameClass::local("a"), text, None);
    let child = element(&mut b, "child", text);
    let group = b.make_group(attr, child);
    let repeated = b.make_one_or_more(group);
    let doc = element(&mut b, "doc", repeated);
    let (code, _) = compile_error(b, doc);
    assert_eq!(code, "one_or_more_contains_group_contains_attribute");
}

#[test]
fn test_disjoint_names_are_accepted() {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let id = b.make_attribute(NameClass::local("id"), text, None);
    let name = b.make_attribute(NameClass::local("name"), text, None);
    let attributes = b.make_group(id, name);
    let a = element(&mut b, "a", text);
    let c = element(&mut b, "b", text);
    let children = b.make_interleave(a, c);
    let content = b.make_group(attributes, children);
    let doc = element(&mut b, "doc", content);
    assert!(b.compile(doc, &SchemaOptions::default()).is_ok());
}
