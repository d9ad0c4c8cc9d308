//! Reference expansion and the recursion guard

use pretty_assertions::assert_eq;
use xmlsuggest::pattern::{NameClass, PatternKind, SchemaPatternBuilder};
use xmlsuggest::validators::SchemaOptions;
use xmlsuggest::{Error, Limits, RecursionError, SourceLocation};

#[test]
fn test_recursion_through_element_is_allowed() {
    // list = element item { ref list? }
    let mut b = SchemaPatternBuilder::new();
    let list_ref = b.make_ref("list", None);
    let optional = b.make_optional(list_ref);
    let item = b.make_element(NameClass::local("item"), optional, None);
    b.define("list", item).unwrap();
    let start = b.make_ref("list", None);

    let schema = b.compile(start, &SchemaOptions::default()).unwrap();
    let graph = schema.graph();
    let PatternKind::Element(element) = graph.kind(schema.start()) else {
        panic!("start should expand to the element");
    };
    // the element's content refers back to the element itself
    let content = graph.element(*element).content;
    let PatternKind::Choice(p1, p2) = graph.kind(content) else {
        panic!("content should be optional");
    };
    assert!([*p1, *p2].contains(&schema.start()));
}

#[test]
fn test_unguarded_recursion() {
    // a = ref a, element x { empty }
    let mut b = SchemaPatternBuilder::new();
    let loc = SourceLocation::new(Some("loop.rnc"), 2, 9);
    let self_ref = b.make_ref("a", Some(loc.clone()));
    let empty = b.make_empty();
    let x = b.make_element(NameClass::local("x"), empty, None);
    let body = b.make_group(self_ref, x);
    b.define("a", body).unwrap();
    let start = b.make_ref("a", None);

    match b.compile(start, &SchemaOptions::default()) {
        Err(Error::Recursion(RecursionError::RecursiveReference { name, location })) => {
            assert_eq!(name, "a");
            assert_eq!(location, Some(loc));
        }
        other => panic!("expected a recursive reference, got {:?}", other),
    }
}

#[test]
fn test_mutual_recursion() {
    // a = ref b, b = ref a | empty
    let mut b = SchemaPatternBuilder::new();
    let ref_b = b.make_ref("b", None);
    let ref_a = b.make_ref("a", None);
    let empty = b.make_empty();
    let body_b = b.make_choice(ref_a, empty);
    b.define("a", ref_b).unwrap();
    b.define("b", body_b).unwrap();
    let doc = b.make_element(NameClass::local("doc"), ref_a, None);

    let err = b.compile(doc, &SchemaOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::Recursion(RecursionError::RecursiveReference { .. })
    ));
}

#[test]
fn test_undefined_reference() {
    let mut b = SchemaPatternBuilder::new();
    let missing = b.make_ref("missing", Some(SourceLocation::new(Some("s.rnc"), 1, 1)));
    let doc = b.make_element(NameClass::local("doc"), missing, None);
    match b.compile(doc, &SchemaOptions::default()) {
        Err(Error::UndefinedReference { name, location }) => {
            assert_eq!(name, "missing");
            assert_eq!(location.map(|l| l.line), Some(1));
        }
        other => panic!("expected an undefined reference, got {:?}", other),
    }
}

#[test]
fn test_duplicate_definition() {
    let mut b = SchemaPatternBuilder::new();
    let empty = b.make_empty();
    b.define("a", empty).unwrap();
    assert!(matches!(b.define("a", empty), Err(Error::Schema(_))));
}

#[test]
fn test_depth_limit() {
    // e0 { e1 { e2 { ... } } }
    let mut b = SchemaPatternBuilder::new();
    let mut content = b.make_empty();
    for i in 0..10 {
        content = b.make_element(NameClass::local(format!("e{}", i)), content, None);
    }
    let options = SchemaOptions::default().with_limits(Limits {
        max_recursion_depth: 5,
        ..Limits::default()
    });
    assert!(matches!(
        b.clone().compile(content, &options),
        Err(Error::Recursion(RecursionError::DepthExceeded { limit: 5, .. }))
    ));
    assert!(b.compile(content, &SchemaOptions::default()).is_ok());
}

#[test]
fn test_pattern_limit() {
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let doc = b.make_element(NameClass::local("doc"), text, None);
    let options = SchemaOptions::default().with_limits(Limits {
        max_patterns: 2,
        ..Limits::default()
    });
    assert!(matches!(
        b.compile(doc, &options),
        Err(Error::LimitExceeded(_))
    ));
}

#[test]
fn test_check_recursion_direct_self_reference() {
    // a = ref a
    let mut b = SchemaPatternBuilder::new();
    let loc = SourceLocation::new(Some("self.rnc"), 1, 5);
    let self_ref = b.make_ref("a", Some(loc.clone()));
    b.define("a", self_ref).unwrap();

    match b.check_recursion(self_ref, &Limits::default()) {
        Err(Error::Recursion(RecursionError::RecursiveReference { name, location })) => {
            assert_eq!(name, "a");
            assert_eq!(location, Some(loc));
        }
        other => panic!("expected a recursive reference, got {:?}", other),
    }
}

#[test]
fn test_check_recursion_mutual_reference() {
    // a = ref b, b = ref a | text
    let mut b = SchemaPatternBuilder::new();
    let ref_a = b.make_ref("a", None);
    let ref_b = b.make_ref("b", None);
    let text = b.make_text();
    let body_b = b.make_choice(ref_a, text);
    b.define("a", ref_b).unwrap();
    b.define("b", body_b).unwrap();

    assert!(matches!(
        b.check_recursion(ref_a, &Limits::default()),
        Err(Error::Recursion(RecursionError::RecursiveReference { .. }))
    ));
}

#[test]
fn test_check_recursion_shared_definition_is_allowed() {
    // doc { ref a, ref a }, a = text
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    b.define("a", text).unwrap();
    let ref_a = b.make_ref("a", None);
    let twice = b.make_group(ref_a, ref_a);
    let doc = b.make_element(NameClass::local("doc"), twice, None);
    assert!(b.check_recursion(doc, &Limits::default()).is_ok());
}

#[test]
fn test_nested_elements_within_default_limit() {
    // e3999 { ... e1 { e0 { empty } } ... }
    let mut b = SchemaPatternBuilder::new();
    let mut content = b.make_empty();
    for i in 0..4_000 {
        content = b.make_element(NameClass::local(format!("e{}", i)), content, None);
    }
    assert!(Limits::default().max_recursion_depth > 4_000);
    let schema = b.compile(content, &SchemaOptions::default()).unwrap();
    assert_eq!(schema.graph().element_count(), 4_000);
}

#[test]
fn test_long_group_chain_exceeds_depth() {
    // doc { text, text, ... } nested far past the limit
    let mut b = SchemaPatternBuilder::new();
    let text = b.make_text();
    let mut content = text;
    for _ in 0..50_000 {
        content = b.make_group(content, text);
    }
    let doc = b.make_element(NameClass::local("doc"), content, None);

    let limit = Limits::default().max_recursion_depth;
    assert!(matches!(
        b.check_recursion(doc, &Limits::default()),
        Err(Error::Recursion(RecursionError::DepthExceeded { limit: l, .. })) if l == limit
    ));
    assert!(matches!(
        b.compile(doc, &SchemaOptions::default()),
        Err(Error::Recursion(RecursionError::DepthExceeded { .. }))
    ));
}
