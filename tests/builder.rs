#[macro_use] extern crate pretty_assertions;

use xmlbranch::*;

fn start(options: ParsingOptions) -> TreeBuilder {
    let mut b = TreeBuilder::new(options);
    b.document_start().unwrap();
    b
}

fn end(mut b: TreeBuilder) -> Document {
    b.document_end().unwrap();
    b.finish().unwrap()
}

fn texts(node: Node) -> Vec<&str> {
    node.children().filter(|n| n.is_text()).filter_map(|n| n.value()).collect()
}

#[test]
fn nested_elements() {
    let mut b = start(ParsingOptions::default());
    b.element_start("root", &[], &[]).unwrap();
    b.element_start("child", &[], &[]).unwrap();
    b.characters("hello").unwrap();
    b.element_end().unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    let root = doc.root_element().unwrap();
    assert_eq!(root.children().count(), 1);

    let child = root.first_child().unwrap();
    assert!(child.has_tag_name("child", None));
    assert_eq!(child.children().count(), 1);
    assert!(child.first_child().unwrap().is_text());
    assert_eq!(child.text(), Some("hello"));
}

#[test]
fn merge_and_ignore_comments() {
    let opt = ParsingOptions {
        merge_adjacent_text: true,
        ignore_comments: true,
        ..ParsingOptions::default()
    };

    let mut b = start(opt);
    b.element_start("p", &[], &[]).unwrap();
    b.characters("a").unwrap();
    b.comment("x").unwrap();
    b.characters("b").unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    let p = doc.root_element().unwrap();
    assert_eq!(p.children().count(), 1);
    assert_eq!(texts(p), vec!["ab"]);
}

#[test]
fn no_merge_by_default() {
    let mut b = start(ParsingOptions::default());
    b.element_start("p", &[], &[]).unwrap();
    b.characters("a").unwrap();
    b.comment("x").unwrap();
    b.characters("b").unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    let p = doc.root_element().unwrap();
    assert_eq!(p.children().count(), 3);
    assert_eq!(texts(p), vec!["a", "b"]);
}

#[test]
fn strip_whitespace() {
    let opt = ParsingOptions { strip_whitespace_text: true, ..ParsingOptions::default() };

    let mut b = start(opt);
    b.element_start("p", &[], &[]).unwrap();
    b.characters("   \n  ").unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    assert_eq!(doc.root_element().unwrap().children().count(), 0);
}

#[test]
fn whitespace_kept_by_default() {
    let mut b = start(ParsingOptions::default());
    b.element_start("p", &[], &[]).unwrap();
    b.characters("   \n  ").unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    assert_eq!(doc.root_element().unwrap().text(), Some("   \n  "));
}

#[test]
fn strip_then_merge() {
    let opt = ParsingOptions {
        strip_whitespace_text: true,
        merge_adjacent_text: true,
        ..ParsingOptions::default()
    };

    let mut b = start(opt);
    b.element_start("p", &[], &[]).unwrap();
    b.characters("a").unwrap();
    b.characters("  ").unwrap();
    b.characters("b").unwrap();
    b.element_end().unwrap();

    // Merging first would have kept the whitespace as part of "a  b".
    let doc = end(b);
    assert_eq!(texts(doc.root_element().unwrap()), vec!["ab"]);
}

#[test]
fn cdata_is_never_merged() {
    let opt = ParsingOptions { merge_adjacent_text: true, ..ParsingOptions::default() };

    let mut b = start(opt);
    b.element_start("p", &[], &[]).unwrap();
    b.characters("a").unwrap();
    b.cdata("b").unwrap();
    b.characters("c").unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    let types: Vec<_> = doc.root_element().unwrap().children().map(|n| n.node_type()).collect();
    assert_eq!(types, vec![NodeType::Text, NodeType::CData, NodeType::Text]);
}

#[test]
fn namespace_scoping() {
    let mut b = start(ParsingOptions::default());
    b.element_start("x:root", &[], &[(Some("x"), "urn:1")]).unwrap();
    b.element_start("mid", &[], &[]).unwrap();
    b.element_start("x:leaf", &[("x:a", "1")], &[]).unwrap();
    b.element_end().unwrap();
    b.element_end().unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    let leaf = doc.root().descendants().find(|n| n.has_tag_name("leaf", Some("urn:1"))).unwrap();
    assert_eq!(leaf.name().unwrap().namespace(), Some("urn:1"));
    assert_eq!(leaf.name().unwrap().prefix(), Some("x"));
    assert_eq!(leaf.attribute("a", Some("urn:1")), Some("1"));
    assert!(leaf.namespaces().is_empty());
}

#[test]
fn scope_ends_with_element() {
    let mut b = start(ParsingOptions::default());
    b.element_start("root", &[], &[]).unwrap();
    b.element_start("a", &[], &[(Some("x"), "urn:1")]).unwrap();
    b.element_end().unwrap();
    assert!(b.element_start("x:b", &[], &[]).is_err());
    assert!(b.error().is_some());
}

#[test]
fn unbound_prefix_tolerated() {
    let opt = ParsingOptions { allow_unbound_prefixes: true, ..ParsingOptions::default() };

    let mut b = start(opt);
    b.element_start("x:e", &[("y:a", "1")], &[]).unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    let e = doc.root_element().unwrap();
    assert_eq!(e.name().unwrap().namespace(), None);
    assert_eq!(e.attribute("a", None), Some("1"));
}

#[test]
fn duplicated_attribute_replaces() {
    let mut b = start(ParsingOptions::default());
    b.element_start("e", &[("a", "1"), ("a", "2")], &[]).unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    let e = doc.root_element().unwrap();
    assert_eq!(e.attributes().count(), 1);
    assert_eq!(e.attribute("a", None), Some("2"));
}

#[test]
fn name_interning() {
    let mut b = start(ParsingOptions::default());
    b.element_start("r", &[], &[]).unwrap();
    b.element_start("e", &[], &[]).unwrap();
    b.element_end().unwrap();
    b.element_start("e", &[], &[]).unwrap();
    b.element_end().unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    let r = doc.root_element().unwrap();
    let first = r.first_child().unwrap().name().unwrap();
    let last = r.last_child().unwrap().name().unwrap();
    assert!(first.same_identity(last));
    assert!(doc.names().is_interning());

    let opt = ParsingOptions { name_interning: false, ..ParsingOptions::default() };
    let mut b = start(opt);
    b.element_start("r", &[], &[]).unwrap();
    b.element_start("e", &[], &[]).unwrap();
    b.element_end().unwrap();
    b.element_start("e", &[], &[]).unwrap();
    b.element_end().unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    let r = doc.root_element().unwrap();
    let first = r.first_child().unwrap().name().unwrap();
    let last = r.last_child().unwrap().name().unwrap();
    assert!(!first.same_identity(last));
    assert_eq!(first, last);
}

#[test]
fn document_order_is_event_order() {
    let mut b = start(ParsingOptions::default());
    b.comment("before").unwrap();
    b.processing_instruction("pi", None).unwrap();
    b.element_start("r", &[], &[]).unwrap();
    b.characters("t").unwrap();
    b.comment("c").unwrap();
    b.processing_instruction("p", Some("v")).unwrap();
    b.cdata("d").unwrap();
    b.element_start("e", &[], &[]).unwrap();
    b.element_end().unwrap();
    b.element_end().unwrap();
    b.comment("after").unwrap();

    let doc = end(b);
    let top: Vec<_> = doc.root().children().map(|n| n.node_type()).collect();
    assert_eq!(top, vec![NodeType::Comment, NodeType::PI, NodeType::Element, NodeType::Comment]);

    let inner: Vec<_> = doc.root_element().unwrap().children().map(|n| n.node_type()).collect();
    assert_eq!(inner, vec![
        NodeType::Text,
        NodeType::Comment,
        NodeType::PI,
        NodeType::CData,
        NodeType::Element,
    ]);
}

#[test]
fn document_level_text() {
    let mut b = start(ParsingOptions::default());
    b.characters("\n  ").unwrap();
    assert!(b.characters("text").is_err());
    assert!(b.finish().is_err());
}

#[test]
fn second_root_element() {
    let mut b = start(ParsingOptions::default());
    b.element_start("a", &[], &[]).unwrap();
    b.element_end().unwrap();
    assert!(b.element_start("b", &[], &[]).is_err());
}

#[test]
fn no_root_element() {
    let mut b = start(ParsingOptions::default());
    b.comment("c").unwrap();
    match b.document_end() {
        Err(Error::Structural(_)) => {}
        r => panic!("unexpected result: {:?}", r),
    }
}

#[test]
fn malformed_input_discards_tree() {
    let mut b = start(ParsingOptions::default());
    b.element_start("a", &[], &[]).unwrap();

    let err = b.malformed_input("bad markup", Some(TextPos::new(3, 7)), Some("file.xml"));
    assert_eq!(err.to_string(), "error on line 3 of document file.xml : bad markup");
    assert_eq!(b.element_end(), Err(err.clone()));
    assert_eq!(b.document_end(), Err(err.clone()));
    assert_eq!(b.finish().unwrap_err(), err);
}

#[test]
fn dtd_declarations_by_origin() {
    let opt = ParsingOptions { include_external_dtd_declarations: true, ..ParsingOptions::default() };

    let mut b = start(opt);
    b.doctype_start("r", None, None).unwrap();
    b.dtd_declaration(
        Declaration::Element { name: "r".to_string(), model: "EMPTY".to_string() },
        DeclarationOrigin::Internal,
    ).unwrap();
    b.dtd_declaration(
        Declaration::Element { name: "x".to_string(), model: "ANY".to_string() },
        DeclarationOrigin::External,
    ).unwrap();
    b.element_start("r", &[], &[]).unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    let doc_type = doc.doc_type().unwrap();
    assert!(doc_type.internal_declarations().is_empty());
    assert_eq!(doc_type.external_declarations().len(), 1);
    assert_eq!(doc_type.external_declarations()[0].name(), "x");
}

#[test]
fn external_subset_is_resolved() {
    let mut b = TreeBuilder::with_system_id(ParsingOptions::default(), "/data/docs/a.xml");
    b.document_start().unwrap();
    b.doctype_start("a", None, Some("a.dtd")).unwrap();
    b.element_start("a", &[], &[]).unwrap();
    b.element_end().unwrap();

    let doc = end(b);
    let subset = doc.doc_type().unwrap().external_subset().unwrap();
    assert_eq!(subset.system_id(), "/data/docs/a.dtd");
    assert!(doc.entity_resolver().is_some());
}

#[test]
fn resolve_entity_failure() {
    let opt = ParsingOptions { fail_on_unresolved_entities: true, ..ParsingOptions::default() };
    let resolver = std::rc::Rc::new(|_: Option<&str>, _: &str| -> Option<InputLocator> { None });

    let mut b = TreeBuilder::with_resolver(opt, None, resolver);
    b.document_start().unwrap();
    let err = b.resolve_entity(None, "x.ent").unwrap_err();
    assert_eq!(err, Error::EntityResolution { public_id: None, system_id: "x.ent".to_string() });
    assert_eq!(b.error(), Some(&err));
}

#[test]
fn build_from_events() {
    let doc = TreeBuilder::new(ParsingOptions::default()).build(vec![
        XmlEvent::DocumentStart,
        XmlEvent::XmlDeclaration {
            version: "1.0".to_string(),
            encoding: Some("UTF-8".to_string()),
            standalone: None,
        },
        XmlEvent::ElementStart {
            name: "n:r".to_string(),
            attributes: vec![("id".to_string(), "1".to_string())],
            namespaces: vec![(Some("n".to_string()), "urn:n".to_string())],
        },
        XmlEvent::Characters("text".to_string()),
        XmlEvent::ElementEnd,
        XmlEvent::DocumentEnd,
    ]).unwrap();

    let r = doc.root_element().unwrap();
    assert!(r.has_tag_name("r", Some("urn:n")));
    assert_eq!(r.attribute("id", None), Some("1"));
    assert_eq!(r.text(), Some("text"));
    assert_eq!(doc.encoding(), Some("UTF-8"));
}

#[test]
fn build_stops_on_malformed_event() {
    let res = TreeBuilder::new(ParsingOptions::default()).build(vec![
        XmlEvent::DocumentStart,
        XmlEvent::MalformedInput { message: "oops".to_string(), pos: None, system_id: None },
        XmlEvent::DocumentEnd,
    ]);

    assert_eq!(res.unwrap_err(), Error::MalformedInput {
        message: "oops".to_string(),
        pos: None,
        system_id: None,
    });
}
