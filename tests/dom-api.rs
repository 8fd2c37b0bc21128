#[macro_use] extern crate pretty_assertions;

use xmlbranch::*;

fn values(doc: &Document, parent: NodeId) -> Vec<String> {
    doc.node_iter(parent)
        .map(|n| match n.name() {
            Some(name) => name.qualified_name(),
            None => n.value().unwrap_or("").to_string(),
        })
        .collect()
}

#[test]
fn add_to_another_document() {
    let mut doc_a = Document::parse("<a><e/></a>").unwrap();
    let mut doc_b = Document::parse("<b/>").unwrap();

    let a = doc_a.root_element_id().unwrap();
    let e = doc_a.node(a, 0).unwrap();
    let b = doc_b.root_element_id().unwrap();

    match doc_b.add(b, e) {
        Err(Error::IllegalAdd(_)) => {}
        r => panic!("unexpected result: {:?}", r),
    }
    assert_eq!(doc_b.node_count(b), 0);

    // Also for a detached node.
    assert!(doc_a.remove(a, e));
    assert!(doc_b.add(b, e).is_err());
    assert_eq!(doc_b.node_count(b), 0);
}

#[test]
fn import_from_another_document() {
    let doc_a = Document::parse("<a xmlns:n='urn:n'><n:e k='v'>t</n:e></a>").unwrap();
    let mut doc_b = Document::parse("<b/>").unwrap();

    let e = doc_a.root_element().unwrap().first_child().unwrap().id();
    let b = doc_b.root_element_id().unwrap();

    let copy = doc_b.import_node(&doc_a, e).unwrap();
    doc_b.add(b, copy).unwrap();

    let node = doc_b.get(copy);
    assert!(node.has_tag_name("e", Some("urn:n")));
    assert_eq!(node.attribute("k", None), Some("v"));
    assert_eq!(node.text(), Some("t"));
    assert_eq!(doc_a.root_element().unwrap().children().count(), 1);
}

#[test]
fn add_with_parent_fails() {
    let mut doc = Document::parse("<r><a><x/></a><b/></r>").unwrap();
    let r = doc.root_element_id().unwrap();
    let a = doc.node(r, 0).unwrap();
    let b = doc.node(r, 1).unwrap();
    let x = doc.node(a, 0).unwrap();

    assert!(doc.add(b, x).is_err());
    assert!(doc.insert(b, 0, x).is_err());
    assert_eq!(doc.node_count(a), 1);
    assert_eq!(doc.node_count(b), 0);
    assert_eq!(doc.get(x).parent().map(|n| n.id()), Some(a));
}

#[test]
fn move_via_detach() {
    let mut doc = Document::parse("<r><a><x/></a><b/></r>").unwrap();
    let r = doc.root_element_id().unwrap();
    let a = doc.node(r, 0).unwrap();
    let b = doc.node(r, 1).unwrap();
    let x = doc.node(a, 0).unwrap();

    assert!(doc.detach(x));
    assert!(!doc.detach(x));
    doc.add(b, x).unwrap();
    assert_eq!(doc.index_of(b, x), Some(0));
    assert_eq!(doc.index_of(a, x), None);
}

#[test]
fn remove_non_child() {
    let mut doc = Document::parse("<r><a><x/></a><b/></r>").unwrap();
    let r = doc.root_element_id().unwrap();
    let a = doc.node(r, 0).unwrap();
    let x = doc.node(a, 0).unwrap();

    let before = doc.content(r).to_vec();
    assert!(!doc.remove(r, x));
    assert_eq!(doc.content(r), &before[..]);
}

#[test]
fn node_out_of_range() {
    let doc = Document::parse("<r><a/></r>").unwrap();
    let r = doc.root_element_id().unwrap();
    assert!(doc.node(r, 0).is_ok());
    assert_eq!(doc.node(r, 1), Err(Error::IndexOutOfRange { index: 1, len: 1 }));
}

#[test]
fn insert_01() {
    let mut doc = Document::parse("<r><a/><c/></r>").unwrap();
    let r = doc.root_element_id().unwrap();
    let name = doc.qname("b", None, None);
    let b = doc.create_element(name);

    doc.insert(r, 1, b).unwrap();
    assert_eq!(values(&doc, r), vec!["a", "b", "c"]);
    assert_eq!(doc.get(b).position(), Some(1));

    let t = doc.create_text("end");
    doc.insert(r, 3, t).unwrap();
    assert_eq!(values(&doc, r), vec!["a", "b", "c", "end"]);
}

#[test]
fn node_iter_is_restartable() {
    let doc = Document::parse("<r><a/>t<!--c--></r>").unwrap();
    let r = doc.root_element_id().unwrap();
    assert_eq!(doc.node_iter(r).count(), 3);
    assert_eq!(doc.node_iter(r).count(), 3);
    assert_eq!(doc.node_iter(r).rev().next().unwrap().node_type(), NodeType::Comment);
}

#[test]
fn normalize_merge() {
    let mut doc = Document::parse("<r/>").unwrap();
    let r = doc.root_element_id().unwrap();
    for text in &["foo", "", "bar"] {
        let t = doc.create_text(text);
        doc.add(r, t).unwrap();
    }

    doc.normalize(r).unwrap();
    assert_eq!(doc.node_count(r), 1);
    assert_eq!(doc.get(doc.node(r, 0).unwrap()).value(), Some("foobar"));
}

#[test]
fn normalize_keeps_merged_text() {
    let mut doc = Document::parse("<r/>").unwrap();
    let r = doc.root_element_id().unwrap();
    let t1 = doc.append_text(r, "foo").unwrap();
    let t2 = doc.append_text(r, "bar").unwrap();

    doc.normalize(r).unwrap();
    assert_eq!(doc.get(t1).value(), Some("foobar"));
    assert_eq!(doc.get(t2).parent(), None);
    assert_eq!(doc.get(t2).value(), Some("bar"));
}

#[test]
fn foreign_node_reads() {
    let doc_a = Document::parse("<a><e/></a>").unwrap();
    let doc_b = Document::parse("<b/>").unwrap();
    let a = doc_a.root_element_id().unwrap();
    let e = doc_a.node(a, 0).unwrap();

    match doc_b.node(a, 0) {
        Err(Error::IllegalAdd(_)) => {}
        r => panic!("unexpected result: {:?}", r),
    }
    assert_eq!(doc_b.index_of(a, e), None);
    assert_eq!(doc_b.node_count(a), 0);
    assert!(doc_b.content(a).is_empty());
    assert_eq!(doc_b.node_iter(a).count(), 0);
    assert_eq!(doc_b.namespace_for_prefix(a, Some("x")), None);
}

#[test]
fn foreign_node_bulk_changes() {
    let doc_a = Document::parse("<a><e/></a>").unwrap();
    let mut doc_b = Document::parse("<b>t</b>").unwrap();
    let a = doc_a.root_element_id().unwrap();

    assert!(doc_b.clear_content(a).is_err());
    assert!(doc_b.normalize(a).is_err());

    let b = doc_b.root_element_id().unwrap();
    assert_eq!(doc_b.node_count(b), 1);
    assert_eq!(doc_a.node_count(a), 1);
}

#[test]
fn normalize_is_idempotent() {
    let mut doc = Document::parse("<r>a<e/><![CDATA[b]]></r>").unwrap();
    let r = doc.root_element_id().unwrap();
    let e = doc.node(r, 1).unwrap();
    doc.append_text(r, "c").unwrap();
    doc.append_text(r, "").unwrap();
    doc.append_text(r, "d").unwrap();
    doc.append_text(e, "").unwrap();
    doc.append_text(e, "x").unwrap();

    let root = doc.root_id();
    doc.normalize(root).unwrap();
    let once = format!("{:?}", doc);
    doc.normalize(root).unwrap();
    assert_eq!(format!("{:?}", doc), once);

    assert_eq!(values(&doc, r), vec!["a", "e", "b", "cd"]);
    assert_eq!(values(&doc, e), vec!["x"]);
}

#[test]
fn append_content_moves() {
    let mut doc = Document::parse("<r><a>1<x/>2</a><b>0</b></r>").unwrap();
    let r = doc.root_element_id().unwrap();
    let a = doc.node(r, 0).unwrap();
    let b = doc.node(r, 1).unwrap();

    doc.append_content(b, a).unwrap();
    assert_eq!(doc.node_count(a), 0);
    assert_eq!(values(&doc, b), vec!["0", "1", "x", "2"]);
    for node in doc.node_iter(b) {
        assert_eq!(node.parent().map(|n| n.id()), Some(b));
    }
}

#[test]
fn append_content_into_own_child() {
    let mut doc = Document::parse("<r><a><b/></a></r>").unwrap();
    let r = doc.root_element_id().unwrap();
    let a = doc.node(r, 0).unwrap();
    let b = doc.node(a, 0).unwrap();

    assert!(doc.append_content(b, r).is_err());
    assert_eq!(doc.node_count(r), 1);
    assert_eq!(doc.node_count(a), 1);
}

#[test]
fn copy_then_append_content() {
    let mut doc = Document::parse("<r><a>1<x/></a><b/></r>").unwrap();
    let r = doc.root_element_id().unwrap();
    let a = doc.node(r, 0).unwrap();
    let b = doc.node(r, 1).unwrap();

    let copy = doc.deep_copy(a).unwrap();
    doc.append_content(b, copy).unwrap();
    assert_eq!(values(&doc, a), vec!["1", "x"]);
    assert_eq!(values(&doc, b), vec!["1", "x"]);
}

#[test]
fn clear_content() {
    let mut doc = Document::parse("<r><a/>t<!--c--></r>").unwrap();
    let r = doc.root_element_id().unwrap();
    let children = doc.content(r).to_vec();

    doc.clear_content(r).unwrap();
    assert_eq!(doc.node_count(r), 0);
    for id in children {
        assert_eq!(doc.get(id).parent(), None);
    }
}

#[test]
fn clear_document() {
    let mut doc = Document::parse("<!--c--><r/>").unwrap();
    let root = doc.root_id();
    doc.clear_content(root).unwrap();
    assert_eq!(doc.root_element(), None);
    doc.add_element(root, "n").unwrap();
    assert!(doc.root_element().unwrap().has_tag_name("n", None));
}

#[test]
fn typed_wrappers() {
    let mut doc = Document::parse("<r/>").unwrap();
    let r = doc.root_element_id().unwrap();
    let comment = doc.create_comment("c");
    let pi = doc.create_pi("t", None);

    match doc.add_element_node(r, comment) {
        Err(Error::IllegalAdd(_)) => {}
        res => panic!("unexpected result: {:?}", res),
    }
    assert!(doc.add_pi_node(r, comment).is_err());
    assert_eq!(doc.node_count(r), 0);

    doc.add_comment_node(r, comment).unwrap();
    doc.add_pi_node(r, pi).unwrap();
    assert_eq!(doc.node_count(r), 2);

    assert!(doc.remove_element(r, comment).is_err());
    assert_eq!(doc.remove_pi(r, comment).is_err(), true);
    assert_eq!(doc.remove_comment(r, comment), Ok(true));
    assert_eq!(doc.remove_comment(r, comment), Ok(false));
    assert_eq!(doc.remove_pi(r, pi), Ok(true));
    assert_eq!(doc.node_count(r), 0);
}

#[test]
fn add_element_resolves_prefix() {
    let mut doc = Document::parse("<r xmlns:n='urn:n' xmlns='urn:d'/>").unwrap();
    let r = doc.root_element_id().unwrap();

    let e = doc.add_element(r, "n:e").unwrap();
    assert_eq!(doc.get(e).name().unwrap().namespace(), Some("urn:n"));

    let d = doc.add_element(r, "d").unwrap();
    assert_eq!(doc.get(d).name().unwrap().namespace(), Some("urn:d"));

    assert!(doc.add_element(r, "m:e").is_err());
    assert_eq!(doc.node_count(r), 2);

    let q = doc.add_element_ns(r, "m:e", "urn:m").unwrap();
    assert_eq!(doc.get(q).name().unwrap().qualified_name(), "m:e");
}

#[test]
fn declare_namespace() {
    let mut doc = Document::new();
    let root = doc.root_id();
    let r = doc.add_element(root, "r").unwrap();
    doc.declare_namespace(r, Some("n"), "urn:1").unwrap();
    doc.declare_namespace(r, Some("n"), "urn:2").unwrap();

    assert_eq!(doc.get(r).namespaces().len(), 1);
    let e = doc.add_element(r, "n:e").unwrap();
    assert!(doc.get(e).has_tag_name("e", Some("urn:2")));
}

#[test]
fn document_content_rules() {
    let mut doc = Document::new();
    let root = doc.root_id();
    doc.append_comment(root, "c").unwrap();
    doc.append_pi(root, "pi", Some("v")).unwrap();
    assert!(doc.append_text(root, "t").is_err());
    assert!(doc.append_cdata(root, "t").is_err());

    let r = doc.add_element(root, "r").unwrap();
    assert!(doc.add_element(root, "r2").is_err());
    assert_eq!(doc.root_element_id(), Some(r));
    assert_eq!(doc.node_count(root), 3);

    let attr_name = doc.qname("a", None, None);
    let attr = doc.create_attribute(attr_name, "v");
    assert!(doc.add(r, attr).is_err());
    assert!(doc.add(r, root).is_err());
}

#[test]
fn set_root_element() {
    let mut doc = Document::parse("<!--c--><a/><!--d-->").unwrap();
    let old = doc.root_element_id().unwrap();
    let name = doc.qname("b", None, None);
    let b = doc.create_element(name);

    assert_eq!(doc.set_root_element(b), Ok(Some(old)));
    assert_eq!(doc.root_element_id(), Some(b));
    assert_eq!(doc.get(old).parent(), None);
    assert_eq!(doc.index_of(doc.root_id(), b), Some(1));

    let comment = doc.create_comment("x");
    assert!(doc.set_root_element(comment).is_err());
}

#[test]
fn attributes_01() {
    let mut doc = Document::parse("<e a='1'/>").unwrap();
    let e = doc.root_element_id().unwrap();

    let name = doc.qname("a", None, None);
    let a = doc.set_attribute(e, name.clone(), "2").unwrap();
    assert_eq!(doc.get(e).attributes().count(), 1);
    assert_eq!(doc.get(e).attribute("a", None), Some("2"));

    let name_b = doc.qname("b", Some("urn:b"), Some("p"));
    doc.set_attribute(e, name_b, "3").unwrap();
    assert_eq!(doc.get(e).attributes().count(), 2);

    let detached = doc.remove_attribute(e, &name).unwrap();
    assert_eq!(detached, Some(a));
    assert_eq!(doc.get(a).parent(), None);
    assert_eq!(doc.get(e).attribute("a", None), None);
    assert_eq!(doc.remove_attribute(e, &name), Ok(None));

    let replaced = doc.set_attribute_node(e, a).unwrap();
    assert_eq!(replaced, None);
    assert!(doc.set_attribute_node(e, a).is_err());
    assert_eq!(doc.get(e).attribute("a", None), Some("2"));
}

#[test]
fn set_value() {
    let mut doc = Document::parse("<e a='1'>t<!--c--><?p v?></e>").unwrap();
    let e = doc.root_element_id().unwrap();
    let ids = doc.content(e).to_vec();
    let attr = doc.get(e).attributes().next().unwrap().id();

    doc.set_value(ids[0], "text").unwrap();
    doc.set_value(ids[1], "comment").unwrap();
    doc.set_value(ids[2], "value").unwrap();
    doc.set_value(attr, "2").unwrap();
    assert!(doc.set_value(e, "x").is_err());

    assert_eq!(values(&doc, e), vec!["text", "comment", "value"]);
    assert_eq!(doc.get(e).attribute("a", None), Some("2"));
}

#[test]
fn debug_output() {
    let mut doc = Document::new();
    assert_eq!(format!("{:?}", doc), "Document []");

    let root = doc.root_id();
    let e = doc.add_element(root, "e").unwrap();
    doc.append_text(e, "t").unwrap();
    assert_eq!(format!("{:?}", doc), "\
Document [
    Element {
        name: e
        children: [
            Text(\"t\")
        ]
    }
]
");
}
