use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::doctype::DocumentType;
use crate::entity::EntityResolver;
use crate::error::Error;
use crate::name::{NameRegistry, QName};
use crate::namespace::Namespace;
use crate::node::Node;
use crate::NS_XML_URI;

type Result<T> = std::result::Result<T, Error>;

static NEXT_DOCUMENT_ID: AtomicU32 = AtomicU32::new(0);


/// Node ID.
///
/// Index into a `Document`-internal `Vec`, tagged with the document it belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    doc: u32,
    index: u32,
}

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NodeId({})", self.index)
    }
}


/// List of supported node types.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum NodeType {
    /// The document node.
    Document,
    /// An element node.
    ///
    /// Only an element can have a name, attributes and namespaces.
    Element,
    /// An attribute node.
    ///
    /// Owned by an element, never part of a content list.
    Attribute,
    /// A text node.
    Text,
    /// A CDATA section.
    CData,
    /// A comment node.
    Comment,
    /// A processing instruction.
    PI,
}


/// A processing instruction.
#[derive(Clone, Copy, PartialEq, Debug)]
#[allow(missing_docs)]
pub struct PI<'a> {
    pub target: &'a str,
    pub value: Option<&'a str>,
}


#[derive(Clone)]
pub(crate) enum NodeKind {
    Document,
    Element {
        name: QName,
        attributes: Vec<NodeId>,
        namespaces: Vec<Namespace>,
    },
    Attribute {
        name: QName,
        value: String,
    },
    Text(String),
    CData(String),
    Comment(String),
    PI {
        target: String,
        value: Option<String>,
    },
}

impl NodeKind {
    pub(crate) fn node_type(&self) -> NodeType {
        match *self {
            NodeKind::Document => NodeType::Document,
            NodeKind::Element { .. } => NodeType::Element,
            NodeKind::Attribute { .. } => NodeType::Attribute,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::CData(_) => NodeType::CData,
            NodeKind::Comment(_) => NodeType::Comment,
            NodeKind::PI { .. } => NodeType::PI,
        }
    }

    pub(crate) fn is_branch(&self) -> bool {
        match *self {
            NodeKind::Document | NodeKind::Element { .. } => true,
            _ => false,
        }
    }
}


pub(crate) struct NodeData {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}


/// A mutable XML tree.
///
/// All nodes live in a document-internal arena and are addressed by [`NodeId`].
/// A node has at most one parent. Nodes removed from the tree stay in the arena
/// as orphans until the document is dropped.
///
/// The document node itself is always [`Document::root_id`].
/// It holds at most one element, the root element, plus comments and
/// processing instructions.
///
/// [`NodeId`]: struct.NodeId.html
/// [`Document::root_id`]: struct.Document.html#method.root_id
pub struct Document {
    id: u32,
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) names: NameRegistry,
    pub(crate) root_element: Option<NodeId>,
    doc_type: Option<DocumentType>,
    entity_resolver: Option<Rc<dyn EntityResolver>>,
    encoding: Option<String>,
    xml_version: Option<String>,
    standalone: Option<bool>,
    validation_requested: bool,
}

impl Document {
    /// Creates an empty document with name interning enabled.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut doc = xmlbranch::Document::new();
    /// let root = doc.root_id();
    /// let e = doc.add_element(root, "e").unwrap();
    /// assert_eq!(doc.root_element().map(|n| n.id()), Some(e));
    /// ```
    pub fn new() -> Self {
        Self::with_name_interning(true)
    }

    /// Creates an empty document.
    pub fn with_name_interning(interning: bool) -> Self {
        Document {
            id: NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed),
            nodes: vec![NodeData {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            names: NameRegistry::with_interning(interning),
            root_element: None,
            doc_type: None,
            entity_resolver: None,
            encoding: None,
            xml_version: None,
            standalone: None,
            validation_requested: false,
        }
    }

    /// Returns the document node ID.
    pub fn root_id(&self) -> NodeId {
        NodeId { doc: self.id, index: 0 }
    }

    /// Returns the document node.
    pub fn root(&self) -> Node {
        self.get(self.root_id())
    }

    /// Returns the root element ID.
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    /// Returns the root element.
    ///
    /// Unlike `root`, will return an element node, if one was added.
    pub fn root_element(&self) -> Option<Node> {
        self.root_element.map(|id| self.get(id))
    }

    /// Returns a node by ID.
    ///
    /// # Panics
    ///
    /// - if the node belongs to another document
    pub fn get(&self, id: NodeId) -> Node {
        Node::new(id, self.data(id), self)
    }

    /// Checks that the ID points to a node of this document.
    pub fn contains(&self, id: NodeId) -> bool {
        id.doc == self.id && id.index() < self.nodes.len()
    }

    /// Returns the number of nodes in the arena, orphans included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`, since the document node is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        assert_eq!(id.doc, self.id, "the node belongs to another document");
        &self.nodes[id.index()]
    }

    pub(crate) fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        assert_eq!(id.doc, self.id, "the node belongs to another document");
        &mut self.nodes[id.index()]
    }

    pub(crate) fn kind(&self, id: NodeId) -> &NodeKind {
        &self.data(id).kind
    }

    pub(crate) fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId { doc: self.id, index: self.nodes.len() as u32 };
        self.nodes.push(NodeData {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Returns the name registry.
    pub fn names(&self) -> &NameRegistry {
        &self.names
    }

    /// Resolves a name through the document's registry.
    pub fn qname(&mut self, local: &str, ns: Option<&str>, prefix: Option<&str>) -> QName {
        self.names.resolve(local, ns, prefix)
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, name: QName) -> NodeId {
        self.push_node(NodeKind::Element {
            name,
            attributes: Vec::new(),
            namespaces: Vec::new(),
        })
    }

    /// Creates a detached attribute.
    pub fn create_attribute(&mut self, name: QName, value: &str) -> NodeId {
        self.push_node(NodeKind::Attribute { name, value: value.to_string() })
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    /// Creates a detached CDATA node.
    pub fn create_cdata(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::CData(text.to_string()))
    }

    /// Creates a detached comment.
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Comment(text.to_string()))
    }

    /// Creates a detached processing instruction.
    pub fn create_pi(&mut self, target: &str, value: Option<&str>) -> NodeId {
        self.push_node(NodeKind::PI {
            target: target.to_string(),
            value: value.map(str::to_string),
        })
    }

    pub(crate) fn check_owned(&self, id: NodeId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(Error::illegal_add("the node belongs to another document"))
        }
    }

    /// Replaces the value of a text, CDATA, comment, attribute or PI node.
    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<()> {
        self.check_owned(id)?;
        match self.data_mut(id).kind {
            NodeKind::Text(ref mut text)
            | NodeKind::CData(ref mut text)
            | NodeKind::Comment(ref mut text)
            | NodeKind::Attribute { value: ref mut text, .. } => {
                text.clear();
                text.push_str(value);
            }
            NodeKind::PI { value: ref mut v, .. } => {
                *v = Some(value.to_string());
            }
            _ => {
                return Err(Error::Structural("the node has no value".to_string()));
            }
        }

        Ok(())
    }

    pub(crate) fn append_to_text(&mut self, id: NodeId, text: &str) {
        if let NodeKind::Text(ref mut s) = self.data_mut(id).kind {
            s.push_str(text);
        }
    }

    /// Sets an attribute on an element.
    ///
    /// An attribute with an equal name has its value replaced, otherwise a new
    /// attribute is appended.
    ///
    /// Returns the attribute node ID.
    pub fn set_attribute(&mut self, element: NodeId, name: QName, value: &str) -> Result<NodeId> {
        self.check_owned(element)?;
        if let Some(id) = self.find_attribute(element, &name)? {
            if let NodeKind::Attribute { name: ref mut n, value: ref mut v } = self.data_mut(id).kind {
                *n = name;
                *v = value.to_string();
            }
            return Ok(id);
        }

        let id = self.create_attribute(name, value);
        self.attach_attribute(element, id);
        Ok(id)
    }

    /// Attaches a detached attribute node to an element.
    ///
    /// An attribute with an equal name is detached and returned.
    pub fn set_attribute_node(&mut self, element: NodeId, attr: NodeId) -> Result<Option<NodeId>> {
        self.check_owned(element)?;
        self.check_owned(attr)?;

        let name = match self.data(attr).kind {
            NodeKind::Attribute { ref name, .. } => name.clone(),
            _ => return Err(Error::illegal_add("not an attribute")),
        };

        if self.data(attr).parent.is_some() {
            return Err(Error::illegal_add("the attribute already has an owner element"));
        }

        let old = self.find_attribute(element, &name)?;
        if let Some(old) = old {
            self.data_mut(old).parent = None;
            if let NodeKind::Element { ref mut attributes, .. } = self.data_mut(element).kind {
                if let Some(slot) = attributes.iter_mut().find(|id| **id == old) {
                    *slot = attr;
                }
            }
            self.data_mut(attr).parent = Some(element);
        } else {
            self.attach_attribute(element, attr);
        }

        Ok(old)
    }

    /// Detaches an attribute from an element.
    ///
    /// Returns the detached attribute node, if there was one.
    pub fn remove_attribute(&mut self, element: NodeId, name: &QName) -> Result<Option<NodeId>> {
        let id = match self.find_attribute(element, name)? {
            Some(id) => id,
            None => return Ok(None),
        };

        if let NodeKind::Element { ref mut attributes, .. } = self.data_mut(element).kind {
            attributes.retain(|a| *a != id);
        }
        self.data_mut(id).parent = None;

        Ok(Some(id))
    }

    fn find_attribute(&self, element: NodeId, name: &QName) -> Result<Option<NodeId>> {
        self.check_owned(element)?;
        match self.data(element).kind {
            NodeKind::Element { ref attributes, .. } => {
                Ok(attributes.iter().cloned().find(|id| match self.data(*id).kind {
                    NodeKind::Attribute { name: ref n, .. } => n == name,
                    _ => false,
                }))
            }
            _ => Err(Error::illegal_add("not an element")),
        }
    }

    fn attach_attribute(&mut self, element: NodeId, attr: NodeId) {
        if let NodeKind::Element { ref mut attributes, .. } = self.data_mut(element).kind {
            attributes.push(attr);
        }
        self.data_mut(attr).parent = Some(element);
    }

    /// Declares a namespace on an element.
    ///
    /// A declaration with the same prefix is replaced.
    /// `None` declares the default namespace.
    pub fn declare_namespace(&mut self, element: NodeId, prefix: Option<&str>, uri: &str) -> Result<()> {
        self.check_owned(element)?;
        let uri = self.names.intern_uri(uri);
        let ns = Namespace::new(prefix, uri);
        match self.data_mut(element).kind {
            NodeKind::Element { ref mut namespaces, .. } => {
                match namespaces.iter_mut().find(|n| n.prefix() == ns.prefix()) {
                    Some(n) => *n = ns,
                    None => namespaces.push(ns),
                }
                Ok(())
            }
            _ => Err(Error::illegal_add("not an element")),
        }
    }

    /// Resolves a prefix using the declarations of the node and its ancestors.
    ///
    /// Returns `None` for nodes of another document.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlbranch::Document::parse("<a xmlns:x='urn:1'><b/></a>").unwrap();
    /// let b = doc.root_element().unwrap().first_child().unwrap();
    /// assert_eq!(doc.namespace_for_prefix(b.id(), Some("x")), Some("urn:1"));
    /// ```
    pub fn namespace_for_prefix(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        if !self.contains(id) {
            return None;
        }

        if prefix == Some("xml") {
            return Some(NS_XML_URI);
        }

        let prefix = prefix.filter(|p| !p.is_empty());
        let mut curr = Some(id);
        while let Some(id) = curr {
            let d = self.data(id);
            if let NodeKind::Element { ref namespaces, .. } = d.kind {
                if let Some(ns) = namespaces.iter().find(|ns| ns.prefix() == prefix) {
                    return Some(ns.uri()).filter(|uri| !uri.is_empty());
                }
            }
            curr = d.parent;
        }

        None
    }

    /// Returns the document type.
    pub fn doc_type(&self) -> Option<&DocumentType> {
        self.doc_type.as_ref()
    }

    /// Returns the mutable document type.
    pub fn doc_type_mut(&mut self) -> Option<&mut DocumentType> {
        self.doc_type.as_mut()
    }

    /// Sets the document type.
    pub fn set_doc_type(&mut self, doc_type: Option<DocumentType>) {
        self.doc_type = doc_type;
    }

    /// Returns the entity resolver the document was built with.
    pub fn entity_resolver(&self) -> Option<&dyn EntityResolver> {
        self.entity_resolver.as_deref()
    }

    /// Sets the entity resolver.
    pub fn set_entity_resolver(&mut self, resolver: Option<Rc<dyn EntityResolver>>) {
        self.entity_resolver = resolver;
    }

    /// Returns the declared encoding.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Sets the declared encoding.
    pub fn set_encoding(&mut self, encoding: Option<&str>) {
        self.encoding = encoding.map(str::to_string);
    }

    /// Returns the XML version from the XML declaration.
    pub fn xml_version(&self) -> Option<&str> {
        self.xml_version.as_deref()
    }

    /// Returns the `standalone` flag from the XML declaration.
    pub fn standalone(&self) -> Option<bool> {
        self.standalone
    }

    pub(crate) fn set_declaration(&mut self, version: &str, standalone: Option<bool>) {
        self.xml_version = Some(version.to_string());
        self.standalone = standalone;
    }

    /// Checks that validation was requested when the document was built.
    pub fn validation_requested(&self) -> bool {
        self.validation_requested
    }

    pub(crate) fn set_validation_requested(&mut self, flag: bool) {
        self.validation_requested = flag;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.root().has_children() {
            return write!(f, "Document []");
        }

        macro_rules! writeln_indented {
            ($depth:expr, $f:expr, $fmt:expr) => {
                for _ in 0..$depth { write!($f, "    ")?; }
                writeln!($f, $fmt)?;
            };
            ($depth:expr, $f:expr, $fmt:expr, $($arg:tt)*) => {
                for _ in 0..$depth { write!($f, "    ")?; }
                writeln!($f, $fmt, $($arg)*)?;
            };
        }

        fn print_vec<T: fmt::Debug>(prefix: &str, data: &[T], depth: usize, f: &mut fmt::Formatter)
            -> fmt::Result
        {
            if data.is_empty() {
                return Ok(());
            }

            writeln_indented!(depth, f, "{}: [", prefix);
            for v in data {
                writeln_indented!(depth + 1, f, "{:?}", v);
            }
            writeln_indented!(depth, f, "]");

            Ok(())
        }

        fn print_children(parent: Node, depth: usize, f: &mut fmt::Formatter) -> fmt::Result {
            for child in parent.children() {
                if child.is_element() {
                    let attrs: Vec<_> = child.attributes().collect();

                    writeln_indented!(depth, f, "Element {{");
                    if let Some(name) = child.name() {
                        writeln_indented!(depth, f, "    name: {:?}", name);
                    }
                    print_vec("attributes", &attrs, depth + 1, f)?;
                    print_vec("namespaces", child.namespaces(), depth + 1, f)?;

                    if child.has_children() {
                        writeln_indented!(depth, f, "    children: [");
                        print_children(child, depth + 2, f)?;
                        writeln_indented!(depth, f, "    ]");
                    }

                    writeln_indented!(depth, f, "}}");
                } else {
                    writeln_indented!(depth, f, "{:?}", child);
                }
            }

            Ok(())
        }

        writeln!(f, "Document [")?;
        print_children(self.root(), 1, f)?;
        writeln!(f, "]")?;

        Ok(())
    }
}
