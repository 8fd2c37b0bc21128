use std::fmt;
use std::slice;

use crate::name::QName;
use crate::namespace::Namespace;
use crate::tree::{Document, NodeData, NodeId, NodeKind, NodeType, PI};


/// A node.
///
/// A cheap, copyable, read-only view into a `Document`.
pub struct Node<'a> {
    id: NodeId,
    doc: &'a Document,
    d: &'a NodeData,
}

impl<'a> Copy for Node<'a> {}

impl<'a> Clone for Node<'a> {
    fn clone(&self) -> Self { *self }
}

impl<'a> Eq for Node<'a> {}

impl<'a> PartialEq for Node<'a> {
    fn eq(&self, other: &Self) -> bool {
           self.id == other.id
        && self.doc as *const _ == other.doc as *const _
    }
}

impl<'a> Node<'a> {
    pub(crate) fn new(id: NodeId, d: &'a NodeData, doc: &'a Document) -> Self {
        Node { id, doc, d }
    }

    /// Returns node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns node's type.
    pub fn node_type(&self) -> NodeType {
        self.d.kind.node_type()
    }

    /// Checks that node is the document node.
    pub fn is_document(&self) -> bool {
        self.node_type() == NodeType::Document
    }

    /// Checks that node is an element node.
    pub fn is_element(&self) -> bool {
        self.node_type() == NodeType::Element
    }

    /// Checks that node is an attribute node.
    pub fn is_attribute(&self) -> bool {
        self.node_type() == NodeType::Attribute
    }

    /// Checks that node is a text node.
    pub fn is_text(&self) -> bool {
        self.node_type() == NodeType::Text
    }

    /// Checks that node is a CDATA node.
    pub fn is_cdata(&self) -> bool {
        self.node_type() == NodeType::CData
    }

    /// Checks that node is a comment node.
    pub fn is_comment(&self) -> bool {
        self.node_type() == NodeType::Comment
    }

    /// Checks that node is a processing instruction node.
    pub fn is_pi(&self) -> bool {
        self.node_type() == NodeType::PI
    }

    /// Checks that node can own children.
    pub fn is_branch(&self) -> bool {
        self.d.kind.is_branch()
    }

    /// Returns node's document.
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Returns the name of an element or an attribute.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlbranch::Document::parse("<n:e xmlns:n='http://www.w3.org'/>").unwrap();
    /// let name = doc.root_element().unwrap().name().unwrap();
    ///
    /// assert_eq!(name.namespace(), Some("http://www.w3.org"));
    /// assert_eq!(name.local_name(), "e");
    /// assert_eq!(name.prefix(), Some("n"));
    /// ```
    pub fn name(&self) -> Option<&'a QName> {
        match self.d.kind {
            NodeKind::Element { ref name, .. } => Some(name),
            NodeKind::Attribute { ref name, .. } => Some(name),
            _ => None,
        }
    }

    /// Checks that node is an element with a specified local name and namespace.
    pub fn has_tag_name(&self, local: &str, ns: Option<&str>) -> bool {
        match self.d.kind {
            NodeKind::Element { ref name, .. } => name.matches(local, ns),
            _ => false,
        }
    }

    /// Returns element's attribute value.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlbranch::Document::parse(
    ///     "<e xmlns:n='http://www.w3.org' a='b' n:a='c'/>"
    /// ).unwrap();
    /// let e = doc.root_element().unwrap();
    ///
    /// assert_eq!(e.attribute("a", None), Some("b"));
    /// assert_eq!(e.attribute("a", Some("http://www.w3.org")), Some("c"));
    /// ```
    pub fn attribute(&self, local: &str, ns: Option<&str>) -> Option<&'a str> {
        self.attributes()
            .find(|a| a.name().map(|n| n.matches(local, ns)).unwrap_or(false))
            .and_then(|a| a.value())
    }

    /// Returns an iterator over element's attribute nodes.
    pub fn attributes(&self) -> Attributes<'a> {
        let ids: &'a [NodeId] = match self.d.kind {
            NodeKind::Element { ref attributes, .. } => &attributes[..],
            _ => &[],
        };

        Attributes { doc: self.doc, iter: ids.iter() }
    }

    /// Returns namespaces declared on this element.
    pub fn namespaces(&self) -> &'a [Namespace] {
        match self.d.kind {
            NodeKind::Element { ref namespaces, .. } => &namespaces[..],
            _ => &[],
        }
    }

    /// Returns node's value.
    ///
    /// - for an attribute will return its value
    /// - for a text, CDATA or comment will return a self text
    /// - for a PI will return its value
    pub fn value(&self) -> Option<&'a str> {
        match self.d.kind {
            NodeKind::Attribute { ref value, .. } => Some(value),
            NodeKind::Text(ref text)
            | NodeKind::CData(ref text)
            | NodeKind::Comment(ref text) => Some(text),
            NodeKind::PI { ref value, .. } => value.as_deref(),
            _ => None,
        }
    }

    /// Returns node's text.
    ///
    /// - for an element will return a first text child
    /// - for a text, CDATA or comment will return a self text
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlbranch::Document::parse("<p>text</p>").unwrap();
    ///
    /// assert_eq!(doc.root_element().unwrap().text(), Some("text"));
    /// ```
    pub fn text(&self) -> Option<&'a str> {
        match self.d.kind {
            NodeKind::Element { .. } => {
                match self.first_child() {
                    Some(child) if child.is_text() || child.is_cdata() => child.value(),
                    _ => None,
                }
            }
            NodeKind::Text(_) | NodeKind::CData(_) | NodeKind::Comment(_) => self.value(),
            _ => None,
        }
    }

    /// Returns the concatenated text of all text and CDATA descendants.
    pub fn string_value(&self) -> String {
        match self.d.kind {
            NodeKind::Document | NodeKind::Element { .. } => {
                self.descendants()
                    .filter(|n| n.is_text() || n.is_cdata())
                    .filter_map(|n| n.value())
                    .collect()
            }
            _ => self.value().unwrap_or("").to_string(),
        }
    }

    /// Returns node as Processing Instruction.
    pub fn pi(&self) -> Option<PI<'a>> {
        match self.d.kind {
            NodeKind::PI { ref target, ref value } => {
                Some(PI { target, value: value.as_deref() })
            }
            _ => None,
        }
    }

    fn gen_node(&self, id: NodeId) -> Node<'a> {
        self.doc.get(id)
    }

    /// Returns the parent of this node.
    ///
    /// For an attribute, this is the owner element.
    pub fn parent(&self) -> Option<Self> {
        self.d.parent.map(|id| self.gen_node(id))
    }

    /// Returns the parent element of this node.
    pub fn parent_element(&self) -> Option<Self> {
        self.ancestors().find(|n| n.is_element())
    }

    /// Returns node's position in the parent's content list.
    pub fn position(&self) -> Option<usize> {
        if self.is_attribute() {
            return None;
        }

        let parent = self.d.parent?;
        self.doc.data(parent).children.iter().position(|id| *id == self.id)
    }

    fn sibling(&self, offset: isize) -> Option<Self> {
        let parent = self.d.parent?;
        let idx = self.position()? as isize + offset;
        if idx < 0 {
            return None;
        }

        self.doc.data(parent).children.get(idx as usize).map(|id| self.gen_node(*id))
    }

    /// Returns the previous sibling of this node.
    pub fn prev_sibling(&self) -> Option<Self> {
        self.sibling(-1)
    }

    /// Returns the next sibling of this node.
    pub fn next_sibling(&self) -> Option<Self> {
        self.sibling(1)
    }

    /// Returns the first child of this node.
    pub fn first_child(&self) -> Option<Self> {
        self.d.children.first().map(|id| self.gen_node(*id))
    }

    /// Returns the first element child of this node.
    pub fn first_element_child(&self) -> Option<Self> {
        self.children().find(|n| n.is_element())
    }

    /// Returns the last child of this node.
    pub fn last_child(&self) -> Option<Self> {
        self.d.children.last().map(|id| self.gen_node(*id))
    }

    /// Returns the last element child of this node.
    pub fn last_element_child(&self) -> Option<Self> {
        self.children().filter(|n| n.is_element()).last()
    }

    /// Returns true if this node has siblings.
    pub fn has_siblings(&self) -> bool {
        match self.d.parent {
            Some(id) if !self.is_attribute() => self.doc.data(id).children.len() > 1,
            _ => false,
        }
    }

    /// Returns true if this node has children.
    pub fn has_children(&self) -> bool {
        !self.d.children.is_empty()
    }

    /// Returns an iterator over ancestor nodes.
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors(self.parent())
    }

    /// Returns an iterator over previous sibling nodes.
    pub fn prev_siblings(&self) -> PrevSiblings<'a> {
        PrevSiblings(self.prev_sibling())
    }

    /// Returns an iterator over next sibling nodes.
    pub fn next_siblings(&self) -> NextSiblings<'a> {
        NextSiblings(self.next_sibling())
    }

    /// Returns an iterator over children nodes.
    pub fn children(&self) -> Children<'a> {
        Children { doc: self.doc, iter: self.d.children.iter() }
    }

    /// Returns an iterator which traverses the subtree starting at this node.
    pub fn traverse(&self) -> Traverse<'a> {
        Traverse { root: *self, stack: Vec::new(), started: false }
    }

    /// Returns an iterator over this node and its descendants.
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants(self.traverse())
    }
}

impl<'a> fmt::Debug for Node<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.d.kind {
            NodeKind::Document => write!(f, "Document"),
            NodeKind::Element { ref name, .. } => {
                write!(f, "Element {{ name: {:?}, attributes: {:?}, namespaces: {:?} }}",
                       name, self.attributes().collect::<Vec<_>>(), self.namespaces())
            }
            NodeKind::Attribute { ref name, ref value } => {
                write!(f, "Attribute {{ name: {:?}, value: {:?} }}", name, value)
            }
            NodeKind::PI { ref target, ref value } => {
                write!(f, "PI {{ target: {:?}, value: {:?} }}", target, value)
            }
            NodeKind::Comment(ref text) => write!(f, "Comment({:?})", text),
            NodeKind::Text(ref text) => write!(f, "Text({:?})", text),
            NodeKind::CData(ref text) => write!(f, "CData({:?})", text),
        }
    }
}

macro_rules! axis_iterators {
    ($(#[$m:meta] $i:ident($f:path);)*) => {
        $(
            #[$m]
            #[derive(Clone)]
            pub struct $i<'a>(Option<Node<'a>>);
            impl<'a> Iterator for $i<'a> {
                type Item = Node<'a>;
                fn next(&mut self) -> Option<Self::Item> {
                    let node = self.0.take();
                    self.0 = node.as_ref().and_then($f);
                    node
                }
            }
        )*
    };
}

axis_iterators! {
    /// Iterator over ancestors.
    Ancestors(Node::parent);

    /// Iterator over previous siblings.
    PrevSiblings(Node::prev_sibling);

    /// Iterator over next siblings.
    NextSiblings(Node::next_sibling);
}


/// Iterator over children.
///
/// Created by [`Node::children`] and [`Document::node_iter`].
///
/// [`Node::children`]: struct.Node.html#method.children
/// [`Document::node_iter`]: struct.Document.html#method.node_iter
#[derive(Clone)]
pub struct Children<'a> {
    pub(crate) doc: &'a Document,
    pub(crate) iter: slice::Iter<'a, NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|id| self.doc.get(*id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a> DoubleEndedIterator for Children<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.iter.next_back().map(|id| self.doc.get(*id))
    }
}

impl<'a> ExactSizeIterator for Children<'a> {}


/// Iterator over attributes.
#[derive(Clone)]
pub struct Attributes<'a> {
    doc: &'a Document,
    iter: slice::Iter<'a, NodeId>,
}

impl<'a> Iterator for Attributes<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|id| self.doc.get(*id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a> ExactSizeIterator for Attributes<'a> {}


/// Open or close edge of a node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Edge<'a> {
    /// Open.
    Open(Node<'a>),
    /// Close.
    Close(Node<'a>),
}


/// Iterator which traverses a subtree.
#[derive(Clone)]
pub struct Traverse<'a> {
    root: Node<'a>,
    stack: Vec<(Node<'a>, Children<'a>)>,
    started: bool,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = Edge<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            self.stack.push((self.root, self.root.children()));
            return Some(Edge::Open(self.root));
        }

        let next = match self.stack.last_mut() {
            Some((_, children)) => children.next(),
            None => return None,
        };

        match next {
            Some(child) => {
                self.stack.push((child, child.children()));
                Some(Edge::Open(child))
            }
            None => self.stack.pop().map(|(node, _)| Edge::Close(node)),
        }
    }
}


/// Iterator over a node and its descendants.
#[derive(Clone)]
pub struct Descendants<'a>(Traverse<'a>);

impl<'a> Iterator for Descendants<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for edge in &mut self.0 {
            if let Edge::Open(node) = edge {
                return Some(node);
            }
        }

        None
    }
}
