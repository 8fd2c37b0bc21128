use std::mem;

use crate::error::Error;
use crate::name::{parse_qualified, QName};
use crate::namespace::Namespace;
use crate::node::Children;
use crate::tree::{Document, NodeId, NodeKind, NodeType};

type Result<T> = std::result::Result<T, Error>;


impl Document {
    /// Returns the child at `index`.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlbranch::Document::parse("<e><a/><b/></e>").unwrap();
    /// let e = doc.root_element().unwrap().id();
    ///
    /// assert!(doc.get(doc.node(e, 1).unwrap()).has_tag_name("b", None));
    /// assert!(doc.node(e, 2).is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// `IllegalAdd` if `parent` belongs to another document,
    /// `IndexOutOfRange` if there is no such child.
    pub fn node(&self, parent: NodeId, index: usize) -> Result<NodeId> {
        self.check_owned(parent)?;
        let children = self.content(parent);
        children.get(index).cloned().ok_or(Error::IndexOutOfRange {
            index,
            len: children.len(),
        })
    }

    /// Returns the position of an immediate child.
    ///
    /// Returns `None` when `node` is not a child of `parent` or `parent`
    /// belongs to another document.
    pub fn index_of(&self, parent: NodeId, node: NodeId) -> Option<usize> {
        self.content(parent).iter().position(|id| *id == node)
    }

    /// Returns the number of children.
    pub fn node_count(&self, parent: NodeId) -> usize {
        self.content(parent).len()
    }

    /// Returns the children in document order.
    ///
    /// Empty for non-branch nodes and nodes of another document.
    pub fn content(&self, parent: NodeId) -> &[NodeId] {
        if !self.contains(parent) {
            return &[];
        }

        &self.data(parent).children
    }

    /// Returns an iterator over the children.
    pub fn node_iter(&self, parent: NodeId) -> Children {
        Children {
            doc: self,
            iter: self.content(parent).iter(),
        }
    }

    /// Appends a detached node to a branch.
    ///
    /// # Errors
    ///
    /// `IllegalAdd` if the node already has a parent, belongs to another document,
    /// is a document or an attribute node, contains `parent`, or cannot be held
    /// by `parent`. The tree is not changed in that case.
    pub fn add(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
        self.check_add(parent, node)?;
        self.data_mut(parent).children.push(node);
        self.attach(parent, node);
        Ok(())
    }

    /// Inserts a detached node at `index`.
    ///
    /// `index` may be equal to `node_count`.
    pub fn insert(&mut self, parent: NodeId, index: usize, node: NodeId) -> Result<()> {
        self.check_add(parent, node)?;

        let len = self.node_count(parent);
        if index > len {
            return Err(Error::IndexOutOfRange { index, len });
        }

        self.data_mut(parent).children.insert(index, node);
        self.attach(parent, node);
        Ok(())
    }

    /// Removes an immediate child.
    ///
    /// Returns `false` and changes nothing if `node` is not a child of `parent`.
    pub fn remove(&mut self, parent: NodeId, node: NodeId) -> bool {
        if !self.contains(parent) || !self.contains(node) {
            return false;
        }

        let idx = match self.index_of(parent, node) {
            Some(idx) => idx,
            None => return false,
        };

        self.data_mut(parent).children.remove(idx);
        self.data_mut(node).parent = None;
        if self.root_element == Some(node) {
            self.root_element = None;
        }

        true
    }

    /// Removes a node from its parent.
    ///
    /// Attributes are detached from their owner element.
    /// Returns `false` if the node had no parent.
    pub fn detach(&mut self, node: NodeId) -> bool {
        if !self.contains(node) {
            return false;
        }

        let parent = match self.data(node).parent {
            Some(id) => id,
            None => return false,
        };

        if let NodeKind::Attribute { .. } = self.data(node).kind {
            if let NodeKind::Element { ref mut attributes, .. } = self.data_mut(parent).kind {
                attributes.retain(|id| *id != node);
            }
            self.data_mut(node).parent = None;
            return true;
        }

        self.remove(parent, node)
    }

    /// Detaches all children.
    ///
    /// # Errors
    ///
    /// `IllegalAdd` if `parent` belongs to another document.
    pub fn clear_content(&mut self, parent: NodeId) -> Result<()> {
        self.check_owned(parent)?;
        let children = mem::replace(&mut self.data_mut(parent).children, Vec::new());
        for id in children {
            self.data_mut(id).parent = None;
        }

        if parent == self.root_id() {
            self.root_element = None;
        }

        Ok(())
    }

    /// Moves all children of `source` to the end of `target`.
    ///
    /// All children are checked first, so on error nothing is moved.
    /// To keep `source` intact, copy it with `deep_copy` first.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut doc = xmlbranch::Document::parse("<r><a><x/><y/></a><b/></r>").unwrap();
    /// let r = doc.root_element_id().unwrap();
    /// let (a, b) = (doc.node(r, 0).unwrap(), doc.node(r, 1).unwrap());
    ///
    /// doc.append_content(b, a).unwrap();
    /// assert_eq!(doc.node_count(a), 0);
    /// assert_eq!(doc.node_count(b), 2);
    /// ```
    pub fn append_content(&mut self, target: NodeId, source: NodeId) -> Result<()> {
        self.check_owned(target)?;
        self.check_owned(source)?;
        self.check_branch(target)?;

        if target == source {
            return Ok(());
        }

        let to_document = target == self.root_id();
        let mut has_root = to_document && self.root_element.is_some();
        for &child in self.content(source) {
            if self.is_ancestor_or_self(child, target) {
                return Err(Error::illegal_add("the node is an ancestor of the branch"));
            }

            if to_document {
                match self.kind(child).node_type() {
                    NodeType::Element if has_root => {
                        return Err(Error::illegal_add("the document already has a root element"));
                    }
                    NodeType::Element => has_root = true,
                    NodeType::Text | NodeType::CData => {
                        return Err(Error::illegal_add("a document cannot contain text"));
                    }
                    _ => {}
                }
            }
        }

        let moved = mem::replace(&mut self.data_mut(source).children, Vec::new());
        if source == self.root_id() {
            self.root_element = None;
        }

        for &id in &moved {
            self.attach(target, id);
        }
        self.data_mut(target).children.extend(moved);

        Ok(())
    }

    /// Merges adjacent text nodes and removes empty ones in the whole subtree.
    ///
    /// CDATA sections are left as is. Merged-away nodes are detached and keep their own text.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut doc = xmlbranch::Document::new();
    /// let root = doc.root_id();
    /// let e = doc.add_element(root, "e").unwrap();
    /// doc.append_text(e, "foo").unwrap();
    /// doc.append_text(e, "").unwrap();
    /// doc.append_text(e, "bar").unwrap();
    ///
    /// doc.normalize(root).unwrap();
    /// assert_eq!(doc.node_count(e), 1);
    /// assert_eq!(doc.get(e).text(), Some("foobar"));
    /// ```
    ///
    /// # Errors
    ///
    /// `IllegalAdd` if `branch` belongs to another document.
    pub fn normalize(&mut self, branch: NodeId) -> Result<()> {
        self.check_owned(branch)?;
        self.normalize_branch(branch);
        Ok(())
    }

    fn normalize_branch(&mut self, branch: NodeId) {
        if !self.kind(branch).is_branch() {
            return;
        }

        let children = mem::replace(&mut self.data_mut(branch).children, Vec::new());
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        for id in children {
            let text = match self.kind(id) {
                NodeKind::Text(text) => Some(text.clone()),
                _ => None,
            };

            match text {
                Some(text) => {
                    let prev = kept.last().cloned().filter(|prev| {
                        self.kind(*prev).node_type() == NodeType::Text
                    });

                    if text.is_empty() {
                        self.data_mut(id).parent = None;
                    } else if let Some(prev) = prev {
                        self.append_to_text(prev, &text);
                        self.data_mut(id).parent = None;
                    } else {
                        kept.push(id);
                    }
                }
                None => {
                    self.normalize_branch(id);
                    kept.push(id);
                }
            }
        }

        self.data_mut(branch).children = kept;
    }

    /// Creates an element from a `prefix:local` name and appends it.
    ///
    /// The prefix is resolved using the namespaces in scope at `parent`.
    pub fn add_element(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        self.check_owned(parent)?;
        let (prefix, local) = parse_qualified(name);
        let ns = self.namespace_for_prefix(parent, prefix).map(str::to_string);
        if let (Some(prefix), None) = (prefix, &ns) {
            return Err(Error::illegal_add(format!("the prefix '{}' is not bound", prefix)));
        }

        let name = self.names.resolve(local, ns.as_deref(), prefix);
        self.add_element_qname(parent, name)
    }

    /// Creates an element in a namespace and appends it.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut doc = xmlbranch::Document::new();
    /// let root = doc.root_id();
    /// let e = doc.add_element_ns(root, "x:e", "urn:1").unwrap();
    ///
    /// let name = doc.get(e).name().unwrap();
    /// assert_eq!(name.namespace(), Some("urn:1"));
    /// assert_eq!(name.prefix(), Some("x"));
    /// ```
    pub fn add_element_ns(&mut self, parent: NodeId, qualified: &str, uri: &str) -> Result<NodeId> {
        let (prefix, local) = parse_qualified(qualified);
        let name = self.names.resolve(local, Some(uri), prefix);
        self.add_element_qname(parent, name)
    }

    /// Creates an element and appends it.
    pub fn add_element_qname(&mut self, parent: NodeId, name: QName) -> Result<NodeId> {
        self.check_branch(parent)?;
        self.check_kind_fits(parent, NodeType::Element)?;
        let id = self.create_element(name);
        self.add(parent, id)?;
        Ok(id)
    }

    /// Creates a text node and appends it.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId> {
        self.check_branch(parent)?;
        self.check_kind_fits(parent, NodeType::Text)?;
        let id = self.create_text(text);
        self.add(parent, id)?;
        Ok(id)
    }

    /// Creates a CDATA node and appends it.
    pub fn append_cdata(&mut self, parent: NodeId, text: &str) -> Result<NodeId> {
        self.check_branch(parent)?;
        self.check_kind_fits(parent, NodeType::CData)?;
        let id = self.create_cdata(text);
        self.add(parent, id)?;
        Ok(id)
    }

    /// Creates a comment and appends it.
    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> Result<NodeId> {
        self.check_branch(parent)?;
        let id = self.create_comment(text);
        self.add(parent, id)?;
        Ok(id)
    }

    /// Creates a processing instruction and appends it.
    pub fn append_pi(&mut self, parent: NodeId, target: &str, value: Option<&str>) -> Result<NodeId> {
        self.check_branch(parent)?;
        let id = self.create_pi(target, value);
        self.add(parent, id)?;
        Ok(id)
    }

    /// Appends an element node.
    ///
    /// Fails with `IllegalAdd` if `node` is not an element.
    pub fn add_element_node(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
        self.expect_type(node, NodeType::Element)?;
        self.add(parent, node)
    }

    /// Appends a comment node.
    ///
    /// Fails with `IllegalAdd` if `node` is not a comment.
    pub fn add_comment_node(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
        self.expect_type(node, NodeType::Comment)?;
        self.add(parent, node)
    }

    /// Appends a processing instruction node.
    ///
    /// Fails with `IllegalAdd` if `node` is not a processing instruction.
    pub fn add_pi_node(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
        self.expect_type(node, NodeType::PI)?;
        self.add(parent, node)
    }

    /// Removes an element child.
    pub fn remove_element(&mut self, parent: NodeId, node: NodeId) -> Result<bool> {
        self.expect_type(node, NodeType::Element)?;
        Ok(self.remove(parent, node))
    }

    /// Removes a comment child.
    pub fn remove_comment(&mut self, parent: NodeId, node: NodeId) -> Result<bool> {
        self.expect_type(node, NodeType::Comment)?;
        Ok(self.remove(parent, node))
    }

    /// Removes a processing instruction child.
    pub fn remove_pi(&mut self, parent: NodeId, node: NodeId) -> Result<bool> {
        self.expect_type(node, NodeType::PI)?;
        Ok(self.remove(parent, node))
    }

    /// Replaces the root element.
    ///
    /// The previous root element, if any, is detached and returned.
    /// The new one takes its position.
    pub fn set_root_element(&mut self, element: NodeId) -> Result<Option<NodeId>> {
        self.expect_type(element, NodeType::Element)?;
        if self.data(element).parent.is_some() {
            return Err(Error::illegal_add("the node already has a parent"));
        }

        let root = self.root_id();
        let old = self.root_element;
        match old {
            Some(old) => {
                if let Some(idx) = self.index_of(root, old) {
                    self.data_mut(root).children[idx] = element;
                }
                self.data_mut(old).parent = None;
                self.data_mut(element).parent = Some(root);
                self.root_element = Some(element);
            }
            None => self.add(root, element)?,
        }

        Ok(old)
    }

    /// Copies a subtree of this document.
    ///
    /// The copy is detached.
    pub fn deep_copy(&mut self, node: NodeId) -> Result<NodeId> {
        self.check_owned(node)?;
        let snapshot = Snapshot::new(self, node)?;
        Ok(self.insert_snapshot(snapshot))
    }

    /// Copies a subtree of another document into this one.
    ///
    /// Names are re-interned in this document. The copy is detached.
    pub fn import_node(&mut self, other: &Document, node: NodeId) -> Result<NodeId> {
        if !other.contains(node) {
            return Err(Error::illegal_add("the node belongs to another document"));
        }

        let snapshot = Snapshot::new(other, node)?;
        Ok(self.insert_snapshot(snapshot))
    }

    fn insert_snapshot(&mut self, snapshot: Snapshot) -> NodeId {
        let kind = match snapshot.kind {
            NodeKind::Element { name, namespaces, .. } => {
                let name = self.reintern(&name);
                let namespaces = namespaces.iter().map(|ns| {
                    Namespace::new(ns.prefix(), self.names.intern_uri(ns.uri()))
                }).collect();
                NodeKind::Element { name, attributes: Vec::new(), namespaces }
            }
            NodeKind::Attribute { name, value } => {
                NodeKind::Attribute { name: self.reintern(&name), value }
            }
            kind => kind,
        };

        let id = self.push_node(kind);

        for attr in snapshot.attributes {
            let attr_id = self.insert_snapshot(attr);
            if let NodeKind::Element { ref mut attributes, .. } = self.data_mut(id).kind {
                attributes.push(attr_id);
            }
            self.data_mut(attr_id).parent = Some(id);
        }

        for child in snapshot.children {
            let child_id = self.insert_snapshot(child);
            self.data_mut(id).children.push(child_id);
            self.data_mut(child_id).parent = Some(id);
        }

        id
    }

    fn reintern(&mut self, name: &QName) -> QName {
        self.names.resolve(name.local_name(), name.namespace(), name.prefix())
    }

    fn attach(&mut self, parent: NodeId, node: NodeId) {
        self.data_mut(node).parent = Some(parent);
        if parent == self.root_id() && self.kind(node).node_type() == NodeType::Element {
            self.root_element = Some(node);
        }
    }

    fn check_branch(&self, parent: NodeId) -> Result<()> {
        self.check_owned(parent)?;
        if self.kind(parent).is_branch() {
            Ok(())
        } else {
            Err(Error::illegal_add("the parent node is not a branch"))
        }
    }

    fn check_kind_fits(&self, parent: NodeId, node_type: NodeType) -> Result<()> {
        if parent != self.root_id() {
            return Ok(());
        }

        match node_type {
            NodeType::Element if self.root_element.is_some() => {
                Err(Error::illegal_add("the document already has a root element"))
            }
            NodeType::Text | NodeType::CData => {
                Err(Error::illegal_add("a document cannot contain text"))
            }
            NodeType::Document | NodeType::Attribute => {
                Err(Error::illegal_add("invalid node type"))
            }
            _ => Ok(()),
        }
    }

    fn check_add(&self, parent: NodeId, node: NodeId) -> Result<()> {
        self.check_branch(parent)?;
        self.check_owned(node)?;

        let node_type = self.kind(node).node_type();
        match node_type {
            NodeType::Document => return Err(Error::illegal_add("a document cannot be a child")),
            NodeType::Attribute => {
                return Err(Error::illegal_add("attributes are not part of the content"));
            }
            _ => {}
        }

        if self.data(node).parent.is_some() {
            return Err(Error::illegal_add("the node already has a parent"));
        }

        if self.is_ancestor_or_self(node, parent) {
            return Err(Error::illegal_add("the node is an ancestor of the branch"));
        }

        self.check_kind_fits(parent, node_type)
    }

    fn expect_type(&self, node: NodeId, node_type: NodeType) -> Result<()> {
        self.check_owned(node)?;
        let actual = self.kind(node).node_type();
        if actual == node_type {
            Ok(())
        } else {
            Err(Error::illegal_add(format!("expected {:?}, got {:?}", node_type, actual)))
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut curr = Some(node);
        while let Some(id) = curr {
            if id == ancestor {
                return true;
            }
            curr = self.data(id).parent;
        }

        false
    }
}


/// An owned copy of a subtree, used to copy nodes without aliasing the arena.
struct Snapshot {
    kind: NodeKind,
    attributes: Vec<Snapshot>,
    children: Vec<Snapshot>,
}

impl Snapshot {
    fn new(doc: &Document, id: NodeId) -> Result<Self> {
        let d = doc.data(id);
        let attributes = match d.kind {
            NodeKind::Document => {
                return Err(Error::illegal_add("a document node cannot be copied"));
            }
            NodeKind::Element { ref attributes, .. } => {
                attributes.iter().map(|a| Snapshot::new(doc, *a)).collect::<Result<Vec<_>>>()?
            }
            _ => Vec::new(),
        };

        let children = d.children.iter()
            .map(|c| Snapshot::new(doc, *c))
            .collect::<Result<Vec<_>>>()?;

        Ok(Snapshot { kind: d.kind.clone(), attributes, children })
    }
}
