use std::ops::Range;

use crate::name::Uri;
use crate::NS_XML_URI;


/// A namespace.
///
/// Contains an optional *prefix* and URI pair.
/// The default namespace has no prefix.
#[derive(Clone, PartialEq, Debug)]
pub struct Namespace {
    prefix: Option<Uri>,
    uri: Uri,
}

impl Namespace {
    pub(crate) fn new(prefix: Option<&str>, uri: Uri) -> Self {
        Namespace {
            prefix: prefix.filter(|p| !p.is_empty()).map(Uri::new),
            uri,
        }
    }

    /// Returns the namespace prefix.
    ///
    /// `None` for the default namespace.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_ref().map(Uri::as_str)
    }

    /// Returns the namespace URI.
    ///
    /// An empty URI undeclares the default namespace.
    pub fn uri(&self) -> &str {
        self.uri.as_str()
    }

    fn has_prefix(&self, prefix: Option<&str>) -> bool {
        self.prefix() == prefix.filter(|p| !p.is_empty())
    }
}


/// A stack of namespace scopes, one frame per open element.
///
/// Bindings are stored in a single `Vec`; every frame is a range of it.
///
/// # Examples
///
/// ```
/// use xmlbranch::NamespaceStack;
///
/// let mut stack = NamespaceStack::new();
/// stack.push_scope(&[(Some("x"), "urn:1")]);
/// stack.push_scope(&[]);
/// assert_eq!(stack.resolve_prefix(Some("x")), Some("urn:1"));
/// stack.pop_scope();
/// stack.pop_scope();
/// assert_eq!(stack.resolve_prefix(Some("x")), None);
/// ```
#[derive(Default, Debug)]
pub struct NamespaceStack {
    bindings: Vec<Namespace>,
    frames: Vec<Range<usize>>,
}

impl NamespaceStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new frame with the given `(prefix, uri)` bindings.
    ///
    /// `None` or an empty prefix declares the default namespace.
    pub fn push_scope(&mut self, bindings: &[(Option<&str>, &str)]) {
        let start = self.bindings.len();
        for &(prefix, uri) in bindings {
            self.bindings.push(Namespace::new(prefix, Uri::new(uri)));
        }
        self.frames.push(start..self.bindings.len());
    }

    pub(crate) fn push_namespaces(&mut self, namespaces: &[Namespace]) {
        let start = self.bindings.len();
        self.bindings.extend_from_slice(namespaces);
        self.frames.push(start..self.bindings.len());
    }

    /// Closes the innermost frame.
    ///
    /// Popping an empty stack is a caller bug.
    pub fn pop_scope(&mut self) {
        debug_assert!(!self.frames.is_empty(), "unbalanced namespace scope");

        if let Some(frame) = self.frames.pop() {
            self.bindings.truncate(frame.start);
        }
    }

    /// Returns the number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Resolves a prefix to a URI, innermost frame first.
    ///
    /// The `xml` prefix is always bound. `None` resolves the default namespace,
    /// which is also `None` when it is undeclared.
    pub fn resolve_prefix(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(NS_XML_URI);
        }

        self.resolve(prefix).map(Namespace::uri).filter(|uri| !uri.is_empty())
    }

    pub(crate) fn resolve(&self, prefix: Option<&str>) -> Option<&Namespace> {
        self.bindings.iter().rev().find(|ns| ns.has_prefix(prefix))
    }

    /// Checks that the innermost frame declares `prefix`.
    pub fn is_declared_in_current_scope(&self, prefix: Option<&str>) -> bool {
        match self.frames.last() {
            Some(frame) => self.bindings[frame.clone()].iter().any(|ns| ns.has_prefix(prefix)),
            None => false,
        }
    }

    /// Returns all visible bindings. Inner declarations hide outer ones.
    pub fn in_scope(&self) -> Vec<&Namespace> {
        let mut list: Vec<&Namespace> = Vec::new();
        for ns in self.bindings.iter().rev() {
            if !list.iter().any(|n| n.prefix == ns.prefix) {
                list.push(ns);
            }
        }
        list.reverse();
        list
    }
}
