use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;


/// A reference-counted string shared by all nodes of a document.
///
/// Used for namespace URIs and interned local names.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct Uri(Rc<str>);

impl Uri {
    pub(crate) fn new(text: &str) -> Self {
        Uri(Rc::from(text))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}


#[derive(PartialEq)]
struct NameData {
    local: Uri,
    ns: Option<Uri>,
}


/// A qualified name.
///
/// Consists of a local name, an optional namespace URI and an optional prefix.
///
/// Names are compared by the `(local name, namespace URI)` pair only.
/// The prefix is kept for this occurrence of the name and takes no part in
/// the comparison.
///
/// # Examples
///
/// ```
/// let mut names = xmlbranch::NameRegistry::new();
/// let a = names.resolve("e", Some("urn:1"), Some("a"));
/// let b = names.resolve("e", Some("urn:1"), Some("b"));
///
/// assert_eq!(a, b);
/// assert!(a.same_identity(&b));
/// assert_eq!(a.prefix(), Some("a"));
/// assert_eq!(b.prefix(), Some("b"));
/// ```
#[derive(Clone)]
pub struct QName {
    data: Rc<NameData>,
    prefix: Option<Uri>,
}

impl QName {
    /// Returns the local part of the name.
    pub fn local_name(&self) -> &str {
        self.data.local.as_str()
    }

    /// Returns the namespace URI.
    pub fn namespace(&self) -> Option<&str> {
        self.data.ns.as_ref().map(Uri::as_str)
    }

    /// Checks that the name has a namespace.
    pub fn has_namespace(&self) -> bool {
        self.data.ns.is_some()
    }

    /// Returns the prefix used by this occurrence of the name.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_ref().map(Uri::as_str)
    }

    /// Returns `prefix:local` or just `local`.
    pub fn qualified_name(&self) -> String {
        match self.prefix() {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, self.local_name()),
            _ => self.local_name().to_string(),
        }
    }

    /// Checks that both names point to the same interned entry.
    ///
    /// Always `false` for names created with interning disabled,
    /// unless they are clones of each other.
    pub fn same_identity(&self, other: &QName) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Checks that the name matches a local name and an optional namespace.
    pub fn matches(&self, local: &str, ns: Option<&str>) -> bool {
        self.local_name() == local && self.namespace() == ns
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &QName) -> bool {
        self.same_identity(other) || *self.data == *other.data
    }
}

impl Eq for QName {}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.namespace() {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name()),
            None => write!(f, "{}", self.local_name()),
        }
    }
}


/// Interns qualified names and namespace URIs.
///
/// Each `Document` owns one registry, so interned names are freed
/// together with the document.
pub struct NameRegistry {
    names: HashMap<(Uri, Option<Uri>), Rc<NameData>>,
    uris: HashSet<Uri>,
    interning: bool,
}

impl NameRegistry {
    /// Creates a new registry with interning enabled.
    pub fn new() -> Self {
        Self::with_interning(true)
    }

    /// Creates a new registry.
    ///
    /// When `interning` is `false`, every `resolve` call allocates a new name.
    pub fn with_interning(interning: bool) -> Self {
        NameRegistry {
            names: HashMap::new(),
            uris: HashSet::new(),
            interning,
        }
    }

    /// Checks that interning is enabled.
    pub fn is_interning(&self) -> bool {
        self.interning
    }

    /// Returns a canonical name for the `(local, namespace)` pair.
    ///
    /// An empty namespace is treated as no namespace.
    pub fn resolve(&mut self, local: &str, ns: Option<&str>, prefix: Option<&str>) -> QName {
        let ns = ns.filter(|ns| !ns.is_empty());

        if !self.interning {
            let data = NameData { local: Uri::new(local), ns: ns.map(Uri::new) };
            return QName { data: Rc::new(data), prefix: prefix.map(Uri::new) };
        }

        let ns = ns.map(|ns| self.intern_uri(ns));
        let key = (Uri::new(local), ns);
        let data = match self.names.get(&key) {
            Some(data) => Rc::clone(data),
            None => {
                let data = Rc::new(NameData { local: key.0.clone(), ns: key.1.clone() });
                self.names.insert(key, Rc::clone(&data));
                data
            }
        };

        QName { data, prefix: prefix.map(Uri::new) }
    }

    /// Returns a shared copy of the URI string.
    pub(crate) fn intern_uri(&mut self, uri: &str) -> Uri {
        if !self.interning {
            return Uri::new(uri);
        }

        if let Some(v) = self.uris.get(uri) {
            return v.clone();
        }

        let uri = Uri::new(uri);
        self.uris.insert(uri.clone());
        uri
    }

    /// Returns the number of distinct interned names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Checks that nothing was interned yet.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NameRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NameRegistry {{ names: {}, interning: {} }}", self.names.len(), self.interning)
    }
}

impl std::borrow::Borrow<str> for Uri {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}


/// Splits a `prefix:local` string.
///
/// Returns `None` as a prefix for unprefixed names.
///
/// # Examples
///
/// ```
/// assert_eq!(xmlbranch::parse_qualified("a:e"), (Some("a"), "e"));
/// assert_eq!(xmlbranch::parse_qualified("e"), (None, "e"));
/// ```
pub fn parse_qualified(name: &str) -> (Option<&str>, &str) {
    match name.find(':') {
        Some(idx) => (Some(&name[..idx]), &name[idx + 1..]),
        None => (None, name),
    }
}
