use std::fmt;


/// A resolved input location.
///
/// Only describes where the data lives. Reading it is up to the tokenizer.
#[derive(Clone, PartialEq, Debug)]
pub struct InputLocator {
    public_id: Option<String>,
    system_id: String,
}

impl InputLocator {
    /// Creates a new locator.
    pub fn new(public_id: Option<&str>, system_id: &str) -> Self {
        InputLocator {
            public_id: public_id.map(str::to_string),
            system_id: system_id.to_string(),
        }
    }

    /// Returns the public identifier.
    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    /// Returns the system identifier, usually a URI.
    pub fn system_id(&self) -> &str {
        &self.system_id
    }
}

impl fmt::Display for InputLocator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.system_id)
    }
}


/// Maps external identifiers to input locations.
pub trait EntityResolver {
    /// Resolves an entity.
    ///
    /// Returns `None` when the entity cannot be resolved.
    fn resolve_entity(&self, public_id: Option<&str>, system_id: &str) -> Option<InputLocator>;
}

impl<F> EntityResolver for F
    where F: Fn(Option<&str>, &str) -> Option<InputLocator>
{
    fn resolve_entity(&self, public_id: Option<&str>, system_id: &str) -> Option<InputLocator> {
        self(public_id, system_id)
    }
}


/// Resolves relative system identifiers against a base URI.
///
/// # Examples
///
/// ```
/// use xmlbranch::{DefaultEntityResolver, EntityResolver};
///
/// let resolver = DefaultEntityResolver::from_system_id("http://a.org/dtd/doc.xml");
/// let loc = resolver.resolve_entity(None, "doc.dtd").unwrap();
/// assert_eq!(loc.system_id(), "http://a.org/dtd/doc.dtd");
///
/// let loc = resolver.resolve_entity(None, "file:///doc.dtd").unwrap();
/// assert_eq!(loc.system_id(), "file:///doc.dtd");
/// ```
#[derive(Clone, PartialEq, Debug, Default)]
pub struct DefaultEntityResolver {
    uri_prefix: Option<String>,
}

impl DefaultEntityResolver {
    /// Creates a resolver with an explicit base prefix.
    pub fn new(uri_prefix: Option<&str>) -> Self {
        DefaultEntityResolver { uri_prefix: uri_prefix.map(str::to_string) }
    }

    /// Creates a resolver from the system identifier of the input itself.
    ///
    /// The base is everything up to and including the last `/`.
    /// No base is used when there is no `/` or it is the first character.
    pub fn from_system_id(system_id: &str) -> Self {
        let prefix = match system_id.rfind('/') {
            Some(idx) if idx > 0 => Some(&system_id[..idx + 1]),
            _ => None,
        };

        Self::new(prefix)
    }

    /// Returns the base prefix.
    pub fn uri_prefix(&self) -> Option<&str> {
        self.uri_prefix.as_deref()
    }
}

impl EntityResolver for DefaultEntityResolver {
    fn resolve_entity(&self, public_id: Option<&str>, system_id: &str) -> Option<InputLocator> {
        if system_id.is_empty() {
            return Some(InputLocator::new(public_id, system_id));
        }

        // A scheme separator at index 0 does not make the identifier absolute.
        let is_relative = match system_id.find(':') {
            Some(idx) => idx == 0,
            None => true,
        };

        match self.uri_prefix {
            Some(ref prefix) if is_relative => {
                let id = format!("{}{}", prefix, system_id);
                Some(InputLocator::new(public_id, &id))
            }
            _ => Some(InputLocator::new(public_id, system_id)),
        }
    }
}
