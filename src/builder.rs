use std::mem;
use std::rc::Rc;

use log::{debug, trace, warn};

use crate::doctype::{Declaration, DeclarationOrigin, DocumentType};
use crate::entity::{DefaultEntityResolver, EntityResolver, InputLocator};
use crate::error::Error;
use crate::name::{parse_qualified, QName};
use crate::namespace::{Namespace, NamespaceStack};
use crate::options::ParsingOptions;
use crate::tree::{Document, NodeId, NodeKind, NodeType};
use crate::{TextPos, NS_XMLNS_URI};

type Result<T> = std::result::Result<T, Error>;


/// A parse event.
///
/// Owned version of the `TreeBuilder` calls, for sources that produce events as values.
#[derive(Clone, PartialEq, Debug)]
#[allow(missing_docs)]
pub enum XmlEvent {
    DocumentStart,
    XmlDeclaration {
        version: String,
        encoding: Option<String>,
        standalone: Option<bool>,
    },
    DoctypeStart {
        name: String,
        public_id: Option<String>,
        system_id: Option<String>,
    },
    /// Attributes and namespaces are `(qualified name, value)` and `(prefix, uri)` pairs.
    ElementStart {
        name: String,
        attributes: Vec<(String, String)>,
        namespaces: Vec<(Option<String>, String)>,
    },
    ElementEnd,
    Characters(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        data: Option<String>,
    },
    CData(String),
    DtdDeclaration {
        declaration: Declaration,
        origin: DeclarationOrigin,
    },
    DocumentEnd,
    MalformedInput {
        message: String,
        pos: Option<TextPos>,
        system_id: Option<String>,
    },
}


struct Settings {
    options: ParsingOptions,
    resolver: Rc<dyn EntityResolver>,
    system_id: Option<String>,
}

impl Settings {
    fn malformed<S: Into<String>>(&self, message: S) -> Error {
        Error::MalformedInput {
            message: message.into(),
            pos: None,
            system_id: self.system_id.clone(),
        }
    }

    fn resolve_entity(&self, public_id: Option<&str>, system_id: &str) -> Result<Option<InputLocator>> {
        match self.resolver.resolve_entity(public_id, system_id) {
            Some(loc) => {
                trace!("entity '{}' resolved to '{}'", system_id, loc);
                Ok(Some(loc))
            }
            None if self.options.fail_on_unresolved_entities => {
                Err(Error::EntityResolution {
                    public_id: public_id.map(str::to_string),
                    system_id: system_id.to_string(),
                })
            }
            None => {
                warn!("cannot resolve entity '{}', ignoring", system_id);
                Ok(None)
            }
        }
    }
}


struct Building {
    doc: Document,
    open: Vec<NodeId>,
    scopes: NamespaceStack,
}

impl Building {
    fn top(&self) -> NodeId {
        self.open.last().cloned().unwrap_or_else(|| self.doc.root_id())
    }

    fn at_document_level(&self) -> bool {
        self.open.len() < 2
    }

    fn resolve_name(&mut self, qualified: &str, is_element: bool, s: &Settings) -> Result<QName> {
        let (prefix, local) = parse_qualified(qualified);
        let ns = match prefix {
            Some("xmlns") => Some(NS_XMLNS_URI),
            Some(p) => match self.scopes.resolve_prefix(Some(p)) {
                Some(uri) => Some(uri),
                None if s.options.allow_unbound_prefixes => {
                    warn!("the prefix '{}' of '{}' is not bound, ignoring", p, qualified);
                    None
                }
                None => {
                    return Err(s.malformed(format!("the prefix '{}' of '{}' is not bound", p, qualified)));
                }
            },
            // Unprefixed attributes never get the default namespace.
            None if is_element => self.scopes.resolve_prefix(None),
            None => None,
        };

        let ns = ns.map(str::to_string);
        Ok(self.doc.names.resolve(local, ns.as_deref(), prefix))
    }

    fn element_start(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        namespaces: &[(Option<&str>, &str)],
        s: &Settings,
    ) -> Result<()> {
        if self.at_document_level() && self.doc.root_element_id().is_some() {
            return Err(s.malformed(format!("unexpected element '{}' after the root element", name)));
        }

        let mut declared: Vec<Namespace> = Vec::with_capacity(namespaces.len());
        for &(prefix, uri) in namespaces {
            let ns = Namespace::new(prefix, self.doc.names.intern_uri(uri));
            match declared.iter_mut().find(|n| n.prefix() == ns.prefix()) {
                Some(n) => *n = ns,
                None => declared.push(ns),
            }
        }
        self.scopes.push_namespaces(&declared);

        let qname = self.resolve_name(name, true, s)?;
        let id = self.doc.push_node(NodeKind::Element {
            name: qname,
            attributes: Vec::new(),
            namespaces: declared,
        });

        for &(attr_name, value) in attributes {
            let qname = self.resolve_name(attr_name, false, s)?;
            self.doc.set_attribute(id, qname, value)?;
        }

        let parent = self.top();
        self.doc.add(parent, id)?;
        self.open.push(id);
        Ok(())
    }

    fn element_end(&mut self, s: &Settings) -> Result<()> {
        if self.at_document_level() {
            return Err(s.malformed("unexpected end tag"));
        }

        self.open.pop();
        self.scopes.pop_scope();
        Ok(())
    }

    fn characters(&mut self, text: &str, s: &Settings) -> Result<()> {
        let opt = &s.options;
        if text.is_empty() {
            return Ok(());
        }

        let is_whitespace = text.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));

        if self.at_document_level() {
            if is_whitespace {
                return Ok(());
            }

            return Err(s.malformed("text is not allowed outside of the root element"));
        }

        if opt.strip_whitespace_text && is_whitespace {
            trace!("whitespace-only text stripped");
            return Ok(());
        }

        let top = self.top();
        if opt.merge_adjacent_text {
            if let Some(&last) = self.doc.content(top).last() {
                if self.doc.kind(last).node_type() == NodeType::Text {
                    self.doc.append_to_text(last, text);
                    return Ok(());
                }
            }
        }

        self.doc.append_text(top, text)?;
        Ok(())
    }

    fn cdata(&mut self, text: &str, s: &Settings) -> Result<()> {
        if self.at_document_level() {
            return Err(s.malformed("CDATA is not allowed outside of the root element"));
        }

        let top = self.top();
        self.doc.append_cdata(top, text)?;
        Ok(())
    }

    fn doctype_start(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        s: &Settings,
    ) -> Result<()> {
        if self.doc.doc_type().is_some() {
            return Err(s.malformed("duplicated DOCTYPE"));
        }

        if self.doc.root_element_id().is_some() {
            return Err(s.malformed("DOCTYPE after the root element"));
        }

        let mut doc_type = DocumentType::new(name, public_id, system_id);
        if let Some(system_id) = system_id {
            if let Some(loc) = s.resolve_entity(public_id, system_id)? {
                doc_type.set_external_subset(loc);
            }
        }

        self.doc.set_doc_type(Some(doc_type));
        Ok(())
    }

    fn dtd_declaration(&mut self, decl: Declaration, origin: DeclarationOrigin, s: &Settings) -> Result<()> {
        let include = match origin {
            DeclarationOrigin::Internal => s.options.include_internal_dtd_declarations,
            DeclarationOrigin::External => s.options.include_external_dtd_declarations,
        };

        if !include {
            trace!("{:?} declaration of '{}' dropped", origin, decl.name());
            return Ok(());
        }

        match self.doc.doc_type_mut() {
            Some(doc_type) => {
                doc_type.add_declaration(decl, origin);
                Ok(())
            }
            None => Err(Error::Structural("a DTD declaration without a DOCTYPE".to_string())),
        }
    }
}


enum State {
    Idle,
    Building(Building),
    Done(Document),
    Failed(Error),
}


/// Builds a `Document` from parse events.
///
/// Events are handled one at a time, in the order the tokenizer delivers them.
/// The first error aborts the build: the partial tree is dropped and every later
/// call returns the same error.
///
/// # Examples
///
/// ```
/// use xmlbranch::{ParsingOptions, TreeBuilder};
///
/// let mut b = TreeBuilder::new(ParsingOptions::default());
/// b.document_start().unwrap();
/// b.element_start("root", &[("id", "1")], &[]).unwrap();
/// b.characters("hello").unwrap();
/// b.element_end().unwrap();
/// b.document_end().unwrap();
///
/// let doc = b.finish().unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(root.attribute("id", None), Some("1"));
/// assert_eq!(root.text(), Some("hello"));
/// ```
pub struct TreeBuilder {
    settings: Settings,
    state: State,
}

impl TreeBuilder {
    /// Creates a builder with the default entity resolver.
    pub fn new(options: ParsingOptions) -> Self {
        Self::with_resolver(options, None, Rc::new(DefaultEntityResolver::default()))
    }

    /// Creates a builder for an input with a known system identifier.
    ///
    /// Relative identifiers of external entities are resolved against it.
    pub fn with_system_id(options: ParsingOptions, system_id: &str) -> Self {
        let resolver = DefaultEntityResolver::from_system_id(system_id);
        Self::with_resolver(options, Some(system_id), Rc::new(resolver))
    }

    /// Creates a builder with a custom entity resolver.
    pub fn with_resolver(
        options: ParsingOptions,
        system_id: Option<&str>,
        resolver: Rc<dyn EntityResolver>,
    ) -> Self {
        TreeBuilder {
            settings: Settings {
                options,
                resolver,
                system_id: system_id.map(str::to_string),
            },
            state: State::Idle,
        }
    }

    /// Returns the options.
    pub fn options(&self) -> &ParsingOptions {
        &self.settings.options
    }

    /// Checks that the document is complete.
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done(_))
    }

    /// Returns the error that aborted the build.
    pub fn error(&self) -> Option<&Error> {
        match self.state {
            State::Failed(ref e) => Some(e),
            _ => None,
        }
    }

    /// Starts a new document.
    pub fn document_start(&mut self) -> Result<()> {
        trace!("document start");
        match self.state {
            State::Idle => {}
            State::Failed(ref e) => return Err(e.clone()),
            State::Done(_) => {
                return Err(Error::Structural("document start after the document end".to_string()));
            }
            State::Building(_) => {
                let e = self.settings.malformed("unexpected document start");
                return Err(self.fail(e));
            }
        }

        let opt = &self.settings.options;
        let mut doc = Document::with_name_interning(opt.name_interning);
        doc.set_validation_requested(opt.validating);
        doc.set_encoding(opt.encoding.as_deref());
        doc.set_entity_resolver(Some(self.settings.resolver.clone()));

        let root = doc.root_id();
        debug!("building a document from {}", self.settings.system_id.as_deref().unwrap_or("<input>"));
        self.state = State::Building(Building {
            doc,
            open: vec![root],
            scopes: NamespaceStack::new(),
        });

        Ok(())
    }

    /// Records the XML declaration.
    ///
    /// An encoding set in the options takes precedence.
    pub fn xml_declaration(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) -> Result<()> {
        trace!("xml declaration: {}", version);
        self.with_building("xml declaration", |b, s| {
            b.doc.set_declaration(version, standalone);
            if s.options.encoding.is_none() {
                b.doc.set_encoding(encoding);
            }
            Ok(())
        })
    }

    /// Creates the document type.
    ///
    /// The external subset, if any, is resolved via the entity resolver.
    pub fn doctype_start(&mut self, name: &str, public_id: Option<&str>, system_id: Option<&str>) -> Result<()> {
        trace!("doctype: {}", name);
        self.with_building("doctype", |b, s| b.doctype_start(name, public_id, system_id, s))
    }

    /// Opens an element.
    ///
    /// `attributes` are `(qualified name, value)` pairs and `namespaces` are the
    /// `(prefix, uri)` declarations made on this element.
    pub fn element_start(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        namespaces: &[(Option<&str>, &str)],
    ) -> Result<()> {
        trace!("element start: {}", name);
        self.with_building("element start", |b, s| b.element_start(name, attributes, namespaces, s))
    }

    /// Closes the current element.
    pub fn element_end(&mut self) -> Result<()> {
        trace!("element end");
        self.with_building("element end", |b, s| b.element_end(s))
    }

    /// Appends character data.
    pub fn characters(&mut self, text: &str) -> Result<()> {
        trace!("characters: {:?}", text);
        self.with_building("characters", |b, s| b.characters(text, s))
    }

    /// Appends a comment, unless comments are ignored.
    pub fn comment(&mut self, text: &str) -> Result<()> {
        trace!("comment: {:?}", text);
        self.with_building("comment", |b, s| {
            if !s.options.ignore_comments {
                let top = b.top();
                b.doc.append_comment(top, text)?;
            }
            Ok(())
        })
    }

    /// Appends a processing instruction.
    pub fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<()> {
        trace!("processing instruction: {}", target);
        self.with_building("processing instruction", |b, _| {
            let top = b.top();
            b.doc.append_pi(top, target, data)?;
            Ok(())
        })
    }

    /// Appends a CDATA section.
    pub fn cdata(&mut self, text: &str) -> Result<()> {
        trace!("cdata: {:?}", text);
        self.with_building("cdata", |b, s| b.cdata(text, s))
    }

    /// Records a DTD declaration if the options ask for it.
    pub fn dtd_declaration(&mut self, decl: Declaration, origin: DeclarationOrigin) -> Result<()> {
        self.with_building("dtd declaration", |b, s| b.dtd_declaration(decl, origin, s))
    }

    /// Resolves an external entity for the tokenizer.
    ///
    /// A resolution failure aborts a build in progress.
    pub fn resolve_entity(&mut self, public_id: Option<&str>, system_id: &str) -> Result<Option<InputLocator>> {
        if let State::Failed(ref e) = self.state {
            return Err(e.clone());
        }

        match self.settings.resolve_entity(public_id, system_id) {
            Ok(loc) => Ok(loc),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Completes the document.
    pub fn document_end(&mut self) -> Result<()> {
        trace!("document end");
        let building = match mem::replace(&mut self.state, State::Idle) {
            State::Building(b) => b,
            State::Failed(e) => {
                self.state = State::Failed(e.clone());
                return Err(e);
            }
            State::Done(doc) => {
                self.state = State::Done(doc);
                return Err(Error::Structural("duplicated document end".to_string()));
            }
            State::Idle => {
                let e = self.settings.malformed("unexpected document end");
                return Err(self.fail(e));
            }
        };

        if building.open.len() > 1 {
            let e = self.settings.malformed("unexpected end of the document, some elements are not closed");
            return Err(self.fail(e));
        }

        if building.doc.root_element_id().is_none() {
            let e = Error::Structural("the document does not have a root element".to_string());
            return Err(self.fail(e));
        }

        debug!("document built: {} nodes", building.doc.len());
        self.state = State::Done(building.doc);
        Ok(())
    }

    /// Aborts the build.
    ///
    /// Returns the recorded error. `system_id` defaults to the builder's one.
    /// After a failure the first error is kept and returned. A completed
    /// document is kept as well, only the new error is returned.
    pub fn malformed_input(&mut self, message: &str, pos: Option<TextPos>, system_id: Option<&str>) -> Error {
        let system_id = system_id.map(str::to_string).or_else(|| self.settings.system_id.clone());
        let e = Error::MalformedInput { message: message.to_string(), pos, system_id };
        self.fail(e)
    }

    /// Dispatches an event to the matching method.
    pub fn process(&mut self, event: XmlEvent) -> Result<()> {
        match event {
            XmlEvent::DocumentStart => self.document_start(),
            XmlEvent::XmlDeclaration { version, encoding, standalone } => {
                self.xml_declaration(&version, encoding.as_deref(), standalone)
            }
            XmlEvent::DoctypeStart { name, public_id, system_id } => {
                self.doctype_start(&name, public_id.as_deref(), system_id.as_deref())
            }
            XmlEvent::ElementStart { name, attributes, namespaces } => {
                let attributes: Vec<_> = attributes.iter()
                    .map(|(n, v)| (n.as_str(), v.as_str()))
                    .collect();
                let namespaces: Vec<_> = namespaces.iter()
                    .map(|(p, u)| (p.as_deref(), u.as_str()))
                    .collect();
                self.element_start(&name, &attributes, &namespaces)
            }
            XmlEvent::ElementEnd => self.element_end(),
            XmlEvent::Characters(text) => self.characters(&text),
            XmlEvent::Comment(text) => self.comment(&text),
            XmlEvent::ProcessingInstruction { target, data } => {
                self.processing_instruction(&target, data.as_deref())
            }
            XmlEvent::CData(text) => self.cdata(&text),
            XmlEvent::DtdDeclaration { declaration, origin } => self.dtd_declaration(declaration, origin),
            XmlEvent::DocumentEnd => self.document_end(),
            XmlEvent::MalformedInput { message, pos, system_id } => {
                Err(self.malformed_input(&message, pos, system_id.as_deref()))
            }
        }
    }

    /// Processes a whole event sequence and returns the document.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlbranch::{ParsingOptions, TreeBuilder, XmlEvent};
    ///
    /// let doc = TreeBuilder::new(ParsingOptions::default()).build(vec![
    ///     XmlEvent::DocumentStart,
    ///     XmlEvent::ElementStart { name: "e".into(), attributes: vec![], namespaces: vec![] },
    ///     XmlEvent::ElementEnd,
    ///     XmlEvent::DocumentEnd,
    /// ]).unwrap();
    ///
    /// assert!(doc.root_element().unwrap().has_tag_name("e", None));
    /// ```
    pub fn build<I>(mut self, events: I) -> Result<Document>
        where I: IntoIterator<Item = XmlEvent>
    {
        for event in events {
            self.process(event)?;
        }

        self.finish()
    }

    /// Returns the completed document.
    pub fn finish(self) -> Result<Document> {
        match self.state {
            State::Done(doc) => Ok(doc),
            State::Failed(e) => Err(e),
            _ => Err(Error::Structural("the document is not complete".to_string())),
        }
    }

    // The first error wins and a completed document is never dropped.
    fn fail(&mut self, e: Error) -> Error {
        match self.state {
            State::Failed(ref first) => first.clone(),
            State::Done(_) => {
                warn!("error after the document end: {}", e);
                e
            }
            _ => {
                debug!("build failed: {}", e);
                self.state = State::Failed(e.clone());
                e
            }
        }
    }

    fn with_building<F>(&mut self, event: &str, f: F) -> Result<()>
        where F: FnOnce(&mut Building, &Settings) -> Result<()>
    {
        let res = match self.state {
            State::Building(ref mut b) => f(b, &self.settings),
            State::Failed(ref e) => return Err(e.clone()),
            State::Idle => Err(self.settings.malformed(format!("{} before the document start", event))),
            State::Done(_) => {
                return Err(Error::Structural(format!("{} after the document end", event)));
            }
        };

        res.map_err(|e| self.fail(e))
    }
}
