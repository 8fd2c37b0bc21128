use std::mem;
use std::rc::Rc;

use xmlparser::{
    ElementEnd,
    EntityDefinition,
    ExternalId,
    Reference,
    Stream,
    StrSpan,
    Token,
    Tokenizer,
};

use crate::builder::TreeBuilder;
use crate::doctype::{Declaration, DeclarationOrigin};
use crate::entity::{DefaultEntityResolver, EntityResolver};
use crate::error::Error;
use crate::options::ParsingOptions;
use crate::tree::Document;
use crate::{NS_XML_URI, NS_XMLNS_URI};

type Result<T> = std::result::Result<T, Error>;

const ENTITY_DEPTH: u8 = 10;

// Total length of entity values expanded in one document.
const ENTITY_EXPANSION_LIMIT: usize = 1_000_000;


impl Document {
    /// Parses the input XML string with the default options.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlbranch::Document::parse("<e/>").unwrap();
    /// assert_eq!(doc.root().descendants().count(), 2); // document node + `e` element node
    /// ```
    pub fn parse(text: &str) -> Result<Document> {
        Self::parse_with_options(text, &ParsingOptions::default())
    }

    /// Parses the input XML string.
    pub fn parse_with_options(text: &str, options: &ParsingOptions) -> Result<Document> {
        parse_with(text, None, options, None)
    }
}

/// Parses the input XML string from a known location.
///
/// When `resolver` is not set, relative identifiers of external entities are
/// resolved against `system_id`.
///
/// # Examples
///
/// ```
/// use xmlbranch::ParsingOptions;
///
/// let text = "<!DOCTYPE e SYSTEM 'e.dtd'><e/>";
/// let doc = xmlbranch::parse_with(text, Some("http://a.org/e.xml"),
///                                 &ParsingOptions::default(), None).unwrap();
///
/// let subset = doc.doc_type().unwrap().external_subset().unwrap();
/// assert_eq!(subset.system_id(), "http://a.org/e.dtd");
/// ```
pub fn parse_with(
    text: &str,
    system_id: Option<&str>,
    options: &ParsingOptions,
    resolver: Option<Rc<dyn EntityResolver>>,
) -> Result<Document> {
    let resolver = resolver.unwrap_or_else(|| {
        let r = match system_id {
            Some(id) => DefaultEntityResolver::from_system_id(id),
            None => DefaultEntityResolver::default(),
        };
        Rc::new(r)
    });

    let builder = TreeBuilder::with_resolver(options.clone(), system_id, resolver);
    let mut parser = Parser {
        text,
        builder,
        entities: Vec::new(),
        buffer: TextBuffer::new(),
        tag: None,
        attrs: Vec::new(),
        namespaces: Vec::new(),
        open: Vec::new(),
        fragment_base: 0,
        expanded: 0,
    };

    parser.builder.document_start()?;
    parser.process_tokens(Tokenizer::from(text), 0)?;
    parser.builder.document_end()?;
    parser.builder.finish()
}


struct Entity<'a> {
    name: &'a str,
    value: StrSpan<'a>,
}

#[derive(Clone, Copy)]
struct TagName<'a> {
    prefix: &'a str,
    local: &'a str,
}

impl<'a> TagName<'a> {
    fn qualified(&self) -> String {
        gen_qname_string(self.prefix, self.local)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Text,
    Attribute,
}

struct Parser<'a> {
    text: &'a str,
    builder: TreeBuilder,
    entities: Vec<Entity<'a>>,
    buffer: TextBuffer,
    tag: Option<TagName<'a>>,
    attrs: Vec<(String, String)>,
    namespaces: Vec<(Option<&'a str>, String)>,
    open: Vec<TagName<'a>>,
    fragment_base: usize,
    expanded: usize,
}

impl<'a> Parser<'a> {
    fn process_tokens(&mut self, tokenizer: Tokenizer<'a>, depth: u8) -> Result<()> {
        for token in tokenizer {
            let token = match token {
                Ok(token) => token,
                Err(e) => return Err(self.builder.malformed_input(&e.to_string(), Some(e.pos()), None)),
            };

            match token {
                Token::Declaration { version, encoding, standalone, .. } => {
                    let encoding = encoding.map(|e| e.as_str());
                    self.builder.xml_declaration(version.as_str(), encoding, standalone)?;
                }
                Token::ProcessingInstruction { target, content, .. } => {
                    self.builder.processing_instruction(target.as_str(), content.map(|c| c.as_str()))?;
                }
                Token::Comment { text, .. } => {
                    self.builder.comment(text.as_str())?;
                }
                Token::DtdStart { name, external_id, .. }
                | Token::EmptyDtd { name, external_id, .. } => {
                    let (public_id, system_id) = split_external_id(external_id);
                    self.builder.doctype_start(name.as_str(), public_id, system_id)?;
                }
                Token::EntityDeclaration { name, definition, .. } => {
                    self.process_entity_declaration(name.as_str(), definition)?;
                }
                Token::ElementStart { prefix, local, span } => {
                    if prefix.as_str() == "xmlns" {
                        return Err(self.error_at("the 'xmlns' prefix cannot be used on elements", span.start()));
                    }

                    self.tag = Some(TagName { prefix: prefix.as_str(), local: local.as_str() });
                    self.attrs.clear();
                    self.namespaces.clear();
                }
                Token::Attribute { prefix, local, value, span } => {
                    self.process_attribute(prefix.as_str(), local.as_str(), value, span.start(), depth)?;
                }
                Token::ElementEnd { end, span } => {
                    self.process_element_end(end, span.start())?;
                }
                Token::Text { text } => {
                    self.expand(text, depth, Mode::Text)?;
                    self.flush_text()?;
                }
                Token::Cdata { text, .. } => {
                    self.buffer.push_from_text(text.as_str());
                    let text = self.buffer.take();
                    self.builder.cdata(&text)?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn process_entity_declaration(&mut self, name: &'a str, definition: EntityDefinition<'a>) -> Result<()> {
        let decl = match definition {
            EntityDefinition::EntityValue(value) => {
                self.entities.push(Entity { name, value });
                Declaration::InternalEntity {
                    name: name.to_string(),
                    value: value.as_str().to_string(),
                }
            }
            EntityDefinition::ExternalId(id) => {
                let (public_id, system_id) = split_external_id(Some(id));
                let system_id = system_id.unwrap_or("");
                let resolved = self.builder.resolve_entity(public_id, system_id)?;
                Declaration::ExternalEntity {
                    name: name.to_string(),
                    public_id: public_id.map(str::to_string),
                    system_id: resolved.map_or_else(|| system_id.to_string(),
                                                    |loc| loc.system_id().to_string()),
                }
            }
        };

        self.builder.dtd_declaration(decl, DeclarationOrigin::Internal)
    }

    fn process_attribute(
        &mut self,
        prefix: &'a str,
        local: &'a str,
        value: StrSpan<'a>,
        pos: usize,
        depth: u8,
    ) -> Result<()> {
        self.buffer.clear();
        self.expand(value, depth, Mode::Attribute)?;
        let value = self.buffer.take();

        if prefix == "xmlns" {
            if value == NS_XMLNS_URI {
                return Err(self.error_at("the 'xmlns' URI must not be declared", pos));
            }

            let is_xml_uri = value == NS_XML_URI;
            if local == "xml" {
                if !is_xml_uri {
                    return Err(self.error_at("the 'xml' prefix is mapped to a wrong URI", pos));
                }

                // Always bound, no need to declare.
                return Ok(());
            } else if is_xml_uri {
                return Err(self.error_at("the 'xml' URI is used with a non-'xml' prefix", pos));
            }

            self.namespaces.push((Some(local), value));
        } else if prefix.is_empty() && local == "xmlns" {
            if value == NS_XML_URI || value == NS_XMLNS_URI {
                return Err(self.error_at("a reserved URI cannot be the default namespace", pos));
            }

            self.namespaces.push((None, value));
        } else {
            self.attrs.push((gen_qname_string(prefix, local), value));
        }

        Ok(())
    }

    fn process_element_end(&mut self, end: ElementEnd<'a>, pos: usize) -> Result<()> {
        match end {
            ElementEnd::Open | ElementEnd::Empty => {
                let tag = match self.tag.take() {
                    Some(tag) => tag,
                    None => return Err(self.error_at("an element end without a start", pos)),
                };

                let attrs = mem::replace(&mut self.attrs, Vec::new());
                let namespaces = mem::replace(&mut self.namespaces, Vec::new());
                let attrs: Vec<_> = attrs.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
                let namespaces: Vec<_> = namespaces.iter().map(|(p, u)| (*p, u.as_str())).collect();
                self.builder.element_start(&tag.qualified(), &attrs, &namespaces)?;

                if let ElementEnd::Empty = end {
                    self.builder.element_end()?;
                } else {
                    self.open.push(tag);
                }
            }
            ElementEnd::Close(prefix, local) => {
                if self.open.len() <= self.fragment_base {
                    return Err(self.error_at("unexpected close tag", pos));
                }

                let actual = gen_qname_string(prefix.as_str(), local.as_str());
                if let Some(tag) = self.open.pop() {
                    if tag.prefix != prefix.as_str() || tag.local != local.as_str() {
                        let msg = format!("expected '{}' tag, not '{}'", tag.qualified(), actual);
                        return Err(self.error_at(&msg, pos));
                    }
                }

                self.builder.element_end()?;
            }
        }

        Ok(())
    }

    // https://www.w3.org/TR/REC-xml/#sec-entexpand
    fn expand(&mut self, span: StrSpan<'a>, depth: u8, mode: Mode) -> Result<()> {
        let mut rest = span.as_str();
        let mut pos = span.start();
        while !rest.is_empty() {
            let (chunk, len) = next_chunk(rest);
            match chunk {
                Chunk::Text(text) => match mode {
                    Mode::Text => self.buffer.push_from_text(text),
                    Mode::Attribute => self.buffer.push_from_attr(text),
                },
                Chunk::Char(c) => self.buffer.push_raw(c),
                Chunk::Entity(name) => {
                    if let Some(c) = predefined_entity(name) {
                        self.buffer.push_raw(c);
                    } else {
                        self.expand_entity(name, pos, depth, mode)?;
                    }
                }
            }

            rest = &rest[len..];
            pos += len;
        }

        Ok(())
    }

    fn expand_entity(&mut self, name: &str, pos: usize, depth: u8, mode: Mode) -> Result<()> {
        let value = match self.entities.iter().find(|e| e.name == name) {
            Some(entity) => entity.value,
            None => {
                let msg = format!("unknown entity reference '{}'", name);
                return Err(self.error_at(&msg, pos));
            }
        };

        if depth >= ENTITY_DEPTH {
            return Err(self.error_at("a possible entity reference loop is detected", pos));
        }

        self.expanded += value.as_str().len();
        if self.expanded > ENTITY_EXPANSION_LIMIT {
            return Err(self.error_at("entity expansion exceeds the size limit", pos));
        }

        if mode == Mode::Text && value.as_str().contains('<') {
            self.flush_text()?;

            let base = mem::replace(&mut self.fragment_base, self.open.len());
            let tokenizer = Tokenizer::from_fragment(self.text, value.range());
            self.process_tokens(tokenizer, depth + 1)?;

            if self.open.len() != self.fragment_base {
                return Err(self.error_at("an element inside an entity is not closed", pos));
            }
            self.fragment_base = base;
        } else {
            self.expand(value, depth + 1, mode)?;
        }

        Ok(())
    }

    fn flush_text(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            let text = self.buffer.take();
            self.builder.characters(&text)?;
        }

        Ok(())
    }

    fn error_at(&mut self, message: &str, pos: usize) -> Error {
        let pos = Stream::from(self.text).gen_text_pos_from(pos);
        self.builder.malformed_input(message, Some(pos), None)
    }
}


enum Chunk<'a> {
    Text(&'a str),
    Char(char),
    Entity(&'a str),
}

fn next_chunk(text: &str) -> (Chunk, usize) {
    if text.starts_with('&') {
        let mut s = Stream::from(text);
        match s.try_consume_reference() {
            Some(Reference::Char(c)) => (Chunk::Char(c), s.pos()),
            Some(Reference::Entity(name)) => (Chunk::Entity(name), s.pos()),
            // Not a reference, keep as is.
            None => (Chunk::Text("&"), 1),
        }
    } else {
        let end = text.find('&').unwrap_or_else(|| text.len());
        (Chunk::Text(&text[..end]), end)
    }
}

fn predefined_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => None,
    }
}

fn split_external_id(id: Option<ExternalId>) -> (Option<&str>, Option<&str>) {
    match id {
        Some(ExternalId::System(system)) => (None, Some(system.as_str())),
        Some(ExternalId::Public(public, system)) => (Some(public.as_str()), Some(system.as_str())),
        None => (None, None),
    }
}

fn gen_qname_string(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}


struct TextBuffer {
    buf: String,
    after_cr: bool,
}

impl TextBuffer {
    fn new() -> Self {
        TextBuffer {
            buf: String::with_capacity(32),
            after_cr: false,
        }
    }

    fn push_raw(&mut self, c: char) {
        self.buf.push(c);
        self.after_cr = false;
    }

    // Translate \r\n and any \r that is not followed by \n into a single \n character.
    //
    // https://www.w3.org/TR/xml/#sec-line-ends
    fn push_from_text(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '\n' if self.after_cr => self.after_cr = false,
                '\r' => {
                    self.buf.push('\n');
                    self.after_cr = true;
                }
                _ => self.push_raw(c),
            }
        }
    }

    // https://www.w3.org/TR/REC-xml/#AVNormalize
    fn push_from_attr(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '\n' if self.after_cr => self.after_cr = false,
                '\r' => {
                    self.buf.push(' ');
                    self.after_cr = true;
                }
                '\n' | '\t' => self.push_raw(' '),
                _ => self.push_raw(c),
            }
        }
    }

    fn take(&mut self) -> String {
        self.after_cr = false;
        mem::replace(&mut self.buf, String::new())
    }

    fn clear(&mut self) {
        self.buf.clear();
        self.after_cr = false;
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
