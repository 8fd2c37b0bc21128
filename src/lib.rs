/*!
Represent an [XML 1.0](https://www.w3.org/TR/xml/) document as a mutable tree.

A tree is built incrementally by a [`TreeBuilder`] from parse events, or with
[`Document::parse`], which drives the builder from the `xmlparser` tokens.
After the build, the tree can be navigated via [`Node`] handles and changed via
the content list methods of [`Document`].

```
let mut doc = xmlbranch::Document::parse("<p>Hello</p>").unwrap();
let p = doc.root_element_id().unwrap();
doc.append_text(p, ", world").unwrap();
doc.normalize(p).unwrap();

assert_eq!(doc.get(p).text(), Some("Hello, world"));
```

[`TreeBuilder`]: struct.TreeBuilder.html
[`Document::parse`]: struct.Document.html#method.parse
[`Node`]: struct.Node.html
[`Document`]: struct.Document.html
*/

#![doc(html_root_url = "https://docs.rs/xmlbranch/0.1.0")]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use xmlparser::TextPos;

mod builder;
mod content;
mod doctype;
mod entity;
mod error;
mod name;
mod namespace;
mod node;
mod options;
mod parse;
mod tree;

pub use builder::{TreeBuilder, XmlEvent};
pub use doctype::{Declaration, DeclarationOrigin, DocumentType};
pub use entity::{DefaultEntityResolver, EntityResolver, InputLocator};
pub use error::Error;
pub use name::{parse_qualified, NameRegistry, QName};
pub use namespace::{Namespace, NamespaceStack};
pub use node::{Ancestors, Attributes, Children, Descendants, Edge, NextSiblings, Node, PrevSiblings, Traverse};
pub use options::ParsingOptions;
pub use parse::parse_with;
pub use tree::{Document, NodeId, NodeType, PI};


/// The <http://www.w3.org/XML/1998/namespace> URI.
pub const NS_XML_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// The <http://www.w3.org/2000/xmlns/> URI.
pub const NS_XMLNS_URI: &str = "http://www.w3.org/2000/xmlns/";
