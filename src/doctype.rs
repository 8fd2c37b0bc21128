use crate::entity::InputLocator;


/// Where a DTD declaration came from.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DeclarationOrigin {
    /// The internal subset, inside `<!DOCTYPE ... [ ]>`.
    Internal,
    /// The external subset.
    External,
}


/// A DTD declaration.
#[derive(Clone, PartialEq, Debug)]
#[allow(missing_docs)]
pub enum Declaration {
    /// `<!ELEMENT name model>`
    Element { name: String, model: String },
    /// `<!ATTLIST element attribute kind default value>`
    Attribute {
        element: String,
        attribute: String,
        kind: String,
        value_default: Option<String>,
        value: Option<String>,
    },
    /// `<!ENTITY name 'value'>`
    InternalEntity { name: String, value: String },
    /// `<!ENTITY name PUBLIC 'public' 'system'>`
    ExternalEntity { name: String, public_id: Option<String>, system_id: String },
}

impl Declaration {
    /// Returns the name of the declared item.
    ///
    /// For an attribute declaration this is the attribute name.
    pub fn name(&self) -> &str {
        match *self {
            Declaration::Element { ref name, .. } => name,
            Declaration::Attribute { ref attribute, .. } => attribute,
            Declaration::InternalEntity { ref name, .. } => name,
            Declaration::ExternalEntity { ref name, .. } => name,
        }
    }
}


/// Document type metadata.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct DocumentType {
    name: String,
    public_id: Option<String>,
    system_id: Option<String>,
    internal: Vec<Declaration>,
    external: Vec<Declaration>,
    external_subset: Option<InputLocator>,
}

impl DocumentType {
    /// Creates a new document type.
    pub fn new(name: &str, public_id: Option<&str>, system_id: Option<&str>) -> Self {
        DocumentType {
            name: name.to_string(),
            public_id: public_id.map(str::to_string),
            system_id: system_id.map(str::to_string),
            ..DocumentType::default()
        }
    }

    /// Returns the root element name declared by the doctype.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the public identifier.
    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    /// Returns the system identifier.
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    /// Returns declarations from the internal subset.
    pub fn internal_declarations(&self) -> &[Declaration] {
        &self.internal
    }

    /// Returns declarations from the external subset.
    pub fn external_declarations(&self) -> &[Declaration] {
        &self.external
    }

    /// Returns the resolved location of the external subset.
    pub fn external_subset(&self) -> Option<&InputLocator> {
        self.external_subset.as_ref()
    }

    /// Records a declaration.
    pub fn add_declaration(&mut self, decl: Declaration, origin: DeclarationOrigin) {
        match origin {
            DeclarationOrigin::Internal => self.internal.push(decl),
            DeclarationOrigin::External => self.external.push(decl),
        }
    }

    pub(crate) fn set_external_subset(&mut self, locator: InputLocator) {
        self.external_subset = Some(locator);
    }
}
