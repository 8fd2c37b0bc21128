/// Tree building options.
///
/// Passed explicitly to `TreeBuilder::new` and `Document::parse_with_options`.
///
/// # Examples
///
/// ```
/// let opt = xmlbranch::ParsingOptions {
///     merge_adjacent_text: true,
///     ignore_comments: true,
///     ..xmlbranch::ParsingOptions::default()
/// };
///
/// let doc = xmlbranch::Document::parse_with_options("<e>a<!--x-->b</e>", &opt).unwrap();
/// let e = doc.root_element().unwrap();
/// assert_eq!(e.children().count(), 1);
/// assert_eq!(e.text(), Some("ab"));
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct ParsingOptions {
    /// Collapse adjacent text created during the build into one node.
    pub merge_adjacent_text: bool,

    /// Drop character data that consists only of whitespace.
    ///
    /// Applied before `merge_adjacent_text`.
    pub strip_whitespace_text: bool,

    /// Drop comments.
    pub ignore_comments: bool,

    /// Keep declarations from the internal DTD subset.
    pub include_internal_dtd_declarations: bool,

    /// Keep declarations from the external DTD subset.
    pub include_external_dtd_declarations: bool,

    /// Share one identity between equal qualified names.
    pub name_interning: bool,

    /// Ask the tokenizer to validate.
    ///
    /// The tree builder only records this flag.
    pub validating: bool,

    /// Keep names with an undeclared prefix instead of failing.
    ///
    /// Such names get no namespace.
    pub allow_unbound_prefixes: bool,

    /// Fail when the entity resolver cannot resolve an external entity.
    pub fail_on_unresolved_entities: bool,

    /// Encoding recorded on the document.
    ///
    /// Takes precedence over the XML declaration.
    pub encoding: Option<String>,
}

impl Default for ParsingOptions {
    fn default() -> Self {
        ParsingOptions {
            merge_adjacent_text: false,
            strip_whitespace_text: false,
            ignore_comments: false,
            include_internal_dtd_declarations: false,
            include_external_dtd_declarations: false,
            name_interning: true,
            validating: false,
            allow_unbound_prefixes: false,
            fail_on_unresolved_entities: false,
            encoding: None,
        }
    }
}
