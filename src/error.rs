use crate::TextPos;

/// A list of all possible errors.
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum Error {
    /// The event source reported invalid markup.
    ///
    /// Always fatal to the current build.
    #[error("{}", malformed_message(.message, .pos, .system_id.as_deref()))]
    MalformedInput {
        /// A human-readable description.
        message: String,
        /// Position in the source, if known.
        pos: Option<TextPos>,
        /// System identifier of the source, if known.
        system_id: Option<String>,
    },

    /// A node cannot be added to the branch.
    ///
    /// The tree is left unchanged.
    #[error("cannot add node: {0}")]
    IllegalAdd(String),

    /// A child index is out of the `[0, node_count)` range.
    #[allow(missing_docs)]
    #[error("index {index} is out of range for a branch with {len} nodes")]
    IndexOutOfRange { index: usize, len: usize },

    /// Incorrect tree structure or event order.
    #[error("{0}")]
    Structural(String),

    /// An external entity cannot be resolved.
    #[allow(missing_docs)]
    #[error("cannot resolve entity '{system_id}'{}", public_suffix(.public_id.as_deref()))]
    EntityResolution { public_id: Option<String>, system_id: String },
}

impl Error {
    pub(crate) fn malformed<S: Into<String>>(message: S, pos: Option<TextPos>) -> Self {
        Error::MalformedInput { message: message.into(), pos, system_id: None }
    }

    pub(crate) fn illegal_add<S: Into<String>>(message: S) -> Self {
        Error::IllegalAdd(message.into())
    }

    /// Returns the source position, if the error has one.
    pub fn pos(&self) -> Option<TextPos> {
        match *self {
            Error::MalformedInput { pos, .. } => pos,
            _ => None,
        }
    }
}

fn malformed_message(message: &str, pos: &Option<TextPos>, system_id: Option<&str>) -> String {
    match *pos {
        Some(pos) => {
            format!("error on line {} of document {} : {}",
                    pos.row, system_id.unwrap_or(""), message)
        }
        None => message.to_string(),
    }
}

fn public_suffix(public_id: Option<&str>) -> String {
    match public_id {
        Some(id) => format!(" (public id '{}')", id),
        None => String::new(),
    }
}
