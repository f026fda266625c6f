//! Input documents and their generic decoded trees.

mod node;
mod yaml;

pub use node::Node;
pub(crate) use yaml::parse_yaml;

use crate::{ComposeError, ComposeResult};

/// Content of one input document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    /// A tree decoded by the caller.
    Tree(Node),
    /// Raw document bytes, decoded as YAML on load.
    Bytes(Vec<u8>),
}

/// One input file of a compose project, identified by its filename.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Name used in diagnostics and as the identity for `extends` tracking.
    pub filename: String,
    /// Document content.
    pub source: DocumentSource,
}

impl Document {
    /// Wrap an already decoded tree.
    #[must_use]
    pub fn from_tree(filename: impl Into<String>, tree: Node) -> Self {
        Self {
            filename: filename.into(),
            source: DocumentSource::Tree(tree),
        }
    }

    /// Wrap raw document bytes.
    #[must_use]
    pub fn from_bytes(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            source: DocumentSource::Bytes(bytes.into()),
        }
    }

    /// Decode the document into a generic tree.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Decode`] if the bytes are not UTF-8 or not
    /// valid YAML.
    pub fn decode(&self) -> ComposeResult<Node> {
        match &self.source {
            DocumentSource::Tree(tree) => Ok(tree.clone()),
            DocumentSource::Bytes(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(|err| {
                    ComposeError::decode("", format!("{} is not valid UTF-8: {err}", self.filename))
                })?;
                parse_yaml(&self.filename, text)
            }
        }
    }
}
