//! Error taxonomy shared by the shape model, the handle layer and the PNG codec.

/// Convenience result type used across the crate.
pub type EditorResult<T> = Result<T, EditorError>;

/// Errors raised by editing operations.
///
/// None of these are fatal to an editing session: callers recover locally
/// (reject the mutation, drop the scene entry, fall back to a placeholder).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    /// Non-finite or degenerate points, transforms or extents.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A scene entry carries a `kind` this build does not know.
    #[error("unknown shape kind `{0}`")]
    UnknownShapeKind(String),

    /// An id-based link points at a shape that is not in the scene.
    #[error("shape `{shape}` references missing shape `{target}`")]
    MissingLinkedShape { shape: String, target: String },

    /// The byte stream is not a well-formed chunked container.
    #[error("container parse error: {0}")]
    ContainerParse(String),

    /// A text chunk keyword is empty, too long, or not representable.
    #[error("invalid text chunk keyword: {0}")]
    InvalidKeyword(String),

    /// Scene JSON could not be produced or understood.
    #[error("serialization error: {0}")]
    Serde(String),
}

impl EditorError {
    /// Build an [`EditorError::InvalidGeometry`] value.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Build an [`EditorError::ContainerParse`] value.
    pub fn container(msg: impl Into<String>) -> Self {
        Self::ContainerParse(msg.into())
    }

    /// Build an [`EditorError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}
