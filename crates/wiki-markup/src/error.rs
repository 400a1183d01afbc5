//! Error types for markup conversion.

/// Error raised while configuring a converter.
///
/// Conversion itself never fails: malformed markup is rendered as escaped
/// text and token failures degrade to literal source text.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MarkupError {
    /// The configured dialect name is not one of the supported grammars.
    #[error("unsupported markup dialect: {0:?}")]
    UnsupportedDialect(String),
}

/// Error returned by a token renderer.
///
/// Caught at the call boundary: the token renders as its literal source text
/// and conversion continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenExpansionError {
    /// The token body could not be interpreted by the renderer.
    #[error("malformed token body: {0}")]
    MalformedBody(String),

    /// The renderer failed for another reason.
    #[error("token renderer failed: {0}")]
    Renderer(String),
}
