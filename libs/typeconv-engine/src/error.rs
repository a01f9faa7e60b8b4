use typeconv_api::{BoxError, ValueError};

/// Broad classification of a `ConvertError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The two record types cannot be joined.
    Planning,
    /// A supplied custom converter is unusable.
    ConverterShape,
    /// A destination field cannot be written.
    NotSettable,
    /// A leaf conversion (custom function or wire fallback) failed.
    LeafConversion,
    /// A value did not match the shape of its type.
    Reflection,
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("no mappable fields in {type_name} for tag {tag:?}")]
    NoMappableFields { type_name: String, tag: String },

    #[error("no overlapping fields between {src} and {dst} for tag {tag:?}")]
    NoOverlappingFields { src: String, dst: String, tag: String },

    #[error("invalid custom converter: {0}")]
    ConverterShape(String),

    #[error("duplicate converter for {src} -> {dst}")]
    DuplicateConverter { src: String, dst: String },

    #[error("destination field {field:?} not settable at {path:?}")]
    NotSettable { path: Vec<usize>, field: String },

    #[error(transparent)]
    Leaf(BoxError),

    #[error("wire fallback: {0}")]
    Wire(ValueError),

    #[error("value error: {0}")]
    Value(#[from] ValueError),

    #[error("config error: {0}")]
    Config(String),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorCategory {
        match self {
            ConvertError::NoMappableFields { .. } | ConvertError::NoOverlappingFields { .. } => {
                ErrorCategory::Planning
            }
            ConvertError::ConverterShape(_) | ConvertError::DuplicateConverter { .. } => {
                ErrorCategory::ConverterShape
            }
            ConvertError::NotSettable { .. } => ErrorCategory::NotSettable,
            ConvertError::Leaf(_) | ConvertError::Wire(_) => ErrorCategory::LeafConversion,
            ConvertError::Value(_) => ErrorCategory::Reflection,
            ConvertError::Config(_) => ErrorCategory::Config,
        }
    }

    /// Add context to the error.
    ///
    /// For `Wire` and `Value` variants, context is added to the inner `ValueError`.
    /// Custom converter errors are returned verbatim.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            ConvertError::Wire(e) => ConvertError::Wire(e.with_context(ctx)),
            ConvertError::Value(e) => ConvertError::Value(e.with_context(ctx)),
            ConvertError::Config(msg) => ConvertError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}
