use std::fmt;

/// Boxed error returned by user-supplied converters and wire hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error kind for value-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A value does not have the shape its type descriptor requires.
    Shape,
    /// The wire codec could not encode a value.
    Encode,
    /// The wire codec could not decode bytes into a value.
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Shape => f.write_str("shape"),
            ErrorKind::Encode => f.write_str("encode"),
            ErrorKind::Decode => f.write_str("decode"),
        }
    }
}

/// Value error, returned by `Reflect::from_value` and by `WireCodec`.
#[derive(Debug, Clone)]
pub struct ValueError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ValueError {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Shape, message: msg.into() }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Encode, message: msg.into() }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Decode, message: msg.into() }
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ValueError {}

// ---------------------------------------------------------------------------
// From impls: standard error types → ValueError with correct ErrorKind
// ---------------------------------------------------------------------------

impl From<serde_json::Error> for ValueError {
    fn from(e: serde_json::Error) -> Self {
        Self::decode(e.to_string())
    }
}

/// Same-width integer conversions cannot fail.
impl From<std::convert::Infallible> for ValueError {
    fn from(e: std::convert::Infallible) -> Self {
        match e {}
    }
}

impl From<std::num::TryFromIntError> for ValueError {
    fn from(e: std::num::TryFromIntError) -> Self {
        Self::shape(e.to_string())
    }
}
