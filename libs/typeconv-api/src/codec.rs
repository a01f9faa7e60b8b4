use crate::error::{BoxError, ValueError};
use crate::types::Type;
use crate::value::Value;

pub type ToJsonFn = fn(&Value) -> Result<serde_json::Value, BoxError>;
pub type FromJsonFn = fn(serde_json::Value) -> Result<Value, BoxError>;

/// Type-erased custom JSON representation of a type.
///
/// Set by `#[conv(to_json = "...", from_json = "...")]`. A codec that sees a
/// type with hooks must call them instead of walking the type's shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHooks {
    pub to_json: Option<ToJsonFn>,
    pub from_json: Option<FromJsonFn>,
}

/// Serialization round-trip used as the conversion of last resort.
///
/// Implementations must be safe to share between threads: one codec serves
/// every conversion performed by an engine.
pub trait WireCodec: Send + Sync {
    /// Short codec name for logs.
    fn name(&self) -> &'static str;

    /// Serialize `value`, read as type `ty`.
    fn encode(&self, value: &Value, ty: Type) -> Result<Vec<u8>, ValueError>;

    /// Decode `bytes` into `slot`, read as type `ty`, merging into what the
    /// slot already holds: record fields absent from the input are kept, map
    /// entries are upserted, and an explicit null clears a pointer, sequence
    /// or map while leaving scalars untouched.
    fn decode(&self, bytes: &[u8], ty: Type, slot: &mut Value) -> Result<(), ValueError>;
}
