use typeconv_api::{Type, Value, ValueError, WireCodec};

use super::convert::{json_into_value, value_to_json};

// ═══════════════════════════════════════════════════════════════
//  JsonCodec
// ═══════════════════════════════════════════════════════════════

/// Type-guided JSON codec.
///
/// Records are written as objects keyed by their `json` tag (or field name),
/// honouring `-`, `omitempty`, embedded flattening and per-type JSON hooks.
/// Decoding matches object keys exactly first, then case-insensitively.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl WireCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &Value, ty: Type) -> Result<Vec<u8>, ValueError> {
        let json = value_to_json(value, ty)?;
        serde_json::to_vec(&json).map_err(|e| ValueError::encode(format!("json encode: {e}")))
    }

    fn decode(&self, bytes: &[u8], ty: Type, slot: &mut Value) -> Result<(), ValueError> {
        let json: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| ValueError::decode(format!("json decode: {e}")))?;
        json_into_value(json, ty, slot)
    }
}
