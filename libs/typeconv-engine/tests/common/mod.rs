#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use typeconv_api::{BoxError, Record, Type, Value, ValueError, WireCodec};
use typeconv_codec_json::JsonCodec;
use typeconv_engine::Engine;

// ---------------------------------------------------------------------------
// Date types with custom JSON representations
// ---------------------------------------------------------------------------

#[derive(Record, Debug, Clone, PartialEq, Default)]
#[conv(to_json = "date_to_json")]
pub struct InternalDate {
    pub y: i32,
    pub m: i32,
    pub d: i32,
}

fn date_to_json(d: &InternalDate) -> Result<serde_json::Value, BoxError> {
    Ok(format!("{:04}-{:02}-{:02}", d.y, d.m, d.d).into())
}

#[derive(Record, Debug, Clone, PartialEq, Default)]
#[conv(from_json = "date_from_json")]
pub struct ExternalDate {
    pub raw: String,
}

fn date_from_json(json: serde_json::Value) -> Result<ExternalDate, BoxError> {
    Ok(ExternalDate {
        raw: serde_json::from_value(json)?,
    })
}

// ---------------------------------------------------------------------------
// Codec that counts round trips
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CountingCodec {
    encodes: Arc<AtomicUsize>,
}

impl CountingCodec {
    pub fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }
}

impl WireCodec for CountingCodec {
    fn name(&self) -> &'static str {
        "counting-json"
    }

    fn encode(&self, value: &Value, ty: Type) -> Result<Vec<u8>, ValueError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        JsonCodec.encode(value, ty)
    }

    fn decode(&self, bytes: &[u8], ty: Type, slot: &mut Value) -> Result<(), ValueError> {
        JsonCodec.decode(bytes, ty, slot)
    }
}

/// Fresh engine (empty caches) whose fallback round trips can be counted.
pub fn counting_engine() -> (Engine, CountingCodec) {
    let codec = CountingCodec::default();
    (Engine::with_codec(codec.clone()), codec)
}
