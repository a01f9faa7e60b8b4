//! JSON wire codec: the universal fallback round trip of the converter engine.

mod codec;
mod convert;
mod fields;

pub use codec::JsonCodec;
