//! Type descriptors, values and the wire codec seam shared by the converter
//! engine and codec plugins.

extern crate self as typeconv_api;

pub mod codec;
pub mod error;
pub mod reflect;
pub mod types;
pub mod value;

pub use codec::{JsonHooks, WireCodec};
pub use error::{BoxError, ErrorKind, ValueError};
pub use reflect::Reflect;
pub use types::{FieldDesc, FloatWidth, IntWidth, Kind, Type, TypeDesc};
pub use value::Value;

pub use typeconv_derive::Record;

#[doc(hidden)]
pub use serde_json;
