//! Tag-driven conversion between independently defined record types.
//!
//! Fields are matched by a tag (`json` unless configured otherwise) or, when
//! untagged, by case-insensitive field name. Each matched pair is converted
//! by the first applicable strategy: plain copy, custom converter, nested
//! record plan, sequence, string-keyed map, primitive conversion, and
//! finally a round trip through the wire codec.
//!
//! ```ignore
//! #[derive(Record)]
//! pub struct Row { #[tag(json = "id")] pub id: String }
//!
//! #[derive(Record, Default)]
//! pub struct Dto { #[tag(json = "id")] pub id: String }
//!
//! let mut dto = Dto::default();
//! typeconv_engine::convert(&row, &mut dto, vec![])?;
//! ```

pub mod cache;
pub mod engine;
pub mod error;
mod exec;
pub mod fields;
pub mod options;
pub mod plan;
pub mod registry;
mod resolve;

pub use engine::Engine;
pub use error::{ConvertError, ErrorCategory};
pub use options::Options;
pub use plan::{CompiledPlan, Plan, Step};
pub use registry::{ConverterRegistry, CustomConverter};

use typeconv_api::Reflect;

/// Copy `src` into `dst` on the global engine with default options.
pub fn convert<S: Reflect, D: Reflect>(
    src: &S,
    dst: &mut D,
    converters: Vec<CustomConverter>,
) -> Result<(), ConvertError> {
    Engine::global().convert(src, dst, converters)
}

/// Build or fetch a cached plan from `S` to `D` on the global engine.
pub fn build_plan<S: Reflect, D: Reflect>(options: &Options) -> Result<Plan<S, D>, ConvertError> {
    Engine::global().build_plan(options)
}
