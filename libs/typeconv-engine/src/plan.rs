use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use typeconv_api::{Reflect, Type};

use crate::engine::Engine;
use crate::error::ConvertError;
use crate::fields::FieldMap;
use crate::options::Options;
use crate::registry::ConverterRegistry;

/// One matched field pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Normalized field key both sides agreed on.
    pub key: String,
    pub src_path: Vec<usize>,
    pub dst_path: Vec<usize>,
    pub src_ty: Type,
    pub dst_ty: Type,
}

/// Type-erased plan: the steps between two record types.
///
/// Holds no converters. Leaves are resolved per execution, so the same plan
/// serves calls with different custom converters.
#[derive(Debug)]
pub struct CompiledPlan {
    pub src: Type,
    pub dst: Type,
    pub steps: Vec<Step>,
    pub options: Options,
}

/// Natural join of two field maps, in source discovery order.
pub fn join_fields(src: &FieldMap, dst: &FieldMap) -> Vec<Step> {
    src.iter()
        .filter_map(|(key, s)| {
            let d = dst.get(key)?;
            Some(Step {
                key: key.clone(),
                src_path: s.path.clone(),
                dst_path: d.path.clone(),
                src_ty: s.ty,
                dst_ty: d.ty,
            })
        })
        .collect()
}

/// Typed handle to a cached top-level plan from `S` to `D`.
pub struct Plan<S, D> {
    compiled: Arc<CompiledPlan>,
    engine: Engine,
    _types: PhantomData<fn(&S) -> D>,
}

impl<S, D> Plan<S, D> {
    pub(crate) fn new(compiled: Arc<CompiledPlan>, engine: Engine) -> Self {
        Self {
            compiled,
            engine,
            _types: PhantomData,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.compiled.steps
    }

    pub fn options(&self) -> &Options {
        &self.compiled.options
    }

    /// Whether both handles refer to the same cached plan object.
    pub fn same_as(&self, other: &Plan<S, D>) -> bool {
        Arc::ptr_eq(&self.compiled, &other.compiled)
    }
}

impl<S: Reflect, D: Reflect> Plan<S, D> {
    /// Copy every matched field of `src` into `dst`, without custom converters.
    ///
    /// Stops at the first failing field. Fields written before the failure
    /// stay written.
    pub fn convert(&self, dst: &mut D, src: &S) -> Result<(), ConvertError> {
        self.convert_with(dst, src, &ConverterRegistry::new())
    }

    pub(crate) fn convert_with(
        &self,
        dst: &mut D,
        src: &S,
        registry: &ConverterRegistry,
    ) -> Result<(), ConvertError> {
        let src_val = src.to_value();
        let mut dst_val = dst.to_value();
        let result = self.engine.execute(&self.compiled, &mut dst_val, &src_val, registry);
        match D::from_value(dst_val) {
            Ok(out) => {
                *dst = out;
                result
            }
            Err(e) => result.and(Err(e.into())),
        }
    }
}

impl<S, D> Clone for Plan<S, D> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.compiled), self.engine.clone())
    }
}

impl<S, D> fmt::Debug for Plan<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("src", &self.compiled.src)
            .field("dst", &self.compiled.dst)
            .field("steps", &self.compiled.steps.len())
            .field("options", &self.compiled.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use typeconv_api::Record;

    use super::*;
    use crate::fields::discover_fields;

    #[derive(Record)]
    pub struct Src {
        pub b: i32,
        pub a: String,
        pub only_src: bool,
    }

    #[derive(Record)]
    pub struct Dst {
        pub a: String,
        pub only_dst: bool,
        pub b: i64,
    }

    #[test]
    fn join_follows_source_order() {
        let src = discover_fields(Type::of::<Src>(), "json");
        let dst = discover_fields(Type::of::<Dst>(), "json");
        let steps = join_fields(&src, &dst);

        let keys: Vec<&str> = steps.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(steps[0].src_path, [0]);
        assert_eq!(steps[0].dst_path, [2]);
        assert_eq!(steps[0].dst_ty, Type::of::<i64>());
    }
}
