use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use typeconv_api::{Type, Value};

use crate::engine::Engine;
use crate::error::ConvertError;
use crate::options::Options;
use crate::plan::{CompiledPlan, Step};
use crate::registry::ConverterRegistry;

/// State of one top-level conversion call: the call's custom converters and
/// the nested plans built so far. Never shared between calls.
pub(crate) struct Session<'a> {
    pub(crate) engine: &'a Engine,
    pub(crate) options: &'a Options,
    pub(crate) registry: &'a ConverterRegistry,
    pub(crate) nested: RefCell<HashMap<(Type, Type), Option<Arc<CompiledPlan>>>>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        engine: &'a Engine,
        options: &'a Options,
        registry: &'a ConverterRegistry,
    ) -> Self {
        Self {
            engine,
            options,
            registry,
            nested: RefCell::new(HashMap::new()),
        }
    }

    /// Apply every step of `plan`, reading `src` and writing `dst`.
    ///
    /// The first failing step aborts the run; earlier writes are kept.
    pub(crate) fn run(
        &self,
        plan: &CompiledPlan,
        dst: &mut Value,
        src: &Value,
    ) -> Result<(), ConvertError> {
        let Some((src, src_ty)) = deref_source(src, plan.src) else {
            *dst = plan.dst.zero_value();
            return Ok(());
        };
        let (dst, dst_ty) = alloc_dest(dst, plan.dst);

        for step in &plan.steps {
            check_settable(dst_ty, step)?;
            let slot = dst.field_at_mut(dst_ty, &step.dst_path)?;

            // A nil embedded pointer on the source side reads as zero.
            let zero;
            let value = match src.field_at(src_ty, &step.src_path) {
                Some(value) => value,
                None => {
                    zero = step.src_ty.zero_value();
                    &zero
                }
            };

            let leaf = self.resolve(step.src_ty, step.dst_ty)?;
            leaf.apply(self, slot, value)
                .map_err(|e| e.with_context(&step.key))?;
        }
        Ok(())
    }
}

fn check_settable(ty: Type, step: &Step) -> Result<(), ConvertError> {
    let mut ty = ty;
    for &idx in &step.dst_path {
        let Some(field) = ty.record_fields().and_then(|fields| fields.get(idx)) else {
            break;
        };
        if field.read_only {
            return Err(ConvertError::NotSettable {
                path: step.dst_path.clone(),
                field: field.name.to_string(),
            });
        }
        ty = field.ty.strip_pointer();
    }
    Ok(())
}

/// Follow the pointer chain of a source value of type `ty`.
///
/// `None` when a pointer on the way is nil.
pub(crate) fn deref_source(value: &Value, ty: Type) -> Option<(&Value, Type)> {
    let mut value = value;
    let mut ty = ty;
    while let Some(elem) = ty.pointee() {
        match value {
            Value::Ptr(inner) => {
                value = inner;
                ty = elem;
            }
            _ => return None,
        }
    }
    Some((value, ty))
}

/// Follow the pointer chain of a destination slot of type `ty`, allocating
/// zero pointees for nil levels.
pub(crate) fn alloc_dest(slot: &mut Value, ty: Type) -> (&mut Value, Type) {
    let mut slot = slot;
    let mut ty = ty;
    while let Some(elem) = ty.pointee() {
        slot = slot.ensure_ptr(|| elem.zero_value());
        ty = elem;
    }
    (slot, ty)
}
