use std::sync::Arc;

use typeconv_api::value::{convert_scalar, scalar_convertible};
use typeconv_api::{IntWidth, Kind, Type, Value, ValueError};

use crate::error::ConvertError;
use crate::exec::{alloc_dest, deref_source, Session};
use crate::plan::CompiledPlan;
use crate::registry::{ConverterRegistry, CustomConverter};

/// How one field pair is converted.
pub(crate) enum Strategy<'a> {
    /// Same type on both sides.
    Assign,
    Custom(&'a CustomConverter),
    /// Records (or pointers to records) with overlapping fields.
    Record(Arc<CompiledPlan>),
    Seq(Box<Leaf<'a>>),
    /// String-keyed maps; keys are re-typed with the scalar conversion.
    Map(Box<Leaf<'a>>),
    /// Distinct but convertible scalar types.
    Primitive,
    /// Encode with the engine's wire codec, decode into the destination.
    Wire,
}

/// A resolved converter for values of type `src` into slots of type `dst`.
pub(crate) struct Leaf<'a> {
    pub src: Type,
    pub dst: Type,
    pub strategy: Strategy<'a>,
}

impl<'a> Session<'a> {
    /// Pick the conversion for a field pair. First match wins:
    /// identity, custom converter, nested record, sequence, string-keyed map,
    /// primitive conversion (unless strict), wire fallback.
    pub(crate) fn resolve(&self, src: Type, dst: Type) -> Result<Leaf<'a>, ConvertError> {
        let leaf = |strategy: Strategy<'a>| Leaf { src, dst, strategy };
        let registry: &'a ConverterRegistry = self.registry;

        if src == dst {
            return Ok(leaf(Strategy::Assign));
        }

        if let Some(converter) = registry.get(src, dst) {
            return Ok(leaf(Strategy::Custom(converter)));
        }

        if src.is_record_like() && dst.is_record_like() {
            return Ok(match self.nested_plan(src.strip_pointer(), dst.strip_pointer()) {
                Some(plan) => leaf(Strategy::Record(plan)),
                None => {
                    tracing::trace!(%src, %dst, "no overlapping fields, using wire fallback");
                    leaf(Strategy::Wire)
                }
            });
        }

        match (src.kind(), dst.kind()) {
            (Kind::Seq(src_elem), Kind::Seq(dst_elem)) => {
                let elem = self.resolve(*src_elem, *dst_elem)?;
                return Ok(leaf(Strategy::Seq(Box::new(elem))));
            }
            (Kind::Map(src_key, src_val), Kind::Map(dst_key, dst_val))
                if matches!(src_key.kind(), Kind::String) && matches!(dst_key.kind(), Kind::String) =>
            {
                let value = self.resolve(*src_val, *dst_val)?;
                return Ok(leaf(Strategy::Map(Box::new(value))));
            }
            _ => {}
        }

        if !self.options.strict_types && convertible(src, dst) {
            return Ok(leaf(Strategy::Primitive));
        }

        tracing::trace!(%src, %dst, codec = self.engine.codec().name(), "using wire fallback");
        Ok(leaf(Strategy::Wire))
    }

    /// Nested plan over two record types, built at most once per call.
    /// `None` when the records share no fields.
    fn nested_plan(&self, src: Type, dst: Type) -> Option<Arc<CompiledPlan>> {
        if let Some(hit) = self.nested.borrow().get(&(src, dst)) {
            return hit.clone();
        }
        let plan = self.engine.join(src, dst, self.options).map(Arc::new);
        self.nested.borrow_mut().insert((src, dst), plan.clone());
        plan
    }
}

/// Scalars of convertible kinds, strings and byte sequences in either
/// direction, or pointers to scalars of the same kind.
fn convertible(src: Type, dst: Type) -> bool {
    let (s, d) = (src.kind(), dst.kind());
    if s.is_scalar() && d.is_scalar() {
        return scalar_convertible(s, d);
    }
    match (s, d) {
        (Kind::String, Kind::Seq(elem)) | (Kind::Seq(elem), Kind::String) => is_byte(*elem),
        (Kind::Pointer(s), Kind::Pointer(d)) => same_scalar(s.kind(), d.kind()),
        _ => false,
    }
}

fn is_byte(ty: Type) -> bool {
    matches!(ty.kind(), Kind::Uint(IntWidth::W8))
}

fn convert_primitive(value: &Value, to: Type) -> Result<Value, ValueError> {
    match (value, to.kind()) {
        (Value::String(s), Kind::Seq(_)) if s.is_empty() => Ok(Value::Null),
        (Value::String(s), Kind::Seq(_)) => Ok(Value::Seq(
            s.bytes().map(|b| Value::Uint(u64::from(b))).collect(),
        )),
        (Value::Null, Kind::String) => Ok(Value::String(String::new())),
        (Value::Seq(items), Kind::String) => {
            let bytes = items
                .iter()
                .map(|item| match item {
                    Value::Uint(b) => u8::try_from(*b).map_err(ValueError::from),
                    other => Err(ValueError::shape(format!("expected byte, got {}", other.label()))),
                })
                .collect::<Result<Vec<u8>, _>>()?;
            String::from_utf8(bytes)
                .map(Value::String)
                .map_err(|e| ValueError::shape(format!("{to}: {e}")))
        }
        (value, kind) => convert_scalar(value, kind),
    }
}

fn same_scalar(a: &Kind, b: &Kind) -> bool {
    match (a, b) {
        (Kind::Bool, Kind::Bool) | (Kind::String, Kind::String) => true,
        (Kind::Int(x), Kind::Int(y)) | (Kind::Uint(x), Kind::Uint(y)) => x == y,
        (Kind::Float(x), Kind::Float(y)) => x == y,
        _ => false,
    }
}

impl Leaf<'_> {
    pub(crate) fn apply(
        &self,
        session: &Session<'_>,
        dst: &mut Value,
        src: &Value,
    ) -> Result<(), ConvertError> {
        match &self.strategy {
            Strategy::Assign => self.through_pointers(dst, src, |slot, value, _, _| {
                *slot = value.clone();
                Ok(())
            }),
            Strategy::Primitive => self.through_pointers(dst, src, |slot, value, _, dst_base| {
                *slot = convert_primitive(value, dst_base)?;
                Ok(())
            }),
            Strategy::Custom(converter) => {
                self.through_pointers(dst, src, |slot, value, _, _| converter.apply(slot, value))
            }
            Strategy::Record(plan) => {
                self.through_pointers(dst, src, |slot, value, _, _| session.run(plan, slot, value))
            }
            Strategy::Wire => self.through_pointers(dst, src, |slot, value, src_base, dst_base| {
                if value.is_zero() {
                    *slot = dst_base.zero_value();
                    return Ok(());
                }
                let codec = session.engine.codec();
                let bytes = codec.encode(value, src_base).map_err(ConvertError::Wire)?;
                codec.decode(&bytes, dst_base, slot).map_err(ConvertError::Wire)
            }),
            Strategy::Seq(elem) => self.apply_seq(elem, session, dst, src),
            Strategy::Map(value) => self.apply_map(value, session, dst, src),
        }
    }

    /// Unwrap the source pointer chain (nil zeroes the destination) and
    /// allocate the destination one, then run `f` on the base values.
    fn through_pointers<F>(&self, dst: &mut Value, src: &Value, f: F) -> Result<(), ConvertError>
    where
        F: FnOnce(&mut Value, &Value, Type, Type) -> Result<(), ConvertError>,
    {
        let Some((value, src_base)) = deref_source(src, self.src) else {
            *dst = self.dst.zero_value();
            return Ok(());
        };
        let (slot, dst_base) = alloc_dest(dst, self.dst);
        f(slot, value, src_base, dst_base)
    }

    fn apply_seq(
        &self,
        elem: &Leaf<'_>,
        session: &Session<'_>,
        dst: &mut Value,
        src: &Value,
    ) -> Result<(), ConvertError> {
        let items = match src {
            Value::Null => {
                *dst = Value::Null;
                return Ok(());
            }
            Value::Seq(items) => items,
            other => return Err(shape_error(self.src, other)),
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let mut slot = elem.dst.zero_value();
            elem.apply(session, &mut slot, item)
                .map_err(|e| e.with_context(format!("[{i}]")))?;
            out.push(slot);
        }
        *dst = Value::Seq(out);
        Ok(())
    }

    fn apply_map(
        &self,
        value: &Leaf<'_>,
        session: &Session<'_>,
        dst: &mut Value,
        src: &Value,
    ) -> Result<(), ConvertError> {
        let entries = match src {
            Value::Null => {
                *dst = Value::Null;
                return Ok(());
            }
            Value::Map(entries) => entries,
            other => return Err(shape_error(self.src, other)),
        };
        let dst_key = match self.dst.kind() {
            Kind::Map(key, _) => *key,
            _ => return Err(shape_error(self.dst, dst)),
        };
        let mut out = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            let mut slot = value.dst.zero_value();
            value
                .apply(session, &mut slot, v)
                .map_err(|e| e.with_context(format!("[{}]", key_label(k))))?;
            out.push((convert_scalar(k, dst_key.kind())?, slot));
        }
        *dst = Value::Map(out);
        Ok(())
    }
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => format!("{other:?}"),
    }
}

fn shape_error(ty: Type, value: &Value) -> ConvertError {
    ConvertError::Value(ValueError::shape(format!(
        "{ty}: expected {} value, got {}",
        ty.kind().label(),
        value.label()
    )))
}
