use crate::error::ValueError;
use crate::types::{FloatWidth, IntWidth, Kind, Type};

/// Canonical value representation.
///
/// Values carry data only. Types, field names and tags live in the
/// `TypeDesc` the value is paired with, so the same `Value` shape can be read
/// against a source type and written against a destination type.
///
/// Strategy by kind:
/// - Scalars: eager, one variant per family (`Int` holds every signed width)
/// - Pointer: `Null` when nil, `Ptr` otherwise
/// - Sequence, Map: `Null` when nil, recursive otherwise
/// - Record: positional, order matches `Kind::Record` fields
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Nil pointer, sequence or map.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Ptr(Box<Value>),
    Seq(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Record(Vec<Value>),
}

impl Value {
    /// Zero check with the usual semantics: nil, `false`, `0`, `""`, or a
    /// record whose fields are all zero. Non-nil pointers, sequences and maps
    /// are never zero, even when empty.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Uint(u) => *u == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Ptr(_) | Value::Seq(_) | Value::Map(_) => false,
            Value::Record(fields) => fields.iter().all(Value::is_zero),
        }
    }

    /// Short variant name for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Ptr(_) => "pointer",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    /// Make this slot a non-nil pointer, allocating `pointee()` when it is
    /// not one yet, and return the pointee slot.
    pub fn ensure_ptr(&mut self, pointee: impl FnOnce() -> Value) -> &mut Value {
        if !matches!(self, Value::Ptr(_)) {
            *self = Value::Ptr(Box::new(pointee()));
        }
        match self {
            Value::Ptr(inner) => inner.as_mut(),
            _ => unreachable!("slot was just made a pointer"),
        }
    }

    pub fn as_record(&self) -> Option<&[Value]> {
        match self {
            Value::Record(fields) => Some(fields.as_slice()),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Split a record value into exactly `expected` positional fields.
    pub fn into_fields(self, type_name: &str, expected: usize) -> Result<Vec<Value>, ValueError> {
        match self {
            Value::Record(fields) if fields.len() == expected => Ok(fields),
            Value::Record(fields) => Err(ValueError::shape(format!(
                "{type_name}: expected {expected} fields, got {}",
                fields.len()
            ))),
            other => Err(ValueError::shape(format!(
                "{type_name}: expected record, got {}",
                other.label()
            ))),
        }
    }
    /// Read the field at `path` of a record of type `ty`.
    ///
    /// Every index but the last selects an embedded field, which may be a
    /// pointer. Returns `None` when such a pointer is nil or the value does not
    /// have the shape `ty` describes.
    pub fn field_at(&self, ty: Type, path: &[usize]) -> Option<&Value> {
        let mut cur = self;
        let mut ty = ty;
        for (depth, &idx) in path.iter().enumerate() {
            let field = ty.record_fields()?.get(idx)?;
            let next = cur.as_record()?.get(idx)?;
            if depth + 1 == path.len() {
                return Some(next);
            }
            match field.ty.pointee() {
                Some(elem) => match next {
                    Value::Ptr(inner) => {
                        cur = inner;
                        ty = elem;
                    }
                    _ => return None,
                },
                None => {
                    cur = next;
                    ty = field.ty;
                }
            }
        }
        Some(cur)
    }

    /// Mutable counterpart of `field_at`. Nil embedded pointers along the
    /// path are allocated, and a slot that is not yet a record is reset to the
    /// zero value of its record type.
    pub fn field_at_mut(&mut self, ty: Type, path: &[usize]) -> Result<&mut Value, ValueError> {
        let mut cur = self;
        let mut ty = ty;
        for (depth, &idx) in path.iter().enumerate() {
            let fields = ty
                .record_fields()
                .ok_or_else(|| ValueError::shape(format!("{ty} is not a record")))?;
            let field = fields
                .get(idx)
                .ok_or_else(|| ValueError::shape(format!("{ty}: no field at index {idx}")))?;
            if cur.as_record().map(<[Value]>::len) != Some(fields.len()) {
                *cur = ty.zero_value();
            }
            let next = cur
                .as_record_mut()
                .and_then(|values| values.get_mut(idx))
                .ok_or_else(|| ValueError::shape(format!("{ty}: no field at index {idx}")))?;
            if depth + 1 == path.len() {
                return Ok(next);
            }
            match field.ty.pointee() {
                Some(elem) => {
                    cur = next.ensure_ptr(|| elem.zero_value());
                    ty = elem;
                }
                None => {
                    cur = next;
                    ty = field.ty;
                }
            }
        }
        Ok(cur)
    }
}

// ---------------------------------------------------------------------------
// Scalar conversion
// ---------------------------------------------------------------------------

/// Whether a value of kind `from` can be converted to kind `to` by
/// `convert_scalar`: numeric ↔ numeric, string ↔ string, bool ↔ bool.
pub fn scalar_convertible(from: &Kind, to: &Kind) -> bool {
    (from.is_numeric() && to.is_numeric())
        || matches!((from, to), (Kind::String, Kind::String) | (Kind::Bool, Kind::Bool))
}

/// Convert a scalar value to the representation of kind `to`.
///
/// Integers wrap to the target width, floats truncate toward zero when
/// converted to integers, and `F32` targets are rounded to single precision.
pub fn convert_scalar(value: &Value, to: &Kind) -> Result<Value, ValueError> {
    let converted = match (value, to) {
        (Value::Bool(b), Kind::Bool) => Value::Bool(*b),
        (Value::String(s), Kind::String) => Value::String(s.clone()),

        (Value::Int(i), Kind::Int(w)) => Value::Int(wrap_signed(*i, *w)),
        (Value::Int(i), Kind::Uint(w)) => Value::Uint(wrap_unsigned(*i as u64, *w)),
        (Value::Int(i), Kind::Float(w)) => Value::Float(round_float(*i as f64, *w)),

        (Value::Uint(u), Kind::Int(w)) => Value::Int(wrap_signed(*u as i64, *w)),
        (Value::Uint(u), Kind::Uint(w)) => Value::Uint(wrap_unsigned(*u, *w)),
        (Value::Uint(u), Kind::Float(w)) => Value::Float(round_float(*u as f64, *w)),

        (Value::Float(f), Kind::Int(w)) => Value::Int(wrap_signed(*f as i64, *w)),
        (Value::Float(f), Kind::Uint(w)) => Value::Uint(wrap_unsigned(*f as u64, *w)),
        (Value::Float(f), Kind::Float(w)) => Value::Float(round_float(*f, *w)),

        (value, to) => {
            return Err(ValueError::shape(format!(
                "cannot convert {} value to {}",
                value.label(),
                to.label()
            )));
        }
    };
    Ok(converted)
}

fn wrap_signed(v: i64, width: IntWidth) -> i64 {
    match width {
        IntWidth::W8 => v as i8 as i64,
        IntWidth::W16 => v as i16 as i64,
        IntWidth::W32 => v as i32 as i64,
        IntWidth::W64 => v,
    }
}

fn wrap_unsigned(v: u64, width: IntWidth) -> u64 {
    match width {
        IntWidth::W8 => v as u8 as u64,
        IntWidth::W16 => v as u16 as u64,
        IntWidth::W32 => v as u32 as u64,
        IntWidth::W64 => v,
    }
}

fn round_float(v: f64, width: FloatWidth) -> f64 {
    match width {
        FloatWidth::F32 => v as f32 as f64,
        FloatWidth::F64 => v,
    }
}
