use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::error::ValueError;
use crate::types::{FloatWidth, IntWidth, Kind, Type, TypeDesc};
use crate::value::Value;

/// Bridge between a concrete Rust type and the descriptor/value model.
///
/// Implemented for primitives and std collections here; records and
/// newtypes get it from `#[derive(Record)]`.
///
/// `from_value(t.to_value())` must reproduce `t`.
pub trait Reflect: Sized + 'static {
    /// Build the descriptor. Called once per type; use `Type::of` to refer to
    /// other types instead of calling their `describe` directly.
    fn describe() -> TypeDesc;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ValueError>;
}

fn mismatch<T>(expected: &str, got: &Value) -> Result<T, ValueError> {
    Err(ValueError::shape(format!(
        "expected {expected}, got {}",
        got.label()
    )))
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

impl Reflect for bool {
    fn describe() -> TypeDesc {
        TypeDesc::new(Kind::Bool)
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => mismatch("bool", &other),
        }
    }
}

impl Reflect for String {
    fn describe() -> TypeDesc {
        TypeDesc::new(Kind::String)
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::String(s) => Ok(s),
            other => mismatch("string", &other),
        }
    }
}

macro_rules! reflect_signed {
    ($($ty:ty => $width:ident),* $(,)?) => {$(
        impl Reflect for $ty {
            fn describe() -> TypeDesc {
                TypeDesc::new(Kind::Int(IntWidth::$width))
            }

            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::Int(i) => Ok(<$ty>::try_from(i)?),
                    other => mismatch(stringify!($ty), &other),
                }
            }
        }
    )*};
}

macro_rules! reflect_unsigned {
    ($($ty:ty => $width:ident),* $(,)?) => {$(
        impl Reflect for $ty {
            fn describe() -> TypeDesc {
                TypeDesc::new(Kind::Uint(IntWidth::$width))
            }

            fn to_value(&self) -> Value {
                Value::Uint(*self as u64)
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::Uint(u) => Ok(<$ty>::try_from(u)?),
                    other => mismatch(stringify!($ty), &other),
                }
            }
        }
    )*};
}

reflect_signed!(i8 => W8, i16 => W16, i32 => W32, i64 => W64, isize => W64);
reflect_unsigned!(u8 => W8, u16 => W16, u32 => W32, u64 => W64, usize => W64);

impl Reflect for f32 {
    fn describe() -> TypeDesc {
        TypeDesc::new(Kind::Float(FloatWidth::F32))
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(f) => Ok(f as f32),
            other => mismatch("f32", &other),
        }
    }
}

impl Reflect for f64 {
    fn describe() -> TypeDesc {
        TypeDesc::new(Kind::Float(FloatWidth::F64))
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(f) => Ok(f),
            other => mismatch("f64", &other),
        }
    }
}

// ---------------------------------------------------------------------------
// Pointer and collections
// ---------------------------------------------------------------------------

impl<T: Reflect> Reflect for Option<T> {
    fn describe() -> TypeDesc {
        TypeDesc::new(Kind::Pointer(Type::of::<T>()))
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => Value::Ptr(Box::new(inner.to_value())),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            Value::Ptr(inner) => Ok(Some(T::from_value(*inner)?)),
            other => mismatch("pointer", &other),
        }
    }
}

/// An empty `Vec` reflects as a nil sequence, so it is the zero value of its
/// type; a nil sequence reads back as an empty one.
impl<T: Reflect> Reflect for Vec<T> {
    fn describe() -> TypeDesc {
        TypeDesc::new(Kind::Seq(Type::of::<T>()))
    }

    fn to_value(&self) -> Value {
        if self.is_empty() {
            return Value::Null;
        }
        Value::Seq(self.iter().map(Reflect::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Seq(items) => items.into_iter().map(T::from_value).collect(),
            other => mismatch("sequence", &other),
        }
    }
}

/// Empty maps reflect as nil, like empty sequences.
fn map_value<'a, K, V>(entries: impl ExactSizeIterator<Item = (&'a K, &'a V)>) -> Value
where
    K: Reflect + 'a,
    V: Reflect + 'a,
{
    if entries.len() == 0 {
        return Value::Null;
    }
    Value::Map(entries.map(|(k, v)| (k.to_value(), v.to_value())).collect())
}

fn map_entries<K, V>(value: Value) -> Result<Vec<(K, V)>, ValueError>
where
    K: Reflect,
    V: Reflect,
{
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Map(entries) => entries
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect(),
        other => mismatch("map", &other),
    }
}

impl<K, V> Reflect for HashMap<K, V>
where
    K: Reflect + Eq + Hash,
    V: Reflect,
{
    fn describe() -> TypeDesc {
        TypeDesc::new(Kind::Map(Type::of::<K>(), Type::of::<V>()))
    }

    fn to_value(&self) -> Value {
        map_value(self.iter())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(map_entries(value)?.into_iter().collect())
    }
}

impl<K, V> Reflect for BTreeMap<K, V>
where
    K: Reflect + Ord,
    V: Reflect,
{
    fn describe() -> TypeDesc {
        TypeDesc::new(Kind::Map(Type::of::<K>(), Type::of::<V>()))
    }

    fn to_value(&self) -> Value {
        map_value(self.iter())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(map_entries(value)?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_integer_is_rejected() {
        assert!(i8::from_value(Value::Int(1000)).is_err());
        assert_eq!(i8::from_value(Value::Int(-5)).unwrap(), -5);
    }

    #[test]
    fn nil_collections_read_back_empty() {
        assert!(Vec::<i32>::from_value(Value::Null).unwrap().is_empty());
        assert!(HashMap::<String, i32>::from_value(Value::Null).unwrap().is_empty());
        assert_eq!(Option::<i32>::from_value(Value::Null).unwrap(), None);
    }

    #[test]
    fn empty_collections_are_zero() {
        assert_eq!(Vec::<i32>::new().to_value(), Value::Null);
        assert_eq!(HashMap::<i32, i32>::new().to_value(), Value::Null);
        assert_eq!(BTreeMap::<String, u8>::new().to_value(), Value::Null);
        assert!(Type::of::<Vec<i32>>().zero_value().is_zero());

        let filled = BTreeMap::from([(1u8, true)]).to_value();
        assert_eq!(filled, Value::Map(vec![(Value::Uint(1), Value::Bool(true))]));
    }

    #[test]
    fn full_width_integers_round_trip() {
        assert_eq!(i64::from_value(Value::Int(i64::MIN)).unwrap(), i64::MIN);
        assert_eq!(u64::from_value(Value::Uint(u64::MAX)).unwrap(), u64::MAX);
        assert_eq!(isize::from_value(Value::Int(-7)).unwrap(), -7);
        assert_eq!(usize::from_value(Value::Uint(7)).unwrap(), 7);
    }

    #[test]
    fn option_wraps_in_pointer() {
        let v = Some(3u8).to_value();
        assert_eq!(v, Value::Ptr(Box::new(Value::Uint(3))));
        assert_eq!(Option::<u8>::from_value(v).unwrap(), Some(3));
    }
}
