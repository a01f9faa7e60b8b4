use std::collections::HashMap;
use std::fmt;

use typeconv_api::{BoxError, Kind, Reflect, Type, Value};

use crate::error::ConvertError;

type Adapter = dyn Fn(&mut Value, &Value) -> Result<(), ConvertError> + Send + Sync;

/// A user-supplied conversion for one `(S, D)` pair, usable at any depth
/// of a conversion.
///
/// ```ignore
/// let parse = CustomConverter::new(|dst: &mut Count, src: &Label| {
///     *dst = Count(src.0.parse()?);
///     Ok(())
/// });
/// ```
pub struct CustomConverter {
    src: Type,
    dst: Type,
    apply: Box<Adapter>,
}

impl CustomConverter {
    pub fn new<S, D, F>(f: F) -> Self
    where
        S: Reflect,
        D: Reflect,
        F: Fn(&mut D, &S) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let apply = move |dst: &mut Value, src: &Value| -> Result<(), ConvertError> {
            let src_val = S::from_value(src.clone())?;
            let mut dst_val = D::from_value(dst.clone())?;
            let result = f(&mut dst_val, &src_val);
            // Written back even on failure, like any other partial write.
            *dst = dst_val.to_value();
            result.map_err(ConvertError::Leaf)
        };
        Self {
            src: Type::of::<S>(),
            dst: Type::of::<D>(),
            apply: Box::new(apply),
        }
    }

    /// Run the user function on unwrapped values. `dst` must hold a value of
    /// the destination type (possibly its zero value).
    pub(crate) fn apply(&self, dst: &mut Value, src: &Value) -> Result<(), ConvertError> {
        (self.apply)(dst, src)
    }
}

impl fmt::Debug for CustomConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomConverter")
            .field("src", &self.src)
            .field("dst", &self.dst)
            .finish()
    }
}

/// Custom converters of one top-level call, keyed by `(src, dst)`.
#[derive(Debug, Default)]
pub struct ConverterRegistry {
    converters: HashMap<(Type, Type), CustomConverter>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and index the supplied converters.
    ///
    /// Both sides must be plain (non-pointer) types, and each pair may be
    /// claimed once.
    pub fn build(converters: Vec<CustomConverter>) -> Result<Self, ConvertError> {
        let mut registry = Self::new();
        for conv in converters {
            for side in [conv.src, conv.dst] {
                if matches!(side.kind(), Kind::Pointer(_)) {
                    return Err(ConvertError::ConverterShape(format!(
                        "converter {} -> {} must take single-level references, got {side}",
                        conv.src, conv.dst
                    )));
                }
            }
            let key = (conv.src, conv.dst);
            if registry.converters.contains_key(&key) {
                return Err(ConvertError::DuplicateConverter {
                    src: conv.src.name().to_string(),
                    dst: conv.dst.name().to_string(),
                });
            }
            registry.converters.insert(key, conv);
        }
        Ok(registry)
    }

    pub fn get(&self, src: Type, dst: Type) -> Option<&CustomConverter> {
        self.converters.get(&(src, dst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn to_len() -> CustomConverter {
        CustomConverter::new(|dst: &mut u64, src: &String| {
            *dst = src.len() as u64;
            Ok(())
        })
    }

    #[test]
    fn duplicate_pair_is_rejected() {
        let err = ConverterRegistry::build(vec![to_len(), to_len()]).unwrap_err();
        assert!(matches!(err, ConvertError::DuplicateConverter { .. }));
        assert_eq!(err.kind(), ErrorCategory::ConverterShape);
    }

    #[test]
    fn pointer_sides_are_rejected() {
        let conv = CustomConverter::new(|dst: &mut Option<u64>, src: &String| {
            *dst = Some(src.len() as u64);
            Ok(())
        });
        let err = ConverterRegistry::build(vec![conv]).unwrap_err();
        assert!(matches!(err, ConvertError::ConverterShape(_)));
    }

    #[test]
    fn adapter_round_trips_values() {
        let registry = ConverterRegistry::build(vec![to_len()]).unwrap();
        let conv = registry.get(Type::of::<String>(), Type::of::<u64>()).unwrap();
        let mut dst = Value::Uint(0);
        conv.apply(&mut dst, &Value::String("four".into())).unwrap();
        assert_eq!(dst, Value::Uint(4));
        assert!(registry.get(Type::of::<u64>(), Type::of::<String>()).is_none());
    }

    #[test]
    fn user_error_is_returned_verbatim() {
        let conv = CustomConverter::new(|_: &mut u64, src: &String| {
            Err(format!("cannot parse {src:?}").into())
        });
        let mut dst = Value::Uint(0);
        let err = conv.apply(&mut dst, &Value::String("x".into())).unwrap_err();
        assert_eq!(err.to_string(), "cannot parse \"x\"");
        assert_eq!(err.kind(), ErrorCategory::LeafConversion);
    }
}
