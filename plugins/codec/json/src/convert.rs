use serde_json::{Map, Number, Value as Json};
use typeconv_api::{FloatWidth, IntWidth, Kind, Type, Value, ValueError};

use crate::fields::json_fields;

// ═══════════════════════════════════════════════════════════════
//  Value → JSON
// ═══════════════════════════════════════════════════════════════

pub(crate) fn value_to_json(value: &Value, ty: Type) -> Result<Json, ValueError> {
    if let Some(hook) = ty.json_hooks().and_then(|h| h.to_json) {
        return hook(value).map_err(|e| ValueError::encode(format!("{ty}: {e}")));
    }

    match (ty.kind(), value) {
        (Kind::Bool, Value::Bool(b)) => Ok(Json::Bool(*b)),
        (Kind::Int(_), Value::Int(i)) => Ok(Json::from(*i)),
        (Kind::Uint(_), Value::Uint(u)) => Ok(Json::from(*u)),
        (Kind::Float(_), Value::Float(f)) => float_to_json(*f),
        (Kind::String, Value::String(s)) => Ok(Json::String(s.clone())),

        (Kind::Pointer(_) | Kind::Seq(_) | Kind::Map(..), Value::Null) => Ok(Json::Null),
        (Kind::Pointer(elem), Value::Ptr(inner)) => value_to_json(inner, *elem),
        (Kind::Seq(elem), Value::Seq(items)) => items
            .iter()
            .map(|item| value_to_json(item, *elem))
            .collect::<Result<Vec<_>, _>>()
            .map(Json::Array),
        (Kind::Map(key_ty, val_ty), Value::Map(entries)) => {
            let mut obj = Map::new();
            for (k, v) in entries {
                obj.insert(map_key_to_string(k, *key_ty)?, value_to_json(v, *val_ty)?);
            }
            Ok(Json::Object(obj))
        }
        (Kind::Record(_), Value::Record(_)) => record_to_json(value, ty),

        (kind, value) => Err(ValueError::encode(format!(
            "{ty}: expected {} value, got {}",
            kind.label(),
            value.label()
        ))),
    }
}

fn record_to_json(value: &Value, ty: Type) -> Result<Json, ValueError> {
    let mut obj = Map::new();
    for field in json_fields(ty) {
        // Promoted through a nil embedded pointer.
        let Some(member) = value.field_at(ty, &field.path) else {
            continue;
        };
        if field.omitempty && is_empty(member) {
            continue;
        }
        let json = value_to_json(member, field.ty).map_err(|e| e.with_context(&field.name))?;
        obj.insert(field.name, json);
    }
    Ok(Json::Object(obj))
}

/// Integral floats are written without a fraction, so they read back into
/// integer targets.
fn float_to_json(f: f64) -> Result<Json, ValueError> {
    const EXACT: f64 = 9_007_199_254_740_992.0;
    if f.fract() == 0.0 && f.abs() < EXACT {
        return Ok(Json::from(f as i64));
    }
    Number::from_f64(f)
        .map(Json::Number)
        .ok_or_else(|| ValueError::encode(format!("unsupported float value: {f}")))
}

fn map_key_to_string(key: &Value, ty: Type) -> Result<String, ValueError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Uint(u) => Ok(u.to_string()),
        other => Err(ValueError::encode(format!(
            "unsupported map key type {ty} ({})",
            other.label()
        ))),
    }
}

/// Values dropped by `omitempty`. Records are never empty.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Seq(items) => items.is_empty(),
        Value::Map(entries) => entries.is_empty(),
        Value::Record(_) | Value::Ptr(_) => false,
        scalar => scalar.is_zero(),
    }
}

// ═══════════════════════════════════════════════════════════════
//  JSON → Value (merging)
// ═══════════════════════════════════════════════════════════════

pub(crate) fn json_into_value(json: Json, ty: Type, slot: &mut Value) -> Result<(), ValueError> {
    if json.is_null() {
        if matches!(ty.kind(), Kind::Pointer(_) | Kind::Seq(_) | Kind::Map(..)) {
            *slot = Value::Null;
        }
        return Ok(());
    }

    if let Some(hook) = ty.json_hooks().and_then(|h| h.from_json) {
        *slot = hook(json).map_err(|e| ValueError::decode(format!("{ty}: {e}")))?;
        return Ok(());
    }

    match (ty.kind(), json) {
        (Kind::Pointer(elem), json) => {
            let inner = slot.ensure_ptr(|| elem.zero_value());
            json_into_value(json, *elem, inner)
        }
        (Kind::Bool, Json::Bool(b)) => {
            *slot = Value::Bool(b);
            Ok(())
        }
        (Kind::Int(width), Json::Number(n)) => {
            *slot = Value::Int(number_to_int(&n, *width, ty)?);
            Ok(())
        }
        (Kind::Uint(width), Json::Number(n)) => {
            *slot = Value::Uint(number_to_uint(&n, *width, ty)?);
            Ok(())
        }
        (Kind::Float(width), Json::Number(n)) => {
            *slot = Value::Float(number_to_float(&n, *width, ty)?);
            Ok(())
        }
        (Kind::String, Json::String(s)) => {
            *slot = Value::String(s);
            Ok(())
        }
        (Kind::Seq(elem), Json::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                let mut v = elem.zero_value();
                json_into_value(item, *elem, &mut v).map_err(|e| e.with_context(format!("[{i}]")))?;
                out.push(v);
            }
            *slot = Value::Seq(out);
            Ok(())
        }
        (Kind::Map(key_ty, val_ty), Json::Object(obj)) => {
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(Vec::new());
            }
            if let Value::Map(entries) = slot {
                for (k, v) in obj {
                    let key = string_to_map_key(&k, *key_ty)?;
                    let mut elem = val_ty.zero_value();
                    json_into_value(v, *val_ty, &mut elem).map_err(|e| e.with_context(&k))?;
                    match entries.iter_mut().find(|(existing, _)| *existing == key) {
                        Some(entry) => entry.1 = elem,
                        None => entries.push((key, elem)),
                    }
                }
            }
            Ok(())
        }
        (Kind::Record(fields), Json::Object(obj)) => {
            if slot.as_record().map(<[Value]>::len) != Some(fields.len()) {
                *slot = ty.zero_value();
            }
            let members = json_fields(ty);
            for (key, item) in obj {
                let found = members
                    .iter()
                    .find(|f| f.name == key)
                    .or_else(|| members.iter().find(|f| f.name.eq_ignore_ascii_case(&key)));
                // Unknown keys are ignored.
                let Some(field) = found else { continue };
                if field.read_only {
                    continue;
                }
                let target = slot.field_at_mut(ty, &field.path)?;
                json_into_value(item, field.ty, target).map_err(|e| e.with_context(&field.name))?;
            }
            Ok(())
        }
        (kind, json) => Err(ValueError::decode(format!(
            "cannot unmarshal {} into {ty} ({})",
            json_label(&json),
            kind.label()
        ))),
    }
}

fn number_to_int(n: &Number, width: IntWidth, ty: Type) -> Result<i64, ValueError> {
    let out_of_range = || ValueError::decode(format!("number {n} overflows {ty}"));
    if let Some(i) = n.as_i64() {
        let bits = width.bits();
        if bits < 64 && !(-(1i64 << (bits - 1))..(1i64 << (bits - 1))).contains(&i) {
            return Err(out_of_range());
        }
        return Ok(i);
    }
    if n.is_u64() {
        return Err(out_of_range());
    }
    Err(ValueError::decode(format!("cannot unmarshal number {n} into {ty}")))
}

fn number_to_uint(n: &Number, width: IntWidth, ty: Type) -> Result<u64, ValueError> {
    if let Some(u) = n.as_u64() {
        let bits = width.bits();
        if bits < 64 && u >= (1u64 << bits) {
            return Err(ValueError::decode(format!("number {n} overflows {ty}")));
        }
        return Ok(u);
    }
    Err(ValueError::decode(format!("cannot unmarshal number {n} into {ty}")))
}

fn number_to_float(n: &Number, width: FloatWidth, ty: Type) -> Result<f64, ValueError> {
    let f = n
        .as_f64()
        .ok_or_else(|| ValueError::decode(format!("cannot unmarshal number {n} into {ty}")))?;
    match width {
        FloatWidth::F32 if f.abs() > f64::from(f32::MAX) => {
            Err(ValueError::decode(format!("number {n} overflows {ty}")))
        }
        FloatWidth::F32 => Ok(f64::from(f as f32)),
        FloatWidth::F64 => Ok(f),
    }
}

fn string_to_map_key(key: &str, ty: Type) -> Result<Value, ValueError> {
    let invalid = || ValueError::decode(format!("invalid map key {key:?} for {ty}"));
    match ty.kind() {
        Kind::String => Ok(Value::String(key.to_string())),
        Kind::Int(width) => {
            let n = key.parse::<i64>().map_err(|_| invalid())?;
            number_to_int(&Number::from(n), *width, ty).map(Value::Int)
        }
        Kind::Uint(width) => {
            let n = key.parse::<u64>().map_err(|_| invalid())?;
            number_to_uint(&Number::from(n), *width, ty).map(Value::Uint)
        }
        _ => Err(invalid()),
    }
}

fn json_label(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
