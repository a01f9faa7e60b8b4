use indexmap::IndexMap;
use typeconv_api::{FieldDesc, Type};

/// A discovered field: where it lives and what type it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    /// Field indexes from the outer record. Longer than one for fields
    /// promoted from embedded records.
    pub path: Vec<usize>,
    pub ty: Type,
    /// Declared Rust field name.
    pub name: &'static str,
}

/// Normalized (lowercase) field key → entry, in discovery order.
pub type FieldMap = IndexMap<String, FieldEntry>;

/// Collect the matchable fields of a record type for `tag`.
///
/// A pointer to a record is looked through once. Anything that is not a
/// record yields an empty map.
pub fn discover_fields(ty: Type, tag: &str) -> FieldMap {
    let mut out = FieldMap::new();
    walk(ty, tag, &[], &mut out);
    out
}

fn walk(ty: Type, tag: &str, prefix: &[usize], out: &mut FieldMap) {
    let Some(fields) = ty.strip_pointer().record_fields() else {
        return;
    };
    for (idx, field) in fields.iter().enumerate() {
        if !field.visible {
            continue;
        }
        let Some(name) = tag_name(field, tag) else {
            continue;
        };

        let mut path = prefix.to_vec();
        path.push(idx);

        let name = match name {
            Some(name) => name,
            None if field.embedded && field.ty.is_record_like() => {
                walk(field.ty, tag, &path, out);
                continue;
            }
            None => field.name,
        };

        out.entry(name.to_lowercase()).or_insert(FieldEntry {
            path,
            ty: field.ty,
            name: field.name,
        });
    }
}

/// Name declared by the field's tag.
///
/// Outer `None`: excluded with `"-"`. Inner `None`: no usable tag name.
fn tag_name(field: &FieldDesc, tag: &str) -> Option<Option<&'static str>> {
    match field.tag(tag) {
        Some("-") => None,
        Some(value) => {
            let name = value.split(',').next().unwrap_or("");
            Some((!name.is_empty()).then_some(name))
        }
        None => Some(None),
    }
}

#[cfg(test)]
mod tests {
    use typeconv_api::Record;

    use super::*;

    #[derive(Record)]
    pub struct Base {
        #[tag(json = "id")]
        pub id: i64,
        pub created: i64,
    }

    #[derive(Record)]
    pub struct Tagged {
        #[tag(json = "label")]
        pub inner: i64,
    }

    #[derive(Record)]
    #[allow(non_snake_case)]
    pub struct Order {
        #[conv(embed)]
        pub base: Option<Base>,
        #[tag(json = "ID")]
        pub shadowed: String,
        #[tag(json = "-")]
        pub skipped: String,
        #[tag(json = ",omitempty")]
        pub Note: String,
        #[conv(embed)]
        #[tag(json = "meta")]
        pub meta: Tagged,
        #[tag(db = "order_total")]
        pub total: f64,
        private: bool,
    }

    #[test]
    fn discovery_rules() {
        let map = discover_fields(Type::of::<Order>(), "json");
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "created", "note", "meta", "total"]);

        // First occurrence wins: the promoted `id` shadows the later `ID`.
        assert_eq!(map["id"].path, [0, 0]);
        assert_eq!(map["id"].ty, Type::of::<i64>());
        assert_eq!(map["note"].name, "Note");
        // Tagged embedded fields are registered, not flattened.
        assert_eq!(map["meta"].path, [4]);
        assert_eq!(map["meta"].ty, Type::of::<Tagged>());
    }

    #[test]
    fn custom_tag_key() {
        let map = discover_fields(Type::of::<Order>(), "db");
        assert_eq!(map["order_total"].path, [5]);
        // No db tags elsewhere, so Rust names are used.
        assert!(map.contains_key("shadowed"));
        assert!(map.contains_key("skipped"));
        assert!(!map.contains_key("private"));
    }

    #[test]
    fn non_record_has_no_fields() {
        assert!(discover_fields(Type::of::<Vec<i32>>(), "json").is_empty());
        assert!(discover_fields(Type::of::<Option<Base>>(), "json").len() == 2);
    }
}
