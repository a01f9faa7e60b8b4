use typeconv_api::Type;

/// A record field as it appears in a JSON object.
#[derive(Debug, Clone)]
pub(crate) struct JsonField {
    pub name: String,
    /// Field indexes from the outer record; more than one for promoted fields.
    pub path: Vec<usize>,
    pub ty: Type,
    pub omitempty: bool,
    pub read_only: bool,
}

/// Object members of record type `ty`, in declaration order.
///
/// Untagged embedded records are flattened into the parent. When two fields
/// claim the same name the shallower one wins, then the earlier one.
pub(crate) fn json_fields(ty: Type) -> Vec<JsonField> {
    let mut all = Vec::new();
    walk(ty, &[], &mut all);

    let mut kept: Vec<JsonField> = Vec::with_capacity(all.len());
    for field in all {
        match kept.iter().position(|k| k.name == field.name) {
            Some(i) if kept[i].path.len() > field.path.len() => kept[i] = field,
            Some(_) => {}
            None => kept.push(field),
        }
    }
    kept
}

fn walk(ty: Type, prefix: &[usize], out: &mut Vec<JsonField>) {
    let Some(fields) = ty.strip_pointer().record_fields() else {
        return;
    };
    for (idx, field) in fields.iter().enumerate() {
        if !field.visible {
            continue;
        }
        let tag = field.tag("json").unwrap_or("");
        if tag == "-" {
            continue;
        }
        let mut parts = tag.split(',');
        let name = parts.next().unwrap_or("");
        let omitempty = parts.any(|opt| opt == "omitempty");

        let mut path = prefix.to_vec();
        path.push(idx);

        if name.is_empty() && field.embedded && field.ty.is_record_like() {
            walk(field.ty, &path, out);
            continue;
        }

        out.push(JsonField {
            name: (if name.is_empty() { field.name } else { name }).to_string(),
            path,
            ty: field.ty,
            omitempty,
            read_only: field.read_only,
        });
    }
}

#[cfg(test)]
mod tests {
    use typeconv_api::Record;

    use super::*;

    #[derive(Record)]
    pub struct Base {
        pub id: i64,
        pub kind: String,
    }

    #[derive(Record)]
    pub struct Item {
        #[conv(embed)]
        pub base: Base,
        #[tag(json = "kind")]
        pub label: String,
        #[tag(json = "-")]
        pub secret: String,
        #[tag(json = ",omitempty")]
        pub note: String,
        #[allow(dead_code)]
        hidden: bool,
    }

    #[test]
    fn shallow_field_shadows_promoted_one() {
        let fields = json_fields(Type::of::<Item>());
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "kind", "note"]);

        let kind = &fields[1];
        assert_eq!(kind.path, [1]);
        assert!(fields[2].omitempty);
    }
}
