use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{LazyLock, PoisonError, RwLock};

use crate::codec::JsonHooks;
use crate::reflect::Reflect;
use crate::value::Value;

/// Bit width of an integer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }
}

/// Bit width of a floating point kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

/// Structural shape of a type.
///
/// Composite kinds refer to their element types through `Type` handles, so a
/// record may contain (through a pointer) a field of its own type.
#[derive(Debug, Clone)]
pub enum Kind {
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float(FloatWidth),
    String,
    /// Nullable indirection (`Option<T>`).
    Pointer(Type),
    /// Ordered collection (`Vec<T>`).
    Seq(Type),
    /// Key/value mapping (`HashMap<K, V>`, `BTreeMap<K, V>`).
    Map(Type, Type),
    /// Fixed set of named fields. Field position is the index into `Value::Record`.
    Record(Vec<FieldDesc>),
}

impl Kind {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Kind::Bool | Kind::Int(_) | Kind::Uint(_) | Kind::Float(_) | Kind::String
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Kind::Int(_) | Kind::Uint(_) | Kind::Float(_))
    }

    /// Short kind name for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int(_) => "int",
            Kind::Uint(_) => "uint",
            Kind::Float(_) => "float",
            Kind::String => "string",
            Kind::Pointer(_) => "pointer",
            Kind::Seq(_) => "sequence",
            Kind::Map(..) => "map",
            Kind::Record(_) => "record",
        }
    }
}

/// A single field of a record type.
#[derive(Debug, Clone)]
pub struct FieldDesc {
    /// Declared field name.
    pub name: &'static str,
    pub ty: Type,
    /// `(tag key, tag value)` pairs, e.g. `("json", "id,omitempty")`.
    pub tags: &'static [(&'static str, &'static str)],
    /// Anonymous sub-record whose fields are promoted into the parent.
    pub embedded: bool,
    /// Externally accessible. Invisible fields never take part in matching.
    pub visible: bool,
    /// Readable as a source, but not writable as a destination.
    pub read_only: bool,
}

impl FieldDesc {
    pub fn new(name: &'static str, ty: Type) -> Self {
        Self {
            name,
            ty,
            tags: &[],
            embedded: false,
            visible: true,
            read_only: false,
        }
    }

    pub fn with_tags(mut self, tags: &'static [(&'static str, &'static str)]) -> Self {
        self.tags = tags;
        self
    }

    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Raw value of the tag `key`, if the field declares it.
    pub fn tag(&self, key: &str) -> Option<&'static str> {
        self.tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }
}

/// Full description of a type: its shape plus optional wire hooks.
#[derive(Debug, Clone)]
pub struct TypeDesc {
    pub kind: Kind,
    pub json: Option<JsonHooks>,
}

impl TypeDesc {
    pub fn new(kind: Kind) -> Self {
        Self { kind, json: None }
    }

    pub fn record(fields: Vec<FieldDesc>) -> Self {
        Self::new(Kind::Record(fields))
    }

    pub fn with_json(mut self, hooks: JsonHooks) -> Self {
        self.json = Some(hooks);
        self
    }
}

// ---------------------------------------------------------------------------
// Type handle
// ---------------------------------------------------------------------------

/// Identity of a concrete Rust type.
///
/// Cheap to copy and compare; equality is `TypeId` equality. The descriptor
/// is built lazily on first access and interned for the process lifetime.
#[derive(Clone, Copy)]
pub struct Type {
    id: TypeId,
    name: &'static str,
    describe: fn() -> &'static TypeDesc,
}

impl Type {
    pub fn of<T: Reflect>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            describe: intern::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn desc(&self) -> &'static TypeDesc {
        (self.describe)()
    }

    pub fn kind(&self) -> &'static Kind {
        &self.desc().kind
    }

    pub fn json_hooks(&self) -> Option<&'static JsonHooks> {
        self.desc().json.as_ref()
    }

    pub fn record_fields(&self) -> Option<&'static [FieldDesc]> {
        match self.kind() {
            Kind::Record(fields) => Some(fields.as_slice()),
            _ => None,
        }
    }

    pub fn pointee(&self) -> Option<Type> {
        match self.kind() {
            Kind::Pointer(elem) => Some(*elem),
            _ => None,
        }
    }

    /// Remove one level of pointer indirection, if any.
    pub fn strip_pointer(self) -> Type {
        self.pointee().unwrap_or(self)
    }

    /// A record, or a pointer to a record.
    pub fn is_record_like(&self) -> bool {
        matches!(self.strip_pointer().kind(), Kind::Record(_))
    }

    /// Zero value: `false`, `0`, `""`, nil for pointer/sequence/map,
    /// and a record whose fields are all zero.
    pub fn zero_value(&self) -> Value {
        match self.kind() {
            Kind::Bool => Value::Bool(false),
            Kind::Int(_) => Value::Int(0),
            Kind::Uint(_) => Value::Uint(0),
            Kind::Float(_) => Value::Float(0.0),
            Kind::String => Value::String(String::new()),
            Kind::Pointer(_) | Kind::Seq(_) | Kind::Map(..) => Value::Null,
            Kind::Record(fields) => {
                Value::Record(fields.iter().map(|f| f.ty.zero_value()).collect())
            }
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ---------------------------------------------------------------------------
// Descriptor intern table
// ---------------------------------------------------------------------------

type DescriptorTable = RwLock<HashMap<TypeId, &'static TypeDesc>>;

static DESCRIPTORS: LazyLock<DescriptorTable> = LazyLock::new(|| RwLock::new(HashMap::new()));

/// Descriptors are leaked on purpose: they live as long as the type itself.
fn intern<T: Reflect>() -> &'static TypeDesc {
    let id = TypeId::of::<T>();
    {
        let table = DESCRIPTORS.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(desc) = table.get(&id) {
            return *desc;
        }
    }
    // Built outside the lock: `describe()` may touch other descriptors.
    let built: &'static TypeDesc = Box::leak(Box::new(T::describe()));
    let mut table = DESCRIPTORS.write().unwrap_or_else(PoisonError::into_inner);
    *table.entry(id).or_insert(built)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn option_and_inner_are_distinct() {
        assert_ne!(Type::of::<Option<i32>>(), Type::of::<i32>());
        assert_eq!(Type::of::<Option<i32>>().pointee(), Some(Type::of::<i32>()));
    }

    #[test]
    fn descriptors_are_interned() {
        let a = Type::of::<Vec<String>>().desc() as *const TypeDesc;
        let b = Type::of::<Vec<String>>().desc() as *const TypeDesc;
        assert_eq!(a, b);
    }

    #[test]
    fn zero_values_follow_kind() {
        assert_eq!(Type::of::<u16>().zero_value(), Value::Uint(0));
        assert_eq!(Type::of::<String>().zero_value(), Value::String(String::new()));
        assert_eq!(Type::of::<Option<String>>().zero_value(), Value::Null);
        assert_eq!(Type::of::<HashMap<String, i64>>().zero_value(), Value::Null);
    }
}
