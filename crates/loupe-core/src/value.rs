//! Dynamic value tree the engine inspects and edits.
//!
//! Hosts project their object graph into [`Value`] trees; every edit made
//! through an [`crate::Accessor`](crate::accessor::Accessor) writes a whole
//! subtree back, so the host always observes complete values.

/// A dynamically typed value.
///
/// `Null` stands in for absent data of any declared type, including
/// collections (a `Null` collection is distinct from an empty one).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Struct(StructValue),
    Seq(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

/// A structured value: a type name plus a field vector whose slots line up
/// with the `Field { index }` members of the type's descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct StructValue {
    pub type_name: &'static str,
    pub fields: Vec<Value>,
}

impl StructValue {
    pub fn new(type_name: &'static str, fields: Vec<Value>) -> Self {
        Self { type_name, fields }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Struct(_) => "struct",
            Value::Seq(_) => "seq",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Element count of a collection value. `None` for `Null` and for
    /// non-collection values.
    pub fn collection_len(&self) -> Option<usize> {
        match self {
            Value::Seq(items) | Value::Set(items) => Some(items.len()),
            Value::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }
}

/// The four collection shapes the engine knows how to reconcile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionShape {
    /// Indexed, fully editable (insert, remove, reorder).
    Sequence,
    /// Unordered unique elements; edits replace the element.
    Set,
    /// Keyed entries; key edits remove and reinsert.
    Map,
    /// Opaque iteration only; read-only.
    Iterable,
}

/// Declared type of a member or element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRef {
    Bool,
    Int,
    Float,
    Text,
    /// A structured type resolvable through the registry.
    Named(&'static str),
    Seq(Box<TypeRef>),
    Set(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    Iter(Box<TypeRef>),
    /// Abstract or host-managed reference; never default-constructed.
    Opaque(&'static str),
}

impl TypeRef {
    /// Most specific applicable collection shape, or `None` for scalars and
    /// structured types.
    pub fn collection_shape(&self) -> Option<CollectionShape> {
        match self {
            TypeRef::Seq(_) => Some(CollectionShape::Sequence),
            TypeRef::Set(_) => Some(CollectionShape::Set),
            TypeRef::Map(_, _) => Some(CollectionShape::Map),
            TypeRef::Iter(_) => Some(CollectionShape::Iterable),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        self.collection_shape().is_some()
    }

    /// Human-readable name used in diagnostics and fallback labels.
    pub fn display_name(&self) -> String {
        match self {
            TypeRef::Bool => "bool".to_string(),
            TypeRef::Int => "int".to_string(),
            TypeRef::Float => "float".to_string(),
            TypeRef::Text => "text".to_string(),
            TypeRef::Named(n) | TypeRef::Opaque(n) => (*n).to_string(),
            TypeRef::Seq(e) => format!("seq of {}", e.display_name()),
            TypeRef::Set(e) => format!("set of {}", e.display_name()),
            TypeRef::Map(k, v) => {
                format!("map of {} to {}", k.display_name(), v.display_name())
            }
            TypeRef::Iter(e) => format!("iterable of {}", e.display_name()),
        }
    }
}

/// Turns a `snake_case` or `camelCase` identifier into a title-cased label.
pub fn nicify(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut start_word = true;
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch == '_' {
            start_word = true;
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            out.push(' ');
            out.push(ch);
            prev_lower = false;
            start_word = false;
            continue;
        }
        if start_word {
            if !out.is_empty() {
                out.push(' ');
            }
            out.extend(ch.to_uppercase());
            start_word = false;
        } else {
            out.push(ch);
        }
        prev_lower = ch.is_lowercase();
    }
    out
}
