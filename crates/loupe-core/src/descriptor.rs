//! Type descriptors and the registry that caches them.
//!
//! Rust has no runtime reflection, so hosts describe their types to the
//! engine: a [`TypeDescriptor`] lists a type's members, each with its
//! declared [`TypeRef`], a [`MemberKind`] saying how to reach the data, and
//! [`MemberMeta`] saying how to present it.

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::metadata::MemberMeta;
use crate::value::{StructValue, TypeRef, Value};

/// Reads a member value out of its owner.
pub type Getter = Rc<dyn Fn(&Value) -> Value>;
/// Writes a member value into its owner.
pub type Setter = Rc<dyn Fn(&mut Value, Value)>;
/// Runs an action against its owner.
pub type ActionFn = Rc<dyn Fn(&mut Value)>;

/// How a member's data is reached.
#[derive(Clone)]
pub enum MemberKind {
    /// Plain serialized data at field slot `index` of the struct value.
    Field { index: usize },
    /// Computed member with explicit get/set closures. `params` counts
    /// declared parameters; anything but zero is a configuration error.
    Computed {
        get: Option<Getter>,
        set: Option<Setter>,
        params: usize,
    },
    /// Invocable member. Only parameterless void actions are drawable.
    Action {
        run: Option<ActionFn>,
        params: usize,
        returns_value: bool,
    },
}

#[derive(Clone)]
pub struct MemberDescriptor {
    pub name: &'static str,
    pub ty: TypeRef,
    pub kind: MemberKind,
    pub meta: MemberMeta,
}

impl MemberDescriptor {
    pub fn field(name: &'static str, index: usize, ty: TypeRef) -> Self {
        Self {
            name,
            ty,
            kind: MemberKind::Field { index },
            meta: MemberMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: MemberMeta) -> Self {
        self.meta = meta;
        self
    }
}

pub struct TypeDescriptor {
    pub name: &'static str,
    pub members: Vec<MemberDescriptor>,
    /// Abstract types cannot be default-constructed.
    pub abstract_type: bool,
}

impl TypeDescriptor {
    pub fn new(name: &'static str, members: Vec<MemberDescriptor>) -> Self {
        Self {
            name,
            members,
            abstract_type: false,
        }
    }

    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Number of field slots a struct value of this type carries.
    pub fn field_count(&self) -> usize {
        self.members
            .iter()
            .filter_map(|m| match m.kind {
                MemberKind::Field { index } => Some(index + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }
}

enum Provider {
    Ready(Rc<TypeDescriptor>),
    Lazy(Box<dyn Fn() -> TypeDescriptor>),
}

/// Resolves type names to descriptors, building each at most once.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    inner: Rc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    providers: RefCell<HashMap<&'static str, Provider, ahash::RandomState>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, descriptor: TypeDescriptor) {
        self.inner
            .providers
            .borrow_mut()
            .insert(descriptor.name, Provider::Ready(Rc::new(descriptor)));
    }

    /// Registers a descriptor built on first use, so mutually recursive
    /// types can describe each other.
    pub fn register_lazy<F>(&self, name: &'static str, build: F)
    where
        F: Fn() -> TypeDescriptor + 'static,
    {
        self.inner
            .providers
            .borrow_mut()
            .insert(name, Provider::Lazy(Box::new(build)));
    }

    pub fn describe(&self, name: &str) -> Option<Rc<TypeDescriptor>> {
        // Take the provider out before building so the builder may itself
        // consult the registry.
        let pending = {
            let mut providers = self.inner.providers.borrow_mut();
            if let Some(Provider::Ready(descriptor)) = providers.get(name) {
                return Some(Rc::clone(descriptor));
            }
            providers.remove(name)?
        };
        let descriptor = match pending {
            Provider::Ready(descriptor) => descriptor,
            Provider::Lazy(build) => Rc::new(build()),
        };
        self.inner
            .providers
            .borrow_mut()
            .insert(descriptor.name, Provider::Ready(Rc::clone(&descriptor)));
        Some(descriptor)
    }

    /// Default value for a declared type. Structured types default-construct
    /// field by field; unresolvable, abstract, and opaque types default to
    /// `Null`.
    pub fn default_value(&self, ty: &TypeRef) -> Value {
        self.default_value_bounded(ty, 8)
    }

    fn default_value_bounded(&self, ty: &TypeRef, depth: usize) -> Value {
        match ty {
            TypeRef::Bool => Value::Bool(false),
            TypeRef::Int => Value::Int(0),
            TypeRef::Float => Value::Float(0.0),
            TypeRef::Text => Value::Text(String::new()),
            TypeRef::Seq(_) => Value::Seq(Vec::new()),
            TypeRef::Set(_) => Value::Set(Vec::new()),
            TypeRef::Map(_, _) => Value::Map(Vec::new()),
            TypeRef::Iter(_) => Value::Null,
            TypeRef::Opaque(_) => Value::Null,
            TypeRef::Named(name) => {
                if depth == 0 {
                    return Value::Null;
                }
                match self.describe(name) {
                    Some(descriptor) if !descriptor.abstract_type => {
                        let mut fields = vec![Value::Null; descriptor.field_count()];
                        for member in &descriptor.members {
                            if let MemberKind::Field { index } = member.kind {
                                fields[index] =
                                    self.default_value_bounded(&member.ty, depth - 1);
                            }
                        }
                        Value::Struct(StructValue::new(descriptor.name, fields))
                    }
                    _ => Value::Null,
                }
            }
        }
    }

    /// Value for a freshly added collection element. Unlike
    /// [`default_value`](Self::default_value), collection-typed elements
    /// start as `Null` rather than empty, so the element row itself shows
    /// the distinguished null state.
    pub fn new_element(&self, ty: &TypeRef) -> Value {
        match ty {
            TypeRef::Seq(_) | TypeRef::Set(_) | TypeRef::Map(_, _) | TypeRef::Iter(_) => {
                Value::Null
            }
            _ => self.default_value(ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_descriptor() -> TypeDescriptor {
        TypeDescriptor::new(
            "Point",
            vec![
                MemberDescriptor::field("x", 0, TypeRef::Int),
                MemberDescriptor::field("y", 1, TypeRef::Int),
            ],
        )
    }

    #[test]
    fn describe_resolves_lazy_once() {
        use std::cell::Cell;
        let registry = TypeRegistry::new();
        let builds = Rc::new(Cell::new(0));
        let counter = Rc::clone(&builds);
        registry.register_lazy("Point", move || {
            counter.set(counter.get() + 1);
            point_descriptor()
        });
        assert!(registry.describe("Point").is_some());
        assert!(registry.describe("Point").is_some());
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn default_value_builds_struct_fields() {
        let registry = TypeRegistry::new();
        registry.register(point_descriptor());
        let value = registry.default_value(&TypeRef::Named("Point"));
        let s = value.as_struct().unwrap();
        assert_eq!(s.type_name, "Point");
        assert_eq!(s.fields, vec![Value::Int(0), Value::Int(0)]);
    }

    #[test]
    fn abstract_and_unknown_types_default_to_null() {
        let registry = TypeRegistry::new();
        let mut desc = point_descriptor();
        desc.abstract_type = true;
        registry.register(desc);
        assert_eq!(registry.default_value(&TypeRef::Named("Point")), Value::Null);
        assert_eq!(registry.default_value(&TypeRef::Named("Ghost")), Value::Null);
        assert_eq!(registry.default_value(&TypeRef::Opaque("Handle")), Value::Null);
    }

    #[test]
    fn new_elements_of_collection_type_start_null() {
        let registry = TypeRegistry::new();
        let nested = TypeRef::Seq(Box::new(TypeRef::Int));
        assert_eq!(registry.new_element(&nested), Value::Null);
        assert_eq!(registry.new_element(&TypeRef::Int), Value::Int(0));
    }
}
