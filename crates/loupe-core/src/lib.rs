//! Loupe core: a polling object-inspection engine.
//!
//! The engine turns an accessor over a host object graph into a live,
//! editable tree of view rows. Hosts describe their types through a
//! [`TypeRegistry`], provide terminal widgets through a [`WidgetFactory`],
//! and drive the view by advancing the environment's [`Ticker`]; each tick
//! reconciles collection rows against their backing values and re-evaluates
//! per-row visibility rules. Everything is single-threaded and
//! `Rc`-shared; dropping a row tree detaches it from the scheduler.
//!
//! ```
//! use std::rc::Rc;
//! use loupe_core::{
//!     compose, Accessor, Environment, MemberDescriptor, StructValue, TypeDescriptor,
//!     TypeRef, TypeRegistry, Value,
//! };
//! # struct NullFactory;
//! # impl loupe_core::WidgetFactory for NullFactory {
//! #     fn scalar(
//! #         &self,
//! #         _: &TypeRef,
//! #         accessor: &Accessor,
//! #         _: &str,
//! #         _: &loupe_core::FieldOptions,
//! #     ) -> loupe_core::Widget {
//! #         Box::new(accessor.clone())
//! #     }
//! # }
//!
//! let registry = TypeRegistry::new();
//! registry.register(TypeDescriptor::new(
//!     "Player",
//!     vec![
//!         MemberDescriptor::field("name", 0, TypeRef::Text),
//!         MemberDescriptor::field("health", 1, TypeRef::Int),
//!     ],
//! ));
//! let env = Environment::new(registry, Rc::new(NullFactory));
//! let target = Accessor::slot(Value::Struct(StructValue::new(
//!     "Player",
//!     vec![Value::Text("Ada".into()), Value::Int(100)],
//! )));
//! let root = compose(&env, &TypeRef::Named("Player"), target);
//! assert_eq!(root.children().len(), 2);
//! env.tick(500);
//! ```

pub mod accessor;
pub mod bridge;
pub mod collections;
pub mod descriptor;
pub mod engine;
mod enumerate;
mod group;
pub mod metadata;
pub mod order;
pub mod row;
pub mod ticker;
pub mod value;
pub mod visibility;

pub use accessor::{Accessor, ReadError, ReadFn, WriteFn};
pub use bridge::{store_accessor, PathStore};
pub use collections::CollectionView;
pub use descriptor::{
    ActionFn, Getter, MemberDescriptor, MemberKind, Setter, TypeDescriptor, TypeRegistry,
};
pub use engine::{
    compose, compose_bound, values_differ, Environment, EnvironmentConfig, FieldOptions,
    InspectorOptions, WidgetFactory, MAX_DEPTH,
};
pub use enumerate::ConfigError;
pub use metadata::{
    ButtonMeta, GroupSpec, MemberMeta, Operand, Rule, TimeRange, TimeSpanHint, TimeUnit,
    OPT_IN_TICK_INTERVAL,
};
pub use order::{declaration_key, OrderKey};
pub use row::{RowKind, ViewRow, Widget};
pub use ticker::{TickRegistration, Ticker, DEFAULT_TICK_INTERVAL};
pub use value::{nicify, CollectionShape, StructValue, TypeRef, Value};
pub use visibility::{values_equal, FlagStore, NoFlags, RunMode, Visibility};
