//! Test utilities for Loupe: a widget factory that records what it builds,
//! an in-memory flag store, and a path-addressed store for bridge tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use loupe_core::{
    Accessor, Environment, EnvironmentConfig, FieldOptions, FlagStore, PathStore, ReadError,
    TypeRef, TypeRegistry, Value, ViewRow, Widget, WidgetFactory,
};

/// What the factory captured for one terminal leaf. Tests downcast a row's
/// widget back to this to reach the accessor the engine handed out.
#[derive(Clone)]
pub struct RecordedField {
    pub ty: TypeRef,
    pub accessor: Accessor,
    pub label: String,
    pub options: FieldOptions,
}

/// Widget factory that wraps every scalar request in a [`RecordedField`]
/// and keeps a running label log.
#[derive(Default)]
pub struct RecordingFactory {
    log: RefCell<Vec<String>>,
}

impl RecordingFactory {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Labels of every leaf built so far, in construction order.
    pub fn created_labels(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl WidgetFactory for RecordingFactory {
    fn scalar(
        &self,
        ty: &TypeRef,
        accessor: &Accessor,
        label: &str,
        options: &FieldOptions,
    ) -> Widget {
        self.log.borrow_mut().push(label.to_string());
        Box::new(RecordedField {
            ty: ty.clone(),
            accessor: accessor.clone(),
            label: label.to_string(),
            options: options.clone(),
        })
    }
}

/// The [`RecordedField`] behind a scalar or readout row, if any.
pub fn recorded(row: &ViewRow) -> Option<RecordedField> {
    row.with_widget(|widget| widget.downcast_ref::<RecordedField>().cloned())
        .flatten()
}

/// In-memory [`FlagStore`]; unset keys read as false.
#[derive(Default)]
pub struct MemoryFlags {
    flags: RefCell<HashMap<String, bool>>,
}

impl MemoryFlags {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn set(&self, key: &str, value: bool) {
        self.flags.borrow_mut().insert(key.to_string(), value);
    }
}

impl FlagStore for MemoryFlags {
    fn get(&self, key: &str) -> bool {
        self.flags.borrow().get(key).copied().unwrap_or(false)
    }
}

/// Path-addressed store for bridge tests. Addresses are flat keys with
/// optional sequence indexing (`items`, `items[2]`, `items[2][0]`); every
/// mutation is appended to an operations log tests can assert on.
#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, Value>>,
    ops: RefCell<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn put(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.borrow().clone()
    }

    fn split(path: &str) -> Result<(String, Vec<usize>), ReadError> {
        let (key, rest) = match path.find('[') {
            Some(at) => (path[..at].to_string(), &path[at..]),
            None => (path.to_string(), ""),
        };
        let mut indices = Vec::new();
        for part in rest.split('[').skip(1) {
            let digits = part.strip_suffix(']').ok_or(ReadError::Host(format!(
                "malformed path `{path}`"
            )))?;
            let index = digits
                .parse::<usize>()
                .map_err(|_| ReadError::Host(format!("malformed path `{path}`")))?;
            indices.push(index);
        }
        Ok((key, indices))
    }

    fn with_target<R>(
        &self,
        path: &str,
        f: impl FnOnce(&mut Value) -> R,
    ) -> Result<R, ReadError> {
        let (key, indices) = Self::split(path)?;
        let mut values = self.values.borrow_mut();
        let mut target = values
            .get_mut(key.as_str())
            .ok_or(ReadError::Detached)?;
        for index in indices {
            let items = match target {
                Value::Seq(items) => items,
                other => {
                    return Err(ReadError::ShapeMismatch {
                        expected: "seq",
                        found: other.kind_name(),
                    })
                }
            };
            let len = items.len();
            target = items
                .get_mut(index)
                .ok_or(ReadError::OutOfBounds { index, len })?;
        }
        Ok(f(target))
    }
}

impl PathStore for MemoryStore {
    fn get(&self, path: &str) -> Result<Value, ReadError> {
        self.with_target(path, |value| value.clone())
    }

    fn set(&self, path: &str, value: Value) {
        self.ops.borrow_mut().push(format!("set {path}"));
        if let Err(err) = self.with_target(path, |target| *target = value) {
            log::debug!("memory store set on `{path}` failed: {err}");
        }
    }

    fn insert(&self, path: &str, index: usize, value: Value) {
        self.ops.borrow_mut().push(format!("insert {path} {index}"));
        let result = self.with_target(path, |target| {
            if let Value::Seq(items) = target {
                let index = index.min(items.len());
                items.insert(index, value);
            }
        });
        if let Err(err) = result {
            log::debug!("memory store insert on `{path}` failed: {err}");
        }
    }

    fn remove(&self, path: &str, index: usize) {
        self.ops.borrow_mut().push(format!("remove {path} {index}"));
        let result = self.with_target(path, |target| {
            if let Value::Seq(items) = target {
                if index < items.len() {
                    items.remove(index);
                }
            }
        });
        if let Err(err) = result {
            log::debug!("memory store remove on `{path}` failed: {err}");
        }
    }

    fn move_element(&self, path: &str, from: usize, to: usize) {
        self.ops
            .borrow_mut()
            .push(format!("move {path} {from} {to}"));
        let result = self.with_target(path, |target| {
            if let Value::Seq(items) = target {
                if from < items.len() && to < items.len() {
                    let value = items.remove(from);
                    items.insert(to, value);
                }
            }
        });
        if let Err(err) = result {
            log::debug!("memory store move on `{path}` failed: {err}");
        }
    }
}

/// Environment over a recording factory; the usual test fixture.
pub fn test_env(registry: TypeRegistry) -> (Environment, Rc<RecordingFactory>) {
    let factory = RecordingFactory::new();
    let env = Environment::new(registry, Rc::clone(&factory) as Rc<dyn WidgetFactory>);
    (env, factory)
}

/// Environment with explicit config, still over a recording factory.
pub fn test_env_with(
    registry: TypeRegistry,
    config: EnvironmentConfig,
) -> (Environment, Rc<RecordingFactory>) {
    let factory = RecordingFactory::new();
    let env = Environment::with_config(
        registry,
        Rc::clone(&factory) as Rc<dyn WidgetFactory>,
        config,
    );
    (env, factory)
}
