//! Accessors: the engine's only way to reach host data.
//!
//! An [`Accessor`] bundles a read closure with an optional write closure.
//! A missing write closure is the definition of read-only, and read-onlyness
//! propagates to every accessor derived from it. Derived accessors are
//! positional: they re-read the parent value fresh on every access and write
//! the whole parent value back after an edit, so intermediate copies never
//! go stale.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::value::Value;

/// Why a read could not produce a value. Reads that fail are recovered at
/// the accessor boundary: callers see `Null` and the error goes to the log.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("backing value is no longer reachable")]
    Detached,
    #[error("index {index} is out of bounds (len {len})")]
    OutOfBounds { index: usize, len: usize },
    #[error("expected a {expected} value, found {found}")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{0}")]
    Host(String),
}

pub type ReadFn = Rc<dyn Fn() -> Result<Value, ReadError>>;
pub type WriteFn = Rc<dyn Fn(Value)>;

#[derive(Clone)]
pub struct Accessor {
    read: ReadFn,
    write: Option<WriteFn>,
}

impl Accessor {
    pub fn new(read: ReadFn, write: Option<WriteFn>) -> Self {
        Self { read, write }
    }

    /// Builds an accessor from plain closures.
    pub fn from_fns<R, W>(read: R, write: W) -> Self
    where
        R: Fn() -> Result<Value, ReadError> + 'static,
        W: Fn(Value) + 'static,
    {
        Self {
            read: Rc::new(read),
            write: Some(Rc::new(write)),
        }
    }

    pub fn read_only<R>(read: R) -> Self
    where
        R: Fn() -> Result<Value, ReadError> + 'static,
    {
        Self {
            read: Rc::new(read),
            write: None,
        }
    }

    /// An editable accessor over an owned slot. The common way for hosts and
    /// tests to root a composition.
    pub fn slot(initial: Value) -> Self {
        let cell = Rc::new(RefCell::new(initial));
        let read_cell = Rc::clone(&cell);
        Self::from_fns(
            move || Ok(read_cell.borrow().clone()),
            move |value| *cell.borrow_mut() = value,
        )
    }

    /// A read-only literal.
    pub fn constant(value: Value) -> Self {
        Self::read_only(move || Ok(value.clone()))
    }

    pub fn is_read_only(&self) -> bool {
        self.write.is_none()
    }

    /// The same accessor with its writer stripped.
    pub fn without_writer(&self) -> Accessor {
        Accessor {
            read: Rc::clone(&self.read),
            write: None,
        }
    }

    pub fn try_get(&self) -> Result<Value, ReadError> {
        (self.read)()
    }

    /// Reads the current value. A failed read is logged and reported as
    /// `Null`; the view keeps rendering.
    pub fn get(&self) -> Value {
        match (self.read)() {
            Ok(value) => value,
            Err(err) => {
                log::debug!("accessor read failed, treating as null: {err}");
                Value::Null
            }
        }
    }

    /// Writes a value back. Silently ignored on read-only accessors.
    pub fn set(&self, value: Value) {
        if let Some(write) = &self.write {
            write(value);
        }
    }

    /// Accessor for field slot `index` of a struct-valued parent.
    pub fn field(&self, index: usize) -> Accessor {
        let parent = self.clone();
        let read = move || -> Result<Value, ReadError> {
            match parent.try_get()? {
                Value::Null => Ok(Value::Null),
                Value::Struct(s) => s.fields.get(index).cloned().ok_or(ReadError::OutOfBounds {
                    index,
                    len: s.fields.len(),
                }),
                other => Err(ReadError::ShapeMismatch {
                    expected: "struct",
                    found: other.kind_name(),
                }),
            }
        };
        let write = self.write.as_ref().map(|_| {
            let parent = self.clone();
            let f: WriteFn = Rc::new(move |value: Value| {
                let mut current = parent.get();
                if let Some(s) = current.as_struct_mut() {
                    if index < s.fields.len() {
                        s.fields[index] = value;
                        parent.set(current);
                    }
                }
            });
            f
        });
        Accessor {
            read: Rc::new(read),
            write,
        }
    }

    /// Accessor for element `index` of a sequence-valued parent.
    pub fn seq_item(&self, index: usize) -> Accessor {
        let parent = self.clone();
        let read = move || -> Result<Value, ReadError> {
            match parent.try_get()? {
                Value::Null => Ok(Value::Null),
                Value::Seq(items) => {
                    let len = items.len();
                    items
                        .into_iter()
                        .nth(index)
                        .ok_or(ReadError::OutOfBounds { index, len })
                }
                other => Err(ReadError::ShapeMismatch {
                    expected: "seq",
                    found: other.kind_name(),
                }),
            }
        };
        let write = self.write.as_ref().map(|_| {
            let parent = self.clone();
            let f: WriteFn = Rc::new(move |value: Value| {
                let mut current = parent.get();
                if let Value::Seq(items) = &mut current {
                    if index < items.len() {
                        items[index] = value;
                        parent.set(current);
                    }
                }
            });
            f
        });
        Accessor {
            read: Rc::new(read),
            write,
        }
    }

    /// Accessor for the element at position `index` of a set-valued parent.
    /// Editing replaces the element: the old value is removed and the new
    /// value appended, matching set semantics where elements have no slot.
    pub fn set_item(&self, index: usize) -> Accessor {
        let parent = self.clone();
        let read = move || -> Result<Value, ReadError> {
            match parent.try_get()? {
                Value::Null => Ok(Value::Null),
                Value::Set(items) => {
                    let len = items.len();
                    items
                        .into_iter()
                        .nth(index)
                        .ok_or(ReadError::OutOfBounds { index, len })
                }
                other => Err(ReadError::ShapeMismatch {
                    expected: "set",
                    found: other.kind_name(),
                }),
            }
        };
        let write = self.write.as_ref().map(|_| {
            let parent = self.clone();
            let f: WriteFn = Rc::new(move |value: Value| {
                let mut current = parent.get();
                if let Value::Set(items) = &mut current {
                    if index < items.len() {
                        if items.contains(&value) {
                            log::warn!("set already contains the edited value, dropping edit");
                            return;
                        }
                        items.remove(index);
                        items.push(value);
                        parent.set(current);
                    }
                }
            });
            f
        });
        Accessor {
            read: Rc::new(read),
            write,
        }
    }

    /// Accessor for the key of map entry `index`. Editing a key removes the
    /// entry and reinserts it under the new key; an edit that would collide
    /// with an existing key is dropped to preserve key uniqueness.
    pub fn map_key(&self, index: usize) -> Accessor {
        let parent = self.clone();
        let read = move || -> Result<Value, ReadError> {
            match parent.try_get()? {
                Value::Null => Ok(Value::Null),
                Value::Map(entries) => {
                    let len = entries.len();
                    entries
                        .into_iter()
                        .nth(index)
                        .map(|(key, _)| key)
                        .ok_or(ReadError::OutOfBounds { index, len })
                }
                other => Err(ReadError::ShapeMismatch {
                    expected: "map",
                    found: other.kind_name(),
                }),
            }
        };
        let write = self.write.as_ref().map(|_| {
            let parent = self.clone();
            let f: WriteFn = Rc::new(move |new_key: Value| {
                let mut current = parent.get();
                if let Value::Map(entries) = &mut current {
                    if index >= entries.len() {
                        return;
                    }
                    if entries.iter().any(|(key, _)| *key == new_key) {
                        log::warn!("map already contains the edited key, dropping edit");
                        return;
                    }
                    let (_, value) = entries.remove(index);
                    entries.push((new_key, value));
                    parent.set(current);
                }
            });
            f
        });
        Accessor {
            read: Rc::new(read),
            write,
        }
    }

    /// Accessor for the value of map entry `index`; the value edits in place
    /// so entry order is preserved.
    pub fn map_value(&self, index: usize) -> Accessor {
        let parent = self.clone();
        let read = move || -> Result<Value, ReadError> {
            match parent.try_get()? {
                Value::Null => Ok(Value::Null),
                Value::Map(entries) => {
                    let len = entries.len();
                    entries
                        .into_iter()
                        .nth(index)
                        .map(|(_, value)| value)
                        .ok_or(ReadError::OutOfBounds { index, len })
                }
                other => Err(ReadError::ShapeMismatch {
                    expected: "map",
                    found: other.kind_name(),
                }),
            }
        };
        let write = self.write.as_ref().map(|_| {
            let parent = self.clone();
            let f: WriteFn = Rc::new(move |value: Value| {
                let mut current = parent.get();
                if let Value::Map(entries) = &mut current {
                    if index < entries.len() {
                        entries[index].1 = value;
                        parent.set(current);
                    }
                }
            });
            f
        });
        Accessor {
            read: Rc::new(read),
            write,
        }
    }

    /// Read-only accessor over position `index` of an iterable parent.
    pub fn iter_item(&self, index: usize) -> Accessor {
        let parent = self.clone();
        Accessor::read_only(move || -> Result<Value, ReadError> {
            match parent.try_get()? {
                Value::Null => Ok(Value::Null),
                Value::Seq(items) | Value::Set(items) => {
                    let len = items.len();
                    items
                        .into_iter()
                        .nth(index)
                        .ok_or(ReadError::OutOfBounds { index, len })
                }
                Value::Map(entries) => {
                    let len = entries.len();
                    entries
                        .into_iter()
                        .nth(index)
                        .map(|(key, value)| Value::Seq(vec![key, value]))
                        .ok_or(ReadError::OutOfBounds { index, len })
                }
                other => Err(ReadError::ShapeMismatch {
                    expected: "collection",
                    found: other.kind_name(),
                }),
            }
        })
    }
}

impl std::fmt::Debug for Accessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor")
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

#[path = "tests/accessor_tests.rs"]
#[cfg(test)]
mod tests;
