//! Collection reconciliation.
//!
//! A [`CollectionView`] keeps a vector of positional element rows in sync
//! with the backing collection by polling its size: rows are destroyed from
//! the tail when the collection shrinks and appended at the tail when it
//! grows, so a poll costs O(size delta) row churn. Surviving rows keep
//! their positional accessors untouched.
//!
//! Rows bind to positions, not values. If elements shift between polls
//! (an insert at the head, say) existing rows silently retarget to the new
//! occupants of their indices; the view stays consistent because every
//! accessor re-reads the parent on access, but row-local UI state (hover,
//! expansion) stays with the position.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::accessor::Accessor;
use crate::bridge::{element_path, store_accessor};
use crate::engine::{compose_element, Environment};
use crate::row::ViewRow;
use crate::ticker::TickRegistration;
use crate::value::{CollectionShape, TypeRef, Value};

enum ShapeOps {
    Sequence {
        element: TypeRef,
    },
    Set {
        element: TypeRef,
    },
    Map {
        key: TypeRef,
        value: TypeRef,
        key_template: Accessor,
        value_template: Accessor,
    },
    Iterable {
        element: TypeRef,
    },
}

pub(crate) struct CollectionInner {
    env: Environment,
    accessor: Accessor,
    ops: ShapeOps,
    depth: usize,
    /// Static: the member or accessor can never edit this collection.
    read_only: bool,
    /// Rule-driven, refreshed by the owning row's visibility pass.
    editable: Cell<bool>,
    exists: Cell<bool>,
    size: Cell<usize>,
    size_label: RefCell<String>,
    rows: RefCell<Vec<ViewRow>>,
    /// Bridge binding; sequence mutations route through the store.
    path: Option<String>,
    tick: RefCell<Option<TickRegistration>>,
}

#[derive(Clone)]
pub struct CollectionView {
    inner: Rc<CollectionInner>,
}

impl CollectionView {
    pub(crate) fn create(
        env: &Environment,
        ty: &TypeRef,
        accessor: Accessor,
        path: Option<String>,
        depth: usize,
        tick_interval: u64,
        read_only_member: bool,
    ) -> CollectionView {
        let ops = match ty {
            TypeRef::Seq(element) => ShapeOps::Sequence {
                element: (**element).clone(),
            },
            TypeRef::Set(element) => ShapeOps::Set {
                element: (**element).clone(),
            },
            TypeRef::Map(key, value) => ShapeOps::Map {
                key: (**key).clone(),
                value: (**value).clone(),
                key_template: Accessor::slot(env.registry().new_element(key)),
                value_template: Accessor::slot(env.registry().new_element(value)),
            },
            TypeRef::Iter(element) => ShapeOps::Iterable {
                element: (**element).clone(),
            },
            other => {
                log::warn!("non-collection type `{}` in collection view", other.display_name());
                ShapeOps::Iterable {
                    element: TypeRef::Opaque("element"),
                }
            }
        };
        let read_only = read_only_member
            || accessor.is_read_only()
            || matches!(ops, ShapeOps::Iterable { .. });
        let view = CollectionView {
            inner: Rc::new(CollectionInner {
                env: env.clone(),
                accessor,
                ops,
                depth,
                read_only,
                editable: Cell::new(!read_only),
                exists: Cell::new(false),
                size: Cell::new(0),
                size_label: RefCell::new(String::new()),
                rows: RefCell::new(Vec::new()),
                path,
                tick: RefCell::new(None),
            }),
        };
        let weak: Weak<CollectionInner> = Rc::downgrade(&view.inner);
        let registration = env.ticker().register(tick_interval, move || {
            if let Some(inner) = weak.upgrade() {
                CollectionView { inner }.reconcile();
            }
        });
        *view.inner.tick.borrow_mut() = Some(registration);
        view.reconcile();
        view
    }

    pub fn shape(&self) -> CollectionShape {
        match self.inner.ops {
            ShapeOps::Sequence { .. } => CollectionShape::Sequence,
            ShapeOps::Set { .. } => CollectionShape::Set,
            ShapeOps::Map { .. } => CollectionShape::Map,
            ShapeOps::Iterable { .. } => CollectionShape::Iterable,
        }
    }

    /// Whether the backing value is a collection at all right now (false
    /// for `Null`, which is distinct from empty).
    pub fn exists(&self) -> bool {
        self.inner.exists.get()
    }

    pub fn size(&self) -> usize {
        self.inner.size.get()
    }

    /// `"null"` for an absent collection, else `"N elements"`.
    pub fn size_label(&self) -> String {
        self.inner.size_label.borrow().clone()
    }

    pub fn rows(&self) -> Vec<ViewRow> {
        self.inner.rows.borrow().clone()
    }

    /// Whether add/remove/move affordances are available.
    pub fn can_edit(&self) -> bool {
        !self.inner.read_only && self.inner.editable.get()
    }

    /// Editable slot for the key of the next map entry to add.
    pub fn key_template(&self) -> Option<Accessor> {
        match &self.inner.ops {
            ShapeOps::Map { key_template, .. } => Some(key_template.clone()),
            _ => None,
        }
    }

    /// Editable slot for the value of the next map entry to add.
    pub fn value_template(&self) -> Option<Accessor> {
        match &self.inner.ops {
            ShapeOps::Map { value_template, .. } => Some(value_template.clone()),
            _ => None,
        }
    }

    pub(crate) fn set_editable(&self, editable: bool) {
        self.inner
            .editable
            .set(editable && !self.inner.read_only);
    }

    /// One reconcile pass: recount, relabel, shrink or grow from the tail.
    pub fn reconcile(&self) {
        let value = self.inner.accessor.get();
        let counted = value.collection_len();
        let mut rows = self.inner.rows.borrow_mut();
        let Some(size) = counted else {
            self.inner.exists.set(false);
            self.inner.size.set(0);
            *self.inner.size_label.borrow_mut() = "null".to_string();
            rows.clear();
            return;
        };
        self.inner.exists.set(true);
        self.inner.size.set(size);
        *self.inner.size_label.borrow_mut() = if size == 1 {
            "1 element".to_string()
        } else {
            format!("{size} elements")
        };
        let old = rows.len();
        if old > size {
            rows.truncate(size);
        } else {
            for index in old..size {
                rows.push(self.build_row(index));
            }
        }
    }

    fn build_row(&self, index: usize) -> ViewRow {
        let inner = &self.inner;
        let label = format!("[{index}]");
        match &inner.ops {
            ShapeOps::Sequence { element } => {
                let (accessor, path) = match (&inner.path, inner.env.bridge()) {
                    (Some(path), Some(store)) => {
                        let elem_path = element_path(path, index);
                        (store_accessor(store, elem_path.clone()), Some(elem_path))
                    }
                    _ => (inner.accessor.seq_item(index), None),
                };
                let accessor = if inner.read_only {
                    accessor.without_writer()
                } else {
                    accessor
                };
                compose_element(&inner.env, element, accessor, label, index, inner.depth, path)
            }
            ShapeOps::Set { element } => {
                let accessor = if inner.read_only {
                    inner.accessor.set_item(index).without_writer()
                } else {
                    inner.accessor.set_item(index)
                };
                compose_element(&inner.env, element, accessor, label, index, inner.depth, None)
            }
            ShapeOps::Iterable { element } => compose_element(
                &inner.env,
                element,
                inner.accessor.iter_item(index),
                label,
                index,
                inner.depth,
                None,
            ),
            ShapeOps::Map { key, value, .. } => {
                let key_accessor = if inner.read_only {
                    inner.accessor.map_key(index).without_writer()
                } else {
                    inner.accessor.map_key(index)
                };
                let value_accessor = if inner.read_only {
                    inner.accessor.map_value(index).without_writer()
                } else {
                    inner.accessor.map_value(index)
                };
                let pair = crate::engine::group_row(label, index, true);
                pair.attach_child(compose_element(
                    &inner.env,
                    key,
                    key_accessor,
                    "Key".to_string(),
                    0,
                    inner.depth,
                    None,
                ));
                pair.attach_child(compose_element(
                    &inner.env,
                    value,
                    value_accessor,
                    "Value".to_string(),
                    1,
                    inner.depth,
                    None,
                ));
                pair
            }
        }
    }

    /// Index of the row the pointer is over, if any; targets add/remove.
    fn focused_index(&self) -> Option<usize> {
        self.inner
            .rows
            .borrow()
            .iter()
            .position(|row| row.subtree_hovered())
    }

    /// Adds an element: before the hovered row, else at the tail. Maps add
    /// the current template key/value pair and reset the templates.
    pub fn add(&self) {
        if !self.can_edit() {
            return;
        }
        let inner = &self.inner;
        match &inner.ops {
            ShapeOps::Sequence { element } => {
                let index = self
                    .focused_index()
                    .unwrap_or_else(|| inner.rows.borrow().len());
                let new_value = inner.env.registry().new_element(element);
                if let (Some(path), Some(store)) = (&inner.path, inner.env.bridge()) {
                    store.insert(path, index, new_value);
                } else {
                    let mut value = inner.accessor.get();
                    if value.is_null() {
                        value = Value::Seq(Vec::new());
                    }
                    let Value::Seq(items) = &mut value else {
                        return;
                    };
                    let index = index.min(items.len());
                    items.insert(index, new_value);
                    inner.accessor.set(value);
                }
                self.reconcile();
            }
            ShapeOps::Set { element } => {
                let new_value = inner.env.registry().new_element(element);
                let mut value = inner.accessor.get();
                if value.is_null() {
                    value = Value::Set(Vec::new());
                }
                let Value::Set(items) = &mut value else {
                    return;
                };
                if items.contains(&new_value) {
                    log::warn!("set already contains the default element, nothing added");
                    return;
                }
                items.push(new_value);
                inner.accessor.set(value);
                self.reconcile();
            }
            ShapeOps::Map {
                key,
                value: value_ty,
                key_template,
                value_template,
            } => {
                let new_key = key_template.get();
                let new_value = value_template.get();
                let mut value = inner.accessor.get();
                if value.is_null() {
                    value = Value::Map(Vec::new());
                }
                let Value::Map(entries) = &mut value else {
                    return;
                };
                if entries.iter().any(|(existing, _)| *existing == new_key) {
                    log::warn!("map already contains the template key, nothing added");
                    return;
                }
                entries.push((new_key, new_value));
                inner.accessor.set(value);
                key_template.set(inner.env.registry().new_element(key));
                value_template.set(inner.env.registry().new_element(value_ty));
                self.reconcile();
            }
            ShapeOps::Iterable { .. } => {}
        }
    }

    /// Removes the hovered element, else the last one.
    pub fn remove(&self) {
        if !self.can_edit() {
            return;
        }
        let inner = &self.inner;
        let row_count = inner.rows.borrow().len();
        if row_count == 0 {
            return;
        }
        let index = self.focused_index().unwrap_or(row_count - 1);
        match &inner.ops {
            ShapeOps::Sequence { .. } => {
                if let (Some(path), Some(store)) = (&inner.path, inner.env.bridge()) {
                    store.remove(path, index);
                } else {
                    let mut value = inner.accessor.get();
                    let Value::Seq(items) = &mut value else {
                        return;
                    };
                    if index >= items.len() {
                        return;
                    }
                    items.remove(index);
                    inner.accessor.set(value);
                }
            }
            ShapeOps::Set { .. } => {
                let mut value = inner.accessor.get();
                let Value::Set(items) = &mut value else {
                    return;
                };
                if index >= items.len() {
                    return;
                }
                items.remove(index);
                inner.accessor.set(value);
            }
            ShapeOps::Map { .. } => {
                let mut value = inner.accessor.get();
                let Value::Map(entries) = &mut value else {
                    return;
                };
                if index >= entries.len() {
                    return;
                }
                entries.remove(index);
                inner.accessor.set(value);
            }
            ShapeOps::Iterable { .. } => return,
        }
        self.reconcile();
    }

    /// Swaps a sequence element with its predecessor.
    pub fn move_up(&self, index: usize) {
        if index == 0 {
            return;
        }
        self.swap(index, index - 1);
    }

    /// Swaps a sequence element with its successor.
    pub fn move_down(&self, index: usize) {
        self.swap(index, index + 1);
    }

    fn swap(&self, from: usize, to: usize) {
        if !self.can_edit() {
            return;
        }
        let inner = &self.inner;
        if !matches!(inner.ops, ShapeOps::Sequence { .. }) {
            return;
        }
        if let (Some(path), Some(store)) = (&inner.path, inner.env.bridge()) {
            let len = inner.size.get();
            if from < len && to < len {
                store.move_element(path, from, to);
            }
            return;
        }
        let mut value = inner.accessor.get();
        let Value::Seq(items) = &mut value else {
            return;
        };
        if from < items.len() && to < items.len() {
            items.swap(from, to);
            inner.accessor.set(value);
        }
    }
}

#[path = "tests/collection_tests.rs"]
#[cfg(test)]
mod tests;
