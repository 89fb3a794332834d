//! Optional persistence bridge.
//!
//! When a host keeps its data behind a path-addressed store (an undo stack,
//! a serialized document), compositions can route reads, writes, and
//! sequence mutations through it instead of mutating values directly. Paths
//! are plain strings: fields append `.name`, sequence elements append
//! `[index]`.

use std::rc::Rc;

use crate::accessor::{Accessor, ReadError};
use crate::value::Value;

pub trait PathStore {
    fn get(&self, path: &str) -> Result<Value, ReadError>;
    fn set(&self, path: &str, value: Value);
    /// Inserts `value` at `index` of the sequence at `path`.
    fn insert(&self, path: &str, index: usize, value: Value);
    /// Removes the element at `index` of the sequence at `path`.
    fn remove(&self, path: &str, index: usize);
    /// Moves the element at `from` to `to` within the sequence at `path`.
    fn move_element(&self, path: &str, from: usize, to: usize);
}

/// Joins a member name onto a path.
pub(crate) fn child_path(path: &str, member: &str) -> String {
    if path.is_empty() {
        member.to_string()
    } else {
        format!("{path}.{member}")
    }
}

/// Joins a sequence index onto a path.
pub(crate) fn element_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

/// Accessor reading and writing through a store at a fixed path.
pub fn store_accessor(store: Rc<dyn PathStore>, path: impl Into<String>) -> Accessor {
    let path = path.into();
    let read_store = Rc::clone(&store);
    let read_path = path.clone();
    Accessor::from_fns(
        move || read_store.get(&read_path),
        move |value| store.set(&path, value),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_compose() {
        assert_eq!(child_path("", "items"), "items");
        assert_eq!(child_path("player", "items"), "player.items");
        assert_eq!(element_path("player.items", 3), "player.items[3]");
    }
}
