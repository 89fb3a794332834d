//! Group resolution within one composition.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::metadata::GroupSpec;
use crate::order::{group_key, OrderKey};
use crate::row::{RowContent, ViewRow};

/// Resolves group specs to group rows, one row per group id per
/// composition. Resolution never fails: the first member naming an id
/// creates the group (positioned at that member's order), later members
/// reuse it, and a spec whose label differs from the id's textual form
/// renames the existing row in place.
#[derive(Default)]
pub(crate) struct GroupSet {
    groups: HashMap<u64, ViewRow, ahash::RandomState>,
}

impl GroupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the group row for `spec`, creating it on first use. Newly
    /// created rows are handed to `attach` so the caller can place them in
    /// the composition.
    pub fn resolve(
        &mut self,
        spec: &GroupSpec,
        member_order: OrderKey,
        attach: &mut dyn FnMut(ViewRow),
    ) -> ViewRow {
        let id = group_key(spec.id);
        if let Some(existing) = self.groups.get(&id) {
            if spec.label != spec.id && !spec.label.is_empty() {
                existing.set_label(spec.label);
            }
            return existing.clone();
        }
        // The group sits where its first member would have.
        let row = ViewRow::new(
            spec.display_label().to_string(),
            member_order,
            RowContent::Group {
                children: BTreeMap::new(),
                inline: false,
            },
            false,
            None,
        );
        row.set_expanded(spec.expanded);
        attach(row.clone());
        self.groups.insert(id, row.clone());
        row
    }
}

#[path = "tests/group_tests.rs"]
#[cfg(test)]
mod tests;
