//! Row ordering.

use std::hash::{Hash, Hasher};

/// Sort key for rows within a composition.
///
/// Rows sort by explicit `order` first, then by `identity` so that members
/// sharing an order keep a stable relative position across polls. Field
/// ordering of the derives matters here: `order` before `identity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey {
    pub order: i32,
    pub identity: u64,
}

impl OrderKey {
    pub fn new(order: i32, identity: u64) -> Self {
        Self { order, identity }
    }
}

/// Stable identity hash for a member declaration.
///
/// Derived from the declaring type's name and the member name, never from
/// runtime values, so re-enumeration yields the same key every poll.
pub fn declaration_key(type_name: &str, member_name: &str) -> u64 {
    let mut hasher = ahash::AHasher::default();
    type_name.hash(&mut hasher);
    member_name.hash(&mut hasher);
    hasher.finish()
}

/// Identity for a member row: declaration position in the high bits so
/// members sharing an `order` keep declaration order, declaration hash in
/// the low bits to keep identities distinct.
pub fn member_identity(position: usize, type_name: &str, member_name: &str) -> u64 {
    ((position as u64 + 1) << 32) | (declaration_key(type_name, member_name) & 0xFFFF_FFFF)
}

/// Identity hash for a group declaration, keyed on the group id alone so
/// every member naming the same id resolves to the same group.
pub fn group_key(group_id: &str) -> u64 {
    let mut hasher = ahash::AHasher::default();
    group_id.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_order_then_identity() {
        let a = OrderKey::new(0, 7);
        let b = OrderKey::new(0, 9);
        let c = OrderKey::new(-1, 100);
        assert!(c < a);
        assert!(a < b);
    }

    #[test]
    fn declaration_key_is_stable_and_member_sensitive() {
        let a = declaration_key("Player", "health");
        let b = declaration_key("Player", "health");
        let c = declaration_key("Player", "mana");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn member_identity_preserves_declaration_order() {
        let first = member_identity(0, "Player", "health");
        let second = member_identity(1, "Player", "mana");
        assert!(first < second);
        assert_eq!(first, member_identity(0, "Player", "health"));
    }
}
