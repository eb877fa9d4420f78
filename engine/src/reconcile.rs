//! Merge-on-login planning.
//!
//! When a guest signs in, the items they collected on the device are folded
//! into the account's remote lists exactly once. Identity is the item id and
//! the remote copy always wins: a guest item whose id already exists remotely
//! is dropped, never merged field by field.
//!
//! # Algorithm
//!
//! 1. Walk the guest list in order
//! 2. Skip ids already present remotely (dropped) or already planned
//! 3. Everything else is appended after the remote items, in guest order
//!
//! The plan is pure; the engine executes it one append at a time so a
//! failure part way leaves the unmerged remainder on the device for retry.

use crate::{item::ListItem, ItemId, ListKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which guest items to append and which lose to a remote copy.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan<T> {
    /// Guest items with ids unknown to the remote list, deduplicated.
    pub to_append: Vec<T>,
    /// Guest items whose id collides with a remote item (or an earlier
    /// guest item).
    pub dropped: Vec<T>,
}

impl<T> MergePlan<T> {
    /// Whether executing the plan would write anything.
    pub fn is_noop(&self) -> bool {
        self.to_append.is_empty()
    }
}

/// Plan the merge of `guest` into `remote`.
pub fn plan_merge<T: ListItem>(remote: &[T], guest: &[T]) -> MergePlan<T> {
    let mut known: HashSet<&str> = remote.iter().map(ListItem::id).collect();
    let mut to_append = Vec::new();
    let mut dropped = Vec::new();

    for item in guest {
        if known.insert(item.id()) {
            to_append.push(item.clone());
        } else {
            dropped.push(item.clone());
        }
    }

    MergePlan { to_append, dropped }
}

/// The list that results from merging `guest` into `remote`.
pub fn merge<T: ListItem>(remote: &[T], guest: &[T]) -> Vec<T> {
    let plan = plan_merge(remote, guest);
    remote.iter().cloned().chain(plan.to_append).collect()
}

/// Outcome of merging one guest list into a remote list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Ids appended to the remote list
    pub appended: Vec<ItemId>,
    /// Ids dropped because the remote list already had them
    pub dropped: Vec<ItemId>,
    /// Ids still waiting in guest storage for the next attempt
    pub pending: Vec<ItemId>,
    /// Why the merge stopped early, if it did
    pub failure: Option<String>,
}

impl MergeReport {
    /// Whether every guest item was either appended or dropped.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.pending.is_empty()
    }
}

/// Merge reports for both lists after a sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginReport {
    pub cart: MergeReport,
    pub wishlist: MergeReport,
}

impl LoginReport {
    pub fn is_complete(&self) -> bool {
        self.cart.is_complete() && self.wishlist.is_complete()
    }

    pub fn for_list(&self, list: ListKind) -> &MergeReport {
        match list {
            ListKind::Cart => &self.cart,
            ListKind::Wishlist => &self.wishlist,
        }
    }

    pub(crate) fn for_list_mut(&mut self, list: ListKind) -> &mut MergeReport {
        match list {
            ListKind::Cart => &mut self.cart,
            ListKind::Wishlist => &mut self.wishlist,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CartItem;

    fn item(id: &str, quantity: u32) -> CartItem {
        CartItem::new(id, format!("product {id}")).quantity(quantity)
    }

    fn ids(items: &[CartItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn plan_into_empty_remote() {
        let guest = vec![item("p1", 2), item("p2", 1)];
        let plan = plan_merge(&[], &guest);

        assert_eq!(plan.to_append, guest);
        assert!(plan.dropped.is_empty());
        assert!(!plan.is_noop());
    }

    #[test]
    fn remote_wins_on_collision() {
        let remote = vec![item("p1", 5)];
        let guest = vec![item("p1", 2), item("p2", 1)];

        let plan = plan_merge(&remote, &guest);
        assert_eq!(ids(&plan.to_append), vec!["p2"]);
        assert_eq!(ids(&plan.dropped), vec!["p1"]);

        let merged = merge(&remote, &guest);
        assert_eq!(ids(&merged), vec!["p1", "p2"]);
        assert_eq!(merged[0].quantity, 5);
    }

    #[test]
    fn guest_duplicates_collapse() {
        let guest = vec![item("p1", 1), item("p1", 7)];
        let plan = plan_merge(&[], &guest);

        assert_eq!(plan.to_append.len(), 1);
        assert_eq!(plan.to_append[0].quantity, 1);
        assert_eq!(plan.dropped.len(), 1);
    }

    #[test]
    fn empty_guest_is_noop() {
        let remote = vec![item("p1", 1)];
        let plan = plan_merge(&remote, &[]);
        assert!(plan.is_noop());
        assert_eq!(merge(&remote, &[]), remote);
    }

    #[test]
    fn merge_twice_is_merge_once() {
        let remote = vec![item("p1", 1)];
        let guest = vec![item("p2", 2), item("p1", 3)];

        let once = merge(&remote, &guest);
        let twice = merge(&once, &guest);
        assert_eq!(once, twice);
    }

    #[test]
    fn report_completeness() {
        let mut report = LoginReport::default();
        assert!(report.is_complete());

        report.for_list_mut(ListKind::Wishlist).pending = vec!["p1".into()];
        assert!(!report.is_complete());
        assert!(report.for_list(ListKind::Cart).is_complete());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_list() -> impl Strategy<Value = Vec<CartItem>> {
            prop::collection::vec((0u8..8, 1u32..5), 0..8).prop_map(|entries| {
                entries
                    .into_iter()
                    .map(|(id, quantity)| item(&format!("p{id}"), quantity))
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn prop_merge_has_unique_ids(remote in arb_list(), guest in arb_list()) {
                let remote = crate::item::dedupe_by_id(remote);
                let merged = merge(&remote, &guest);

                let unique: HashSet<&str> = merged.iter().map(|i| i.id.as_str()).collect();
                prop_assert_eq!(unique.len(), merged.len());
            }

            #[test]
            fn prop_remote_copy_survives(remote in arb_list(), guest in arb_list()) {
                let remote = crate::item::dedupe_by_id(remote);
                let merged = merge(&remote, &guest);

                prop_assert_eq!(&merged[..remote.len()], &remote[..]);
            }

            #[test]
            fn prop_merge_idempotent(remote in arb_list(), guest in arb_list()) {
                let remote = crate::item::dedupe_by_id(remote);
                let once = merge(&remote, &guest);

                prop_assert_eq!(merge(&once, &guest), once.clone());
                prop_assert!(plan_merge(&once, &guest).is_noop());
            }
        }
    }
}
