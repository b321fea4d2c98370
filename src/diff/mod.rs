//! Cart diff engine
//!
//! Pure structural comparison between two cart snapshots taken around a
//! cart mutation. Mutation responses from add-style endpoints carry the
//! added lines themselves; those deltas are authoritative and used
//! verbatim. Everything else is reconstructed by keying line items on
//! `(variant_id, canonical properties)` and comparing quantities.

use crate::models::{CartDiff, CartLine, CartSnapshot, LineChange, MutationDeltas};
use std::collections::HashMap;

/// Index a snapshot's lines by diff key. Duplicate keys collapse to the
/// last line seen; the cart API never emits true duplicates in one
/// snapshot.
fn index_lines(snapshot: &CartSnapshot) -> HashMap<(u64, String), &CartLine> {
    let mut map = HashMap::with_capacity(snapshot.items.len());
    for line in &snapshot.items {
        map.insert(line.key(), line);
    }
    map
}

/// Compute the structural diff between two cart snapshots.
///
/// Returns `None` when the prior state is unknown (`before` is `None`
/// and the mutation supplied no authoritative deltas) and when the
/// computed diff has no additions, removals, or changes. `None` means
/// "unknown or no change", never an error.
pub fn diff_snapshots(
    before: Option<&CartSnapshot>,
    after: &CartSnapshot,
    authoritative: Option<&MutationDeltas>,
) -> Option<CartDiff> {
    if before.is_none() && authoritative.is_none() {
        return None;
    }

    let after_index = index_lines(after);
    let before_index = before.map(index_lines);

    // Quantity changes are always reconstructed from the snapshots,
    // independent of authoritative deltas.
    let mut changed = Vec::new();
    if let Some(before_index) = &before_index {
        for (key, old_line) in before_index {
            if let Some(new_line) = after_index.get(key) {
                if old_line.quantity != new_line.quantity {
                    changed.push(LineChange {
                        variant_id: old_line.variant_id,
                        properties: old_line.properties.clone(),
                        quantity_before: old_line.quantity,
                        quantity_after: new_line.quantity,
                        price_before: old_line.price,
                        price_after: new_line.price,
                    });
                }
            }
        }
        changed.sort_by_key(|c| c.variant_id);
    }

    let (added, removed) = match (authoritative, &before_index) {
        // Ground truth from the mutation response wins outright.
        (Some(deltas), _) => (deltas.added.clone(), deltas.removed.clone()),
        // Heuristic set-diff over the same keys.
        (None, Some(before_index)) => {
            let mut added: Vec<CartLine> = after
                .items
                .iter()
                .filter(|line| !before_index.contains_key(&line.key()))
                .cloned()
                .collect();
            let mut removed: Vec<CartLine> = before_index
                .values()
                .filter(|line| !after_index.contains_key(&line.key()))
                .map(|line| (*line).clone())
                .collect();
            added.sort_by_key(|l| l.variant_id);
            removed.sort_by_key(|l| l.variant_id);
            (added, removed)
        }
        (None, None) => unreachable!("guarded above"),
    };

    let diff = CartDiff {
        items_before: before.map(|b| b.item_count),
        items_after: after.item_count,
        total_before: before.map(|b| b.total_price),
        total_after: after.total_price,
        added,
        removed,
        changed,
    };

    // An all-empty diff is "no change", normalized away.
    if diff.is_empty() {
        None
    } else {
        Some(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line(variant_id: u64, quantity: u32, price: i64) -> CartLine {
        CartLine {
            variant_id,
            quantity,
            price,
            properties: None,
        }
    }

    fn snapshot(total_price: i64, items: Vec<CartLine>) -> CartSnapshot {
        CartSnapshot {
            item_count: items.iter().map(|l| l.quantity).sum(),
            total_price,
            items,
        }
    }

    #[test]
    fn detects_added_line() {
        let before = snapshot(1000, vec![line(1, 1, 1000)]);
        let after = snapshot(2000, vec![line(1, 1, 1000), line(2, 1, 1000)]);

        let diff = diff_snapshots(Some(&before), &after, None).expect("diff");
        assert_eq!(diff.added, vec![line(2, 1, 1000)]);
        assert!(diff.removed.is_empty());
        assert!(diff.changed.is_empty());
        assert_eq!(diff.items_before, Some(1));
        assert_eq!(diff.items_after, 2);
        assert_eq!(diff.total_before, Some(1000));
        assert_eq!(diff.total_after, 2000);
    }

    #[test]
    fn detects_removed_line() {
        let before = snapshot(2000, vec![line(1, 1, 1000), line(2, 1, 1000)]);
        let after = snapshot(1000, vec![line(1, 1, 1000)]);

        let diff = diff_snapshots(Some(&before), &after, None).expect("diff");
        assert!(diff.added.is_empty());
        assert_eq!(diff.removed, vec![line(2, 1, 1000)]);
    }

    #[test]
    fn detects_quantity_change_with_prices() {
        let before = snapshot(1000, vec![line(1, 1, 1000)]);
        let after = snapshot(3000, vec![line(1, 3, 900)]);

        let diff = diff_snapshots(Some(&before), &after, None).expect("diff");
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
        assert_eq!(diff.changed.len(), 1);
        let change = &diff.changed[0];
        assert_eq!(change.quantity_before, 1);
        assert_eq!(change.quantity_after, 3);
        assert_eq!(change.price_before, 1000);
        assert_eq!(change.price_after, 900);
    }

    #[test]
    fn identical_snapshots_normalize_to_none() {
        let snap = snapshot(1000, vec![line(1, 1, 1000)]);
        assert!(diff_snapshots(Some(&snap.clone()), &snap, None).is_none());
    }

    #[test]
    fn unknown_prior_state_is_none_not_empty() {
        let after = snapshot(1000, vec![line(1, 1, 1000)]);
        assert!(diff_snapshots(None, &after, None).is_none());
    }

    #[test]
    fn authoritative_deltas_used_verbatim() {
        // Before snapshot missing, but the mutation response told us what
        // was added.
        let after = snapshot(2000, vec![line(1, 1, 1000), line(2, 1, 1000)]);
        let deltas = MutationDeltas {
            added: vec![line(2, 1, 1000)],
            removed: vec![],
        };

        let diff = diff_snapshots(None, &after, Some(&deltas)).expect("diff");
        assert_eq!(diff.added, vec![line(2, 1, 1000)]);
        assert_eq!(diff.items_before, None);
        assert_eq!(diff.total_before, None);
    }

    #[test]
    fn authoritative_deltas_skip_reconstruction() {
        // Heuristics would claim variant 3 was added; ground truth says
        // only variant 2 was.
        let before = snapshot(1000, vec![line(1, 1, 1000)]);
        let after = snapshot(3000, vec![line(1, 1, 1000), line(2, 1, 1000), line(3, 1, 1000)]);
        let deltas = MutationDeltas {
            added: vec![line(2, 1, 1000)],
            removed: vec![],
        };

        let diff = diff_snapshots(Some(&before), &after, Some(&deltas)).expect("diff");
        assert_eq!(diff.added, vec![line(2, 1, 1000)]);
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn changed_is_computed_even_with_authoritative_deltas() {
        let before = snapshot(1000, vec![line(1, 1, 1000)]);
        let after = snapshot(3000, vec![line(1, 2, 1000), line(2, 1, 1000)]);
        let deltas = MutationDeltas {
            added: vec![line(2, 1, 1000)],
            removed: vec![],
        };

        let diff = diff_snapshots(Some(&before), &after, Some(&deltas)).expect("diff");
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].variant_id, 1);
        assert_eq!(diff.changed[0].quantity_after, 2);
    }

    #[test]
    fn properties_distinguish_lines_with_same_variant() {
        let engraved = CartLine {
            variant_id: 1,
            quantity: 1,
            price: 1000,
            properties: Some(json!({"engraving": "hello"})),
        };
        let before = snapshot(1000, vec![line(1, 1, 1000)]);
        let after = snapshot(2000, vec![line(1, 1, 1000), engraved.clone()]);

        let diff = diff_snapshots(Some(&before), &after, None).expect("diff");
        assert_eq!(diff.added, vec![engraved]);
        assert!(diff.changed.is_empty());
    }

    #[test]
    fn duplicate_keys_collapse_to_last_seen() {
        let before = snapshot(1000, vec![line(1, 1, 1000), line(1, 5, 1000)]);
        let after = snapshot(5000, vec![line(1, 5, 1000)]);

        // Last duplicate (quantity 5) wins, so nothing changed.
        assert!(diff_snapshots(Some(&before), &after, None).is_none());
    }
}
