use std::collections::HashMap;
use std::sync::Arc;

use super::ParentBitmap;
use crate::Neighbor;

/// What a heap slot's id means. Slots hold group ids while results are being
/// collected and are rewritten to leaf ids exactly once, by `finalize`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotId {
    Group(u64),
    Leaf(u64),
}

impl SlotId {
    fn raw(self) -> u64 {
        match self {
            SlotId::Group(id) | SlotId::Leaf(id) => id,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    distance: f32,
    id: SlotId,
}

impl Slot {
    // Max-heap order, ties broken on id so the layout is deterministic.
    fn outranks(&self, other: &Slot) -> bool {
        self.distance > other.distance
            || (self.distance == other.distance && self.id.raw() > other.id.raw())
    }
}

/// Bounded max-heap keeping the `k` closest results, at most one per group.
///
/// The root is the worst result currently kept, so a new group only gets in
/// when it beats the root. Two maps track, for every group in the heap, the
/// leaf that produced its best distance and the slot it occupies; their key
/// sets always equal the set of occupied slots.
///
/// One instance serves one query. Reusing it for another query requires
/// [`GroupedTopKHeap::reset`].
#[derive(Debug)]
pub struct GroupedTopKHeap {
    parents: Option<Arc<ParentBitmap>>,
    slots: Vec<Slot>,
    capacity: usize,
    group_to_leaf: HashMap<u64, u64>,
    group_to_index: HashMap<u64, usize>,
    finalized: bool,
    orphans: usize,
}

impl GroupedTopKHeap {
    /// A heap that groups leaves by their parent in `parents`, or by the leaf
    /// id itself when `parents` is `None`.
    pub fn new(parents: Option<Arc<ParentBitmap>>) -> Self {
        Self {
            parents,
            slots: Vec::new(),
            capacity: 0,
            group_to_leaf: HashMap::new(),
            group_to_index: HashMap::new(),
            finalized: false,
            orphans: 0,
        }
    }

    pub fn ungrouped() -> Self {
        Self::new(None)
    }

    /// Offers one candidate. `k == 0` is a no-op.
    ///
    /// The slot buffer is sized on the first non-zero `k`. A larger `k` on a
    /// later call is clamped to that size; a smaller one shrinks the heap by
    /// evicting the worst results until at most `k` remain.
    pub fn collect(&mut self, k: usize, leaf_id: u64, distance: f32) {
        debug_assert!(!self.finalized, "collect called after finalize");
        if self.finalized || k == 0 || distance.is_nan() {
            return;
        }
        if self.capacity == 0 {
            self.capacity = k;
            self.slots.reserve_exact(k);
        } else if k < self.capacity {
            self.shrink(k);
        }
        let k = k.min(self.capacity);

        let group_id = match &self.parents {
            Some(parents) => match parents.parent_of(leaf_id) {
                Some(group_id) => group_id,
                None => {
                    self.orphans += 1;
                    return;
                }
            },
            None => leaf_id,
        };

        match self.group_to_index.get(&group_id).copied() {
            None if self.slots.len() < k => self.push(group_id, leaf_id, distance),
            None => {
                if distance < self.slots[0].distance {
                    self.replace_top(group_id, leaf_id, distance);
                }
            }
            Some(index) => {
                if distance < self.slots[index].distance {
                    self.update(index, group_id, leaf_id, distance);
                }
            }
        }
    }

    /// Rewrites every slot from its group id to the leaf that produced the
    /// group's best distance and returns the `(distance, leaf)` pairs in heap
    /// order (not sorted). Calling it again returns the same results.
    pub fn finalize(&mut self) -> Vec<Neighbor> {
        if !self.finalized {
            for slot in self.slots.iter_mut() {
                if let SlotId::Group(group_id) = slot.id {
                    let leaf_id = self.group_to_leaf.get(&group_id).copied();
                    debug_assert!(leaf_id.is_some(), "group {group_id} has no leaf");
                    slot.id = SlotId::Leaf(leaf_id.unwrap_or(group_id));
                }
            }
            self.group_to_leaf.clear();
            self.group_to_index.clear();
            self.finalized = true;
            tracing::trace!(
                results = self.slots.len(),
                orphans = self.orphans,
                "Finalized grouped top-k heap"
            );
        }

        self.slots
            .iter()
            .map(|slot| Neighbor {
                distance: slot.distance,
                id: slot.id.raw(),
            })
            .collect()
    }

    /// Drops all collected state so the instance can serve the next query.
    /// The slot buffer's allocation is kept.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.capacity = 0;
        self.group_to_leaf.clear();
        self.group_to_index.clear();
        self.finalized = false;
        self.orphans = 0;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Heap size set by the first non-zero `k` and lowered by any smaller `k`;
    /// zero before the first candidate.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Candidates dropped because no group encloses their leaf id.
    pub fn orphans(&self) -> usize {
        self.orphans
    }

    fn shrink(&mut self, k: usize) {
        while self.slots.len() > k {
            self.pop_root();
        }
        self.capacity = k;
    }

    fn pop_root(&mut self) {
        let root = self.slots.swap_remove(0);
        if let SlotId::Group(group_id) = root.id {
            self.group_to_leaf.remove(&group_id);
            self.group_to_index.remove(&group_id);
        }
        if let Some(&slot) = self.slots.first() {
            self.sift_down(0, slot);
        }
    }

    fn push(&mut self, group_id: u64, leaf_id: u64, distance: f32) {
        debug_assert!(
            !self.group_to_index.contains_key(&group_id),
            "group {group_id} is already in the heap"
        );
        let slot = Slot {
            distance,
            id: SlotId::Group(group_id),
        };
        self.slots.push(slot);
        self.sift_up(self.slots.len() - 1, slot);
        self.group_to_leaf.insert(group_id, leaf_id);
    }

    fn replace_top(&mut self, group_id: u64, leaf_id: u64, distance: f32) {
        debug_assert!(
            !self.group_to_index.contains_key(&group_id),
            "group {group_id} is already in the heap"
        );
        if let SlotId::Group(evicted) = self.slots[0].id {
            self.group_to_leaf.remove(&evicted);
            self.group_to_index.remove(&evicted);
        }
        let slot = Slot {
            distance,
            id: SlotId::Group(group_id),
        };
        self.sift_down(0, slot);
        self.group_to_leaf.insert(group_id, leaf_id);
    }

    fn update(&mut self, index: usize, group_id: u64, leaf_id: u64, distance: f32) {
        let slot = Slot {
            distance,
            id: SlotId::Group(group_id),
        };
        // Only one of the two passes moves anything.
        if self.sift_up(index, slot) == index {
            self.sift_down(index, slot);
        }
        self.group_to_leaf.insert(group_id, leaf_id);
    }

    fn sift_up(&mut self, mut index: usize, slot: Slot) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !slot.outranks(&self.slots[parent]) {
                break;
            }
            self.slots[index] = self.slots[parent];
            self.record_index(index);
            index = parent;
        }
        self.slots[index] = slot;
        self.record_index(index);
        index
    }

    fn sift_down(&mut self, mut index: usize, slot: Slot) -> usize {
        let len = self.slots.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right >= len || self.slots[left].outranks(&self.slots[right]) {
                left
            } else {
                right
            };
            if slot.outranks(&self.slots[child]) {
                break;
            }
            self.slots[index] = self.slots[child];
            self.record_index(index);
            index = child;
        }
        self.slots[index] = slot;
        self.record_index(index);
        index
    }

    fn record_index(&mut self, index: usize) {
        if let SlotId::Group(group_id) = self.slots[index].id {
            self.group_to_index.insert(group_id, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use proptest::prelude::*;

    use super::*;
    use crate::sort_neighbors;

    impl GroupedTopKHeap {
        fn assert_invariants(&self) {
            assert!(self.slots.len() <= self.capacity);
            let mut seen = HashSet::new();
            for (index, slot) in self.slots.iter().enumerate() {
                let SlotId::Group(group_id) = slot.id else {
                    panic!("slot {index} left the group phase before finalize");
                };
                assert!(seen.insert(group_id), "group {group_id} appears twice");
                assert_eq!(self.group_to_index.get(&group_id), Some(&index));
                assert!(self.group_to_leaf.contains_key(&group_id));
                if index > 0 {
                    let parent = &self.slots[(index - 1) / 2];
                    assert!(parent.distance >= slot.distance, "heap order broken");
                }
            }
            assert_eq!(self.group_to_index.len(), self.slots.len());
            assert_eq!(self.group_to_leaf.len(), self.slots.len());
        }
    }

    fn sorted(mut results: Vec<Neighbor>) -> Vec<(f32, u64)> {
        sort_neighbors(&mut results);
        results.into_iter().map(|n| (n.distance, n.id)).collect()
    }

    #[test]
    fn test_best_leaf_per_group() {
        let parents = Arc::new(ParentBitmap::build(&[2, 5]).unwrap());
        let mut heap = GroupedTopKHeap::new(Some(parents));
        heap.collect(3, 0, 10.0);
        heap.collect(3, 1, 11.0);
        heap.collect(3, 2, 12.0);
        heap.collect(3, 3, 13.0);
        heap.assert_invariants();
        assert_eq!(heap.len(), 2);

        assert_eq!(sorted(heap.finalize()), vec![(10.0, 0), (12.0, 2)]);
        assert!(heap.is_finalized());
    }

    #[test]
    fn test_zero_k_is_noop() {
        let mut heap = GroupedTopKHeap::ungrouped();
        for leaf_id in 0..10 {
            heap.collect(0, leaf_id, leaf_id as f32);
        }
        assert!(heap.is_empty());
        assert_eq!(heap.capacity(), 0);
        assert!(heap.finalize().is_empty());
    }

    #[test]
    fn test_better_leaf_replaces_group_entry() {
        let parents = Arc::new(ParentBitmap::build(&[3, 7]).unwrap());
        let mut heap = GroupedTopKHeap::new(Some(parents));
        heap.collect(2, 0, 5.0);
        heap.collect(2, 4, 9.0);
        heap.collect(2, 5, 1.0);
        heap.assert_invariants();
        heap.collect(2, 2, 0.5);
        heap.assert_invariants();

        assert_eq!(sorted(heap.finalize()), vec![(0.5, 2), (1.0, 5)]);
    }

    #[test]
    fn test_ties_keep_first_seen_leaf() {
        let parents = Arc::new(ParentBitmap::build(&[4]).unwrap());
        let mut heap = GroupedTopKHeap::new(Some(parents));
        heap.collect(1, 0, 2.0);
        heap.collect(1, 1, 2.0);
        heap.collect(1, 3, 2.0);
        assert_eq!(sorted(heap.finalize()), vec![(2.0, 0)]);
    }

    #[test]
    fn test_tie_with_root_does_not_evict() {
        let mut heap = GroupedTopKHeap::ungrouped();
        heap.collect(2, 10, 1.0);
        heap.collect(2, 11, 3.0);
        heap.collect(2, 12, 3.0);
        assert_eq!(sorted(heap.finalize()), vec![(1.0, 10), (3.0, 11)]);
    }

    #[test]
    fn test_eviction_frees_group() {
        let mut heap = GroupedTopKHeap::ungrouped();
        heap.collect(2, 1, 4.0);
        heap.collect(2, 2, 5.0);
        heap.collect(2, 3, 1.0);
        heap.assert_invariants();
        assert!(!heap.group_to_index.contains_key(&2));
        // The evicted group can come back with a better distance.
        heap.collect(2, 2, 0.5);
        heap.assert_invariants();
        assert_eq!(sorted(heap.finalize()), vec![(0.5, 2), (1.0, 3)]);
    }

    #[test]
    fn test_orphan_leaves_are_dropped() {
        let parents = Arc::new(ParentBitmap::build(&[1]).unwrap());
        let mut heap = GroupedTopKHeap::new(Some(parents));
        heap.collect(4, 0, 3.0);
        heap.collect(4, 1, 1.0);
        heap.collect(4, 8, 0.1);
        assert_eq!(heap.orphans(), 2);
        assert_eq!(sorted(heap.finalize()), vec![(3.0, 0)]);
    }

    #[test]
    fn test_larger_k_is_clamped_to_first_capacity() {
        let mut heap = GroupedTopKHeap::ungrouped();
        heap.collect(2, 0, 3.0);
        heap.collect(5, 1, 2.0);
        heap.collect(5, 2, 1.0);
        assert_eq!(heap.capacity(), 2);
        assert_eq!(sorted(heap.finalize()), vec![(1.0, 2), (2.0, 1)]);
    }

    #[test]
    fn test_smaller_k_shrinks_heap() {
        let mut heap = GroupedTopKHeap::ungrouped();
        heap.collect(3, 1, 5.0);
        heap.collect(3, 2, 6.0);
        heap.collect(3, 3, 7.0);
        heap.collect(2, 4, 1.0);
        heap.assert_invariants();
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.capacity(), 2);
        assert!(!heap.group_to_index.contains_key(&2));

        // The shrunk size sticks for the rest of the query.
        heap.collect(3, 5, 0.5);
        heap.assert_invariants();
        assert_eq!(sorted(heap.finalize()), vec![(0.5, 5), (1.0, 4)]);
    }

    #[test]
    fn test_shrink_to_one_keeps_best_group() {
        let parents = Arc::new(ParentBitmap::build(&[2, 5, 9]).unwrap());
        let mut heap = GroupedTopKHeap::new(Some(parents));
        heap.collect(4, 0, 3.0);
        heap.collect(4, 3, 2.0);
        heap.collect(4, 6, 4.0);
        heap.collect(1, 1, 9.0);
        heap.assert_invariants();
        assert_eq!(sorted(heap.finalize()), vec![(2.0, 3)]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "collect called after finalize")]
    fn test_collect_after_finalize_panics_in_debug() {
        let mut heap = GroupedTopKHeap::ungrouped();
        heap.collect(1, 0, 1.0);
        heap.finalize();
        heap.collect(1, 1, 0.5);
    }

    #[test]
    fn test_nan_distance_is_ignored() {
        let mut heap = GroupedTopKHeap::ungrouped();
        heap.collect(2, 0, f32::NAN);
        heap.collect(2, 1, 1.0);
        assert_eq!(sorted(heap.finalize()), vec![(1.0, 1)]);
    }

    #[test]
    fn test_finalize_switches_phase_once() {
        let parents = Arc::new(ParentBitmap::build(&[9]).unwrap());
        let mut heap = GroupedTopKHeap::new(Some(parents));
        heap.collect(3, 4, 1.5);
        // Before finalize the slot holds the group, not the leaf.
        assert_eq!(heap.slots[0].id, SlotId::Group(9));

        let first = heap.finalize();
        assert_eq!(heap.slots[0].id, SlotId::Leaf(4));
        assert_eq!(first, heap.finalize());
    }

    #[test]
    fn test_reset_allows_reuse() {
        let mut heap = GroupedTopKHeap::ungrouped();
        heap.collect(1, 7, 1.0);
        heap.finalize();
        heap.reset();
        assert!(heap.is_empty());
        assert!(!heap.is_finalized());

        heap.collect(2, 3, 4.0);
        heap.collect(2, 7, 5.0);
        heap.assert_invariants();
        assert_eq!(sorted(heap.finalize()), vec![(4.0, 3), (5.0, 7)]);
    }

    proptest! {
        #[test]
        fn test_matches_per_group_minimum(
            k in 1usize..8,
            parent_ids in proptest::collection::btree_set(0i64..64, 1..12),
            hits in proptest::collection::vec((0u64..64, 0u16..50), 0..200),
        ) {
            let parent_ids = parent_ids.into_iter().collect::<Vec<_>>();
            let parents = Arc::new(ParentBitmap::build(&parent_ids).unwrap());
            let mut heap = GroupedTopKHeap::new(Some(parents.clone()));

            // Reference: per group, the first hit with the minimum distance.
            let mut best: HashMap<u64, (f32, u64)> = HashMap::new();
            for &(leaf_id, distance) in &hits {
                let distance = distance as f32;
                heap.collect(k, leaf_id, distance);
                heap.assert_invariants();
                if let Some(group_id) = parents.parent_of(leaf_id) {
                    let entry = best.entry(group_id).or_insert((distance, leaf_id));
                    if distance < entry.0 {
                        *entry = (distance, leaf_id);
                    }
                }
            }

            let results = heap.finalize();
            prop_assert!(results.len() <= k);
            prop_assert_eq!(results.len(), best.len().min(k));

            let mut groups = HashSet::new();
            for result in &results {
                let group_id = parents.parent_of(result.id).unwrap();
                prop_assert!(groups.insert(group_id));
            }

            // The kept distances are the k smallest per-group minima.
            let mut expected = best.values().map(|(d, _)| *d).collect::<Vec<_>>();
            expected.sort_by(|a, b| a.total_cmp(b));
            expected.truncate(k);
            let mut actual = results.iter().map(|n| n.distance).collect::<Vec<_>>();
            actual.sort_by(|a, b| a.total_cmp(b));
            prop_assert_eq!(actual, expected);
        }
    }
}
