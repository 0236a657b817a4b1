//! Ordered secondary index.
//!
//! A BTreeMap-backed mapping from an indexed key to the set of row ids
//! carrying that key. Supports equality probes, forward and backward range
//! scans, and—because entries come back already sorted—streaming ordered
//! aggregation and "stop after K rows" traversal without a separate sort.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeBounds;

/// An ordered secondary index from key `K` to row ids `V`.
///
/// Duplicate keys are expected (many orders share a date); each key maps to
/// an ordered set of row ids, so full traversal order is `(key, id)`.
#[derive(Debug, Clone)]
pub struct OrderedIndex<K, V> {
    entries: BTreeMap<K, BTreeSet<V>>,
    len: usize,
}

impl<K: Ord, V: Ord> OrderedIndex<K, V> {
    /// Creates an empty index.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            len: 0,
        }
    }

    /// Inserts an entry. Returns `false` if the exact `(key, value)` pair
    /// was already present.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let inserted = self.entries.entry(key).or_default().insert(value);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Removes an entry, pruning the key when its posting set drains.
    /// Returns `false` if the pair was not present.
    pub fn remove(&mut self, key: &K, value: &V) -> bool {
        let Some(values) = self.entries.get_mut(key) else {
            return false;
        };
        let removed = values.remove(value);
        if removed {
            self.len -= 1;
            if values.is_empty() {
                self.entries.remove(key);
            }
        }
        removed
    }

    /// Equality probe: all row ids carrying exactly `key`, in id order.
    pub fn get<'a>(&'a self, key: &K) -> impl Iterator<Item = &'a V> + 'a {
        self.entries.get(key).into_iter().flatten()
    }

    /// Forward range scan: `(key, id)` pairs in ascending order.
    pub fn range<'a, R>(&'a self, range: R) -> impl Iterator<Item = (&'a K, &'a V)> + 'a
    where
        R: RangeBounds<K> + 'a,
    {
        self.entries
            .range(range)
            .flat_map(|(key, values)| values.iter().map(move |value| (key, value)))
    }

    /// Backward range scan: `(key, id)` pairs in descending order.
    ///
    /// Combined with `.take(k)` this is the top-K-by-key access path: the
    /// traversal stops after K rows instead of sorting the full result.
    pub fn range_rev<'a, R>(&'a self, range: R) -> impl Iterator<Item = (&'a K, &'a V)> + 'a
    where
        R: RangeBounds<K> + 'a,
    {
        self.entries
            .range(range)
            .rev()
            .flat_map(|(key, values)| values.iter().rev().map(move |value| (key, value)))
    }

    /// Number of entries in the index.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no entries.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<K: Ord, V: Ord> Default for OrderedIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OrderedIndex<u32, u64> {
        let mut index = OrderedIndex::new();
        index.insert(3, 30);
        index.insert(1, 10);
        index.insert(2, 20);
        index.insert(2, 21);
        index
    }

    #[test]
    fn insert_is_idempotent_per_pair() {
        let mut index = sample();
        assert!(!index.insert(2, 20));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn equality_probe_returns_ids_in_order() {
        let index = sample();
        assert_eq!(index.get(&2).copied().collect::<Vec<_>>(), vec![20, 21]);
        assert_eq!(index.get(&9).count(), 0);
    }

    #[test]
    fn forward_range_is_sorted() {
        let index = sample();
        let keys: Vec<u32> = index.range(..).map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 2, 2, 3]);
    }

    #[test]
    fn backward_range_stops_early() {
        let index = sample();
        let top: Vec<(u32, u64)> = index.range_rev(..).take(2).map(|(k, v)| (*k, *v)).collect();
        assert_eq!(top, vec![(3, 30), (2, 21)]);
    }

    #[test]
    fn remove_prunes_empty_keys() {
        let mut index = sample();
        assert!(index.remove(&1, &10));
        assert!(!index.remove(&1, &10));
        assert_eq!(index.get(&1).count(), 0);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn bounded_range_respects_bounds() {
        let index = sample();
        let hits: Vec<u64> = index.range(2..3).map(|(_, v)| *v).collect();
        assert_eq!(hits, vec![20, 21]);
    }
}
