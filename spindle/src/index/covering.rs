//! Covering secondary index.
//!
//! An ordered index whose entries carry a non-key payload column, letting a
//! predicate-and-project query be answered from the index alone without
//! touching the base row.

use std::collections::BTreeMap;
use std::ops::RangeBounds;

/// An ordered index from unique key `K` to included payload `P`.
///
/// Keys must be unique; callers that index non-unique columns disambiguate
/// by folding the row id into the key tuple, e.g. `(stock, product_id)`.
#[derive(Debug, Clone)]
pub struct CoveringIndex<K, P> {
    entries: BTreeMap<K, P>,
}

impl<K: Ord, P> CoveringIndex<K, P> {
    /// Creates an empty index.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts an entry, returning any payload previously stored under the
    /// same key.
    pub fn insert(&mut self, key: K, payload: P) -> Option<P> {
        self.entries.insert(key, payload)
    }

    /// Removes an entry by key.
    pub fn remove(&mut self, key: &K) -> Option<P> {
        self.entries.remove(key)
    }

    /// Scans the whole index in key order.
    pub fn scan(&self) -> impl Iterator<Item = (&K, &P)> {
        self.entries.iter()
    }

    /// Range scan in key order.
    pub fn range<'a, R>(&'a self, range: R) -> impl Iterator<Item = (&'a K, &'a P)> + 'a
    where
        R: RangeBounds<K> + 'a,
    {
        self.entries.range(range)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Ord, P> Default for CoveringIndex<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_yields_key_order_with_payload() {
        let mut index = CoveringIndex::new();
        index.insert((5u32, 2u64), "b");
        index.insert((1u32, 1u64), "a");
        index.insert((5u32, 3u64), "c");

        let rows: Vec<_> = index.scan().map(|(k, p)| (*k, *p)).collect();
        assert_eq!(rows, vec![((1, 1), "a"), ((5, 2), "b"), ((5, 3), "c")]);
    }

    #[test]
    fn insert_replaces_payload_for_same_key() {
        let mut index = CoveringIndex::new();
        assert_eq!(index.insert(1u32, "old"), None);
        assert_eq!(index.insert(1u32, "new"), Some("old"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn remove_returns_payload() {
        let mut index = CoveringIndex::new();
        index.insert(1u32, "a");
        assert_eq!(index.remove(&1), Some("a"));
        assert_eq!(index.remove(&1), None);
        assert!(index.is_empty());
    }
}
