//! Partial (conditional) secondary index.
//!
//! Built only over rows matching a fixed predicate, which keeps the index
//! proportional to the matching subset rather than the whole table. A
//! partial index is only a valid access path for queries whose predicate is
//! implied by the index predicate; the query router checks that implication
//! before choosing it.

use crate::index::covering::CoveringIndex;
use std::ops::RangeBounds;

/// A partial index over keys `K` with covering payload `P`.
///
/// `upsert` applies the predicate itself: rows that do not match are simply
/// absent, so callers route every write through the index unconditionally
/// and membership stays consistent with the predicate.
pub struct PartialIndex<K, P> {
    predicate: Box<dyn Fn(&K) -> bool + Send + Sync>,
    inner: CoveringIndex<K, P>,
}

impl<K: Ord, P> PartialIndex<K, P> {
    /// Creates an empty partial index with a fixed predicate.
    pub fn new(predicate: impl Fn(&K) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            inner: CoveringIndex::new(),
        }
    }

    /// Whether a key satisfies the index predicate.
    pub fn matches(&self, key: &K) -> bool {
        (self.predicate)(key)
    }

    /// Routes a row write through the index: indexed if the key matches the
    /// predicate, otherwise ignored. Returns whether the row is now present.
    pub fn upsert(&mut self, key: K, payload: P) -> bool {
        if (self.predicate)(&key) {
            self.inner.insert(key, payload);
            true
        } else {
            false
        }
    }

    /// Removes an entry by key (a no-op for rows that never matched).
    pub fn remove(&mut self, key: &K) -> Option<P> {
        self.inner.remove(key)
    }

    /// Scans matching rows in key order.
    pub fn scan(&self) -> impl Iterator<Item = (&K, &P)> {
        self.inner.scan()
    }

    /// Range scan over matching rows in key order.
    pub fn range<'a, R>(&'a self, range: R) -> impl Iterator<Item = (&'a K, &'a P)> + 'a
    where
        R: RangeBounds<K> + 'a,
    {
        self.inner.range(range)
    }

    /// Number of matching rows currently indexed.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no rows currently match.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Ord, P> std::fmt::Debug for PartialIndex<K, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartialIndex")
            .field("len", &self.inner.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn below_ten() -> PartialIndex<(u32, u64), &'static str> {
        PartialIndex::new(|key: &(u32, u64)| key.0 < 10)
    }

    #[test]
    fn upsert_filters_by_predicate() {
        let mut index = below_ten();
        assert!(index.upsert((9, 1), "kept"));
        assert!(!index.upsert((10, 2), "dropped"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn boundary_values() {
        let mut index = below_ten();
        index.upsert((9, 1), "nine");
        index.upsert((10, 2), "ten");
        let keys: Vec<u32> = index.scan().map(|(k, _)| k.0).collect();
        assert_eq!(keys, vec![9]);
    }

    #[test]
    fn remove_is_noop_for_unmatched_rows() {
        let mut index = below_ten();
        index.upsert((50, 3), "never indexed");
        assert_eq!(index.remove(&(50, 3)), None);
    }

    #[test]
    fn scan_is_key_ordered() {
        let mut index = below_ten();
        index.upsert((5, 2), "b");
        index.upsert((1, 1), "a");
        index.upsert((5, 9), "c");
        let rows: Vec<_> = index.scan().map(|(k, p)| (k.0, *p)).collect();
        assert_eq!(rows, vec![(1, "a"), (5, "b"), (5, "c")]);
    }
}
