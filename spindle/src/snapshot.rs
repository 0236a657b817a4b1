//! Precomputed category-revenue snapshot.
//!
//! The category roll-up is the one expensive join/aggregate in the query
//! set, so it additionally supports a cached copy of the grouped result.
//! The snapshot is the engine's single piece of eventually consistent
//! state: it is recomputed only by an explicit, caller-triggered refresh
//! (no background scheduler), and readers accept that it may lag behind
//! the live aggregate.
//!
//! The snapshot is versioned and atomically swappable: readers hold an
//! `Arc` to the version they fetched, so a refresh never invalidates an
//! in-flight reader.

use crate::types::{CategoryId, CategoryName, Money, Timestamp};
use serde::{Deserialize, Serialize};

/// One row of the category-revenue roll-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRevenue {
    /// Category the revenue is grouped under.
    pub category_id: CategoryId,
    /// Category name at aggregation time.
    pub name: CategoryName,
    /// Summed line revenue for the category.
    pub revenue: Money,
}

/// An immutable version of the category-revenue aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSnapshot {
    /// Grouped rows, revenue descending (ties by category id ascending).
    pub rows: Vec<CategoryRevenue>,
    /// When this version was computed.
    pub refreshed_at: Timestamp,
}

impl RevenueSnapshot {
    /// The initial, empty version installed at engine construction.
    pub fn empty(refreshed_at: Timestamp) -> Self {
        Self {
            rows: Vec::new(),
            refreshed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_no_rows() {
        let snapshot = RevenueSnapshot::empty(Timestamp::now());
        assert!(snapshot.rows.is_empty());
    }
}
