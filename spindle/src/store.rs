//! Engine state and the top-level store handle.
//!
//! All tables and their indexes live behind one `RwLock`: a single
//! consistency domain, so a write transaction that touches several tables
//! commits in one critical section and readers never observe a partial
//! commit. Row locks (see [`crate::catalog`]) serialize same-product
//! writers across the longer validate-then-commit window of an order
//! transaction.

use crate::catalog::{CatalogStore, Category, LockTable, Product};
use crate::customer::{Customer, CustomerStore};
use crate::fact::SaleFact;
use crate::index::Indexes;
use crate::order::{Order, OrderEngine, OrderLine};
use crate::query::QueryRouter;
use crate::snapshot::RevenueSnapshot;
use crate::types::{
    CategoryId, CustomerId, EmailAddress, OrderId, OrderLineId, ProductId, Timestamp,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed predicate threshold the low-stock partial index is built
    /// with: rows with `stock < low_stock_threshold` are indexed.
    pub low_stock_threshold: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 10,
        }
    }
}

/// Monotonic id allocator for one table. Ids start at 1.
#[derive(Debug)]
pub(crate) struct IdSequence(u64);

impl IdSequence {
    const fn new() -> Self {
        Self(1)
    }

    fn next(&mut self) -> u64 {
        let id = self.0;
        self.0 += 1;
        id
    }
}

/// All table and index state, guarded by one lock.
#[derive(Debug)]
pub(crate) struct EngineState {
    pub categories: HashMap<CategoryId, Category>,
    pub products: HashMap<ProductId, Product>,
    pub customers: HashMap<CustomerId, Customer>,
    pub email_directory: HashMap<EmailAddress, CustomerId>,
    pub orders: HashMap<OrderId, Order>,
    pub order_lines: HashMap<OrderLineId, OrderLine>,
    pub lines_by_order: HashMap<OrderId, Vec<OrderLineId>>,
    pub facts: Vec<SaleFact>,
    pub indexes: Indexes,
    category_ids: IdSequence,
    product_ids: IdSequence,
    customer_ids: IdSequence,
    order_ids: IdSequence,
    line_ids: IdSequence,
}

impl EngineState {
    fn new(config: &EngineConfig) -> Self {
        Self {
            categories: HashMap::new(),
            products: HashMap::new(),
            customers: HashMap::new(),
            email_directory: HashMap::new(),
            orders: HashMap::new(),
            order_lines: HashMap::new(),
            lines_by_order: HashMap::new(),
            facts: Vec::new(),
            indexes: Indexes::new(config.low_stock_threshold),
            category_ids: IdSequence::new(),
            product_ids: IdSequence::new(),
            customer_ids: IdSequence::new(),
            order_ids: IdSequence::new(),
            line_ids: IdSequence::new(),
        }
    }

    pub fn allocate_category_id(&mut self) -> CategoryId {
        CategoryId::try_new(self.category_ids.next()).expect("id sequence starts at 1")
    }

    pub fn allocate_product_id(&mut self) -> ProductId {
        ProductId::try_new(self.product_ids.next()).expect("id sequence starts at 1")
    }

    pub fn allocate_customer_id(&mut self) -> CustomerId {
        CustomerId::try_new(self.customer_ids.next()).expect("id sequence starts at 1")
    }

    pub fn allocate_order_id(&mut self) -> OrderId {
        OrderId::try_new(self.order_ids.next()).expect("id sequence starts at 1")
    }

    pub fn allocate_line_id(&mut self) -> OrderLineId {
        OrderLineId::try_new(self.line_ids.next()).expect("id sequence starts at 1")
    }
}

/// Shared interior of the engine; components hold `Arc` clones.
pub(crate) struct SharedState {
    pub state: RwLock<EngineState>,
    pub row_locks: LockTable,
    pub snapshot: RwLock<Arc<RevenueSnapshot>>,
    pub config: EngineConfig,
}

/// The storage engine.
///
/// A `RecordStore` is a cheaply cloneable handle; clones share the same
/// underlying tables, indexes, ledger, and snapshot. Component handles
/// ([`CatalogStore`], [`CustomerStore`], [`OrderEngine`], [`QueryRouter`])
/// are views over the same state.
#[derive(Clone)]
pub struct RecordStore {
    shared: Arc<SharedState>,
}

impl RecordStore {
    /// Creates an empty engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an empty engine with explicit configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        let shared = SharedState {
            state: RwLock::new(EngineState::new(&config)),
            row_locks: LockTable::default(),
            snapshot: RwLock::new(Arc::new(RevenueSnapshot::empty(Timestamp::now()))),
            config,
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Handle to the catalog store.
    pub fn catalog(&self) -> CatalogStore {
        CatalogStore::new(Arc::clone(&self.shared))
    }

    /// Handle to the customer store.
    pub fn customers(&self) -> CustomerStore {
        CustomerStore::new(Arc::clone(&self.shared))
    }

    /// Handle to the order engine.
    pub fn orders(&self) -> OrderEngine {
        OrderEngine::new(Arc::clone(&self.shared))
    }

    /// Handle to the query router.
    pub fn queries(&self) -> QueryRouter {
        QueryRouter::new(Arc::clone(&self.shared))
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub(crate) fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CategoryName;

    #[test]
    fn id_sequences_are_dense_from_one() {
        let mut seq = IdSequence::new();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        assert_eq!(seq.next(), 3);
    }

    #[tokio::test]
    async fn clone_shares_storage() {
        let store = RecordStore::new();
        let clone = store.clone();

        let id = store
            .catalog()
            .create_category(CategoryName::try_new("Jazz").unwrap())
            .await
            .unwrap();

        // The clone observes writes made through the original.
        let category = clone.catalog().get_category(id).await.unwrap();
        assert_eq!(category.name.as_ref(), "Jazz");
        assert!(Arc::ptr_eq(store.shared(), clone.shared()));
    }
}
