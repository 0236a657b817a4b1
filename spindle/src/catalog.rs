//! Catalog store: categories, products, and the per-product inventory
//! counter.
//!
//! This module is the exclusive owner of `Product::stock` mutation. Every
//! stock write goes through [`CatalogStore::adjust_stock`] or an order
//! transaction, and both paths hold the product's row lock, so two writers
//! can never interleave on the same counter.

use crate::errors::{Entity, StoreError, StoreResult};
use crate::store::SharedState;
use crate::types::{
    CategoryId, CategoryName, Money, ProductId, ProductName, StockLevel,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex as RowMutex, OwnedMutexGuard};
use tracing::instrument;

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique, immutable identifier.
    pub id: CategoryId,
    /// Display name.
    pub name: CategoryName,
}

/// A product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique, immutable identifier.
    pub id: ProductId,
    /// Owning category.
    pub category_id: CategoryId,
    /// Display name.
    pub name: ProductName,
    /// Free-text description; searchable together with the name.
    pub description: String,
    /// Unit price, strictly positive.
    pub price: Money,
    /// Units on hand.
    pub stock: StockLevel,
}

/// Exclusive holds on a set of product rows.
///
/// The locks are released when the set is dropped, i.e. at the end of the
/// enclosing transaction.
pub(crate) struct RowLockSet {
    _guards: Vec<OwnedMutexGuard<()>>,
}

/// Lock table handing out per-product row locks.
///
/// Locks are acquired in ascending product-id order regardless of the
/// order products appear in the caller's line list, so two orders racing
/// on the same two products cannot deadlock.
#[derive(Debug, Default)]
pub(crate) struct LockTable {
    locks: parking_lot::Mutex<HashMap<ProductId, Arc<RowMutex<()>>>>,
}

impl LockTable {
    /// Acquires exclusive row locks for the distinct product ids in `ids`.
    pub async fn lock_rows<I>(&self, ids: I) -> RowLockSet
    where
        I: IntoIterator<Item = ProductId>,
    {
        // BTreeSet both dedups and fixes the ascending acquisition order.
        let ordered: BTreeSet<ProductId> = ids.into_iter().collect();
        let handles: Vec<Arc<RowMutex<()>>> = {
            let mut table = self.locks.lock();
            ordered
                .iter()
                .map(|id| Arc::clone(table.entry(*id).or_default()))
                .collect()
        };
        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }
        RowLockSet { _guards: guards }
    }
}

/// Handle to the catalog tables. Cloning shares the underlying storage.
#[derive(Clone)]
pub struct CatalogStore {
    shared: Arc<SharedState>,
}

impl CatalogStore {
    pub(crate) const fn new(shared: Arc<SharedState>) -> Self {
        Self { shared }
    }

    /// Creates a category and returns its id.
    pub async fn create_category(&self, name: CategoryName) -> StoreResult<CategoryId> {
        let mut guard = self.shared.state.write();
        let state = &mut *guard;
        let id = state.allocate_category_id();
        state.categories.insert(id, Category { id, name });
        Ok(id)
    }

    /// Deletes a category. Rejected with `ConstraintViolation` while any
    /// product still references it.
    pub async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let mut guard = self.shared.state.write();
        let state = &mut *guard;
        if !state.categories.contains_key(&id) {
            return Err(StoreError::not_found(Entity::Category, id));
        }
        if state.indexes.products_by_category.get(&id).next().is_some() {
            return Err(StoreError::ConstraintViolation(format!(
                "category {id} still has products"
            )));
        }
        state.categories.remove(&id);
        Ok(())
    }

    /// Fetches a category by id.
    pub async fn get_category(&self, id: CategoryId) -> StoreResult<Category> {
        self.shared
            .state
            .read()
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::Category, id))
    }

    /// Creates a product and returns its id.
    ///
    /// Validates `price > 0` and that the category exists; every secondary
    /// index over products is updated in the same critical section as the
    /// base row insert.
    #[instrument(skip(self, name, description), fields(%category_id))]
    pub async fn create_product(
        &self,
        category_id: CategoryId,
        name: ProductName,
        description: impl Into<String> + std::fmt::Debug,
        price: Money,
        initial_stock: StockLevel,
    ) -> StoreResult<ProductId> {
        if price.is_zero() {
            return Err(StoreError::Validation(
                "product price must be greater than 0".to_string(),
            ));
        }
        let mut guard = self.shared.state.write();
        let state = &mut *guard;
        if !state.categories.contains_key(&category_id) {
            return Err(StoreError::not_found(Entity::Category, category_id));
        }
        let id = state.allocate_product_id();
        let product = Product {
            id,
            category_id,
            name,
            description: description.into(),
            price,
            stock: initial_stock,
        };
        state.indexes.index_product(&product);
        state.products.insert(id, product);
        Ok(id)
    }

    /// Fetches a product by id.
    pub async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        self.shared
            .state
            .read()
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::Product, id))
    }

    /// Lists a category's products in id order, via the category index.
    pub async fn products_in_category(&self, id: CategoryId) -> StoreResult<Vec<Product>> {
        let state = self.shared.state.read();
        if !state.categories.contains_key(&id) {
            return Err(StoreError::not_found(Entity::Category, id));
        }
        Ok(state
            .indexes
            .products_by_category
            .get(&id)
            .filter_map(|product_id| state.products.get(product_id))
            .cloned()
            .collect())
    }

    /// Applies a signed delta to a product's stock counter and returns the
    /// new level.
    ///
    /// Atomic with respect to concurrent callers on the same product: the
    /// call holds the product's row lock, fails with `InsufficientStock` if
    /// the delta would drive the counter below zero (leaving it unchanged),
    /// and no other caller ever observes an intermediate value.
    #[instrument(skip(self))]
    pub async fn adjust_stock(&self, product_id: ProductId, delta: i64) -> StoreResult<StockLevel> {
        let _row = self
            .shared
            .row_locks
            .lock_rows(std::iter::once(product_id))
            .await;
        let mut guard = self.shared.state.write();
        let state = &mut *guard;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_found(Entity::Product, product_id))?;

        let current = i64::from(product.stock.value());
        let next = current.checked_add(delta).ok_or_else(|| {
            StoreError::Validation(format!("stock delta {delta} out of range"))
        })?;
        if next < 0 {
            return Err(StoreError::InsufficientStock {
                product_id,
                requested: u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX),
                available: product.stock.value(),
            });
        }
        let next = u32::try_from(next).map_err(|_| {
            StoreError::Validation(format!("stock delta {delta} overflows the counter"))
        })?;

        let old = product.stock;
        product.stock = StockLevel::new(next);
        let (id, name, new_stock) = (product.id, product.name.clone(), product.stock);
        state.indexes.product_stock_changed(id, &name, old, new_stock);
        Ok(new_stock)
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::StoreError;
    use crate::store::RecordStore;
    use crate::types::{CategoryName, Money, ProductName, StockLevel};

    fn name(s: &str) -> ProductName {
        ProductName::try_new(s).unwrap()
    }

    async fn store_with_category() -> (RecordStore, crate::types::CategoryId) {
        let store = RecordStore::new();
        let category = store
            .catalog()
            .create_category(CategoryName::try_new("Vinyl").unwrap())
            .await
            .unwrap();
        (store, category)
    }

    #[tokio::test]
    async fn create_product_requires_existing_category() {
        let store = RecordStore::new();
        let missing = crate::types::CategoryId::try_new(42).unwrap();
        let err = store
            .catalog()
            .create_product(
                missing,
                name("Abbey Road"),
                "",
                Money::from_cents(2999).unwrap(),
                StockLevel::new(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn create_product_rejects_zero_price() {
        let (store, category) = store_with_category().await;
        let err = store
            .catalog()
            .create_product(
                category,
                name("Freebie"),
                "",
                Money::default(),
                StockLevel::new(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn adjust_stock_commits_and_returns_new_level() {
        let (store, category) = store_with_category().await;
        let product = store
            .catalog()
            .create_product(
                category,
                name("Blue Train"),
                "",
                Money::from_cents(1999).unwrap(),
                StockLevel::new(10),
            )
            .await
            .unwrap();

        let level = store.catalog().adjust_stock(product, -3).await.unwrap();
        assert_eq!(level.value(), 7);
        let level = store.catalog().adjust_stock(product, 5).await.unwrap();
        assert_eq!(level.value(), 12);
    }

    #[tokio::test]
    async fn adjust_stock_rejects_underflow_and_leaves_stock_unchanged() {
        let (store, category) = store_with_category().await;
        let product = store
            .catalog()
            .create_product(
                category,
                name("Kind of Blue"),
                "",
                Money::from_cents(1999).unwrap(),
                StockLevel::new(2),
            )
            .await
            .unwrap();

        let err = store.catalog().adjust_stock(product, -3).await.unwrap_err();
        assert!(matches!(err, StoreError::InsufficientStock { available: 2, requested: 3, .. }));
        assert_eq!(
            store.catalog().get_product(product).await.unwrap().stock.value(),
            2
        );
    }

    #[tokio::test]
    async fn delete_category_guards_live_references() {
        let (store, category) = store_with_category().await;
        store
            .catalog()
            .create_product(
                category,
                name("Harvest"),
                "",
                Money::from_cents(2499).unwrap(),
                StockLevel::new(1),
            )
            .await
            .unwrap();

        let err = store.catalog().delete_category(category).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        let empty = store
            .catalog()
            .create_category(CategoryName::try_new("Cassettes").unwrap())
            .await
            .unwrap();
        store.catalog().delete_category(empty).await.unwrap();
    }
}
