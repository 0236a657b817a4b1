//! Query router: maps each declared analytic query shape to its access
//! path.
//!
//! There is no cost-based planner. The query set is closed and known, so
//! every shape is hard-wired to the index that serves it (see
//! [`crate::index::Indexes`] for the mapping), with one explicit fallback:
//! a stock predicate the partial index cannot cover degrades to a full
//! scan and says so in the log.

use crate::catalog::Product;
use crate::errors::{Entity, StoreError, StoreResult};
use crate::fact::SaleFact;
use crate::order::Order;
use crate::snapshot::{CategoryRevenue, RevenueSnapshot};
use crate::store::{EngineState, SharedState};
use crate::types::{
    CategoryId, CustomerId, Money, OrderDate, ProductId, ProductName, StockLevel, Timestamp,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One row of the monthly top-sellers ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSeller {
    /// Product ranked.
    pub product_id: ProductId,
    /// Product name.
    pub name: ProductName,
    /// Units sold in the month.
    pub units: u64,
}

/// One row of the high-spend-customers report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSpend {
    /// Customer reported.
    pub customer_id: CustomerId,
    /// Total spend inside the window.
    pub spend: Money,
}

/// One row of the low-stock listing. Every field here is served from the
/// partial covering index; the base product row is never read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockItem {
    /// Product running low.
    pub product_id: ProductId,
    /// Product name (the index's included payload).
    pub name: ProductName,
    /// Current stock level (part of the index key).
    pub stock: StockLevel,
}

/// Read port consumed by an external presentation or reporting layer.
///
/// Every method returns an ordered sequence of rows; ordering is part of
/// the contract, not an accident of storage.
#[async_trait]
pub trait StorefrontReads: Send + Sync {
    /// Summed order revenue for one calendar date.
    async fn daily_revenue(&self, date: OrderDate) -> StoreResult<Money>;

    /// Top `k` products by units sold in a calendar month, units
    /// descending, ties by product id ascending.
    async fn monthly_top_sellers(
        &self,
        year: i32,
        month: u32,
        k: usize,
    ) -> StoreResult<Vec<TopSeller>>;

    /// Customers whose spend in the rolling prior-month window
    /// `[window_end - 1 month, window_end)` strictly exceeds `threshold`,
    /// spend descending, ties by customer id ascending.
    async fn high_spend_customers(
        &self,
        window_end: OrderDate,
        threshold: Money,
    ) -> StoreResult<Vec<CustomerSpend>>;

    /// Products under the engine's configured low-stock threshold, stock
    /// ascending, at most `limit` rows. Served entirely from the partial
    /// covering index.
    async fn low_stock(&self, limit: usize) -> StoreResult<Vec<LowStockItem>>;

    /// Products with `stock < threshold`. Uses the partial index when the
    /// predicate is implied by the index predicate, otherwise falls back
    /// to a full scan.
    async fn products_below_stock(
        &self,
        threshold: u32,
        limit: usize,
    ) -> StoreResult<Vec<LowStockItem>>;

    /// Live category-revenue roll-up: OrderLine→Product→Category joined
    /// and grouped, revenue descending, ties by category id ascending.
    async fn category_revenue(&self) -> StoreResult<Vec<CategoryRevenue>>;

    /// The precomputed category-revenue snapshot. May lag the live
    /// aggregate until the next explicit refresh; never an error.
    async fn category_revenue_snapshot(&self) -> Arc<RevenueSnapshot>;

    /// The `k` most recent orders, order date strictly non-increasing,
    /// via backward index traversal that stops after `k` rows.
    async fn recent_orders(&self, k: usize) -> StoreResult<Vec<Order>>;

    /// Token-containment search over product name + description, product
    /// id ascending. A query normalizing to no tokens matches nothing.
    async fn search_products(&self, text: &str) -> StoreResult<Vec<Product>>;

    /// Substring fallback over the raw text fields, product id ascending.
    /// Full-table scan; kept for completeness and benchmarking only.
    async fn search_products_substring(&self, text: &str) -> StoreResult<Vec<Product>>;

    /// Up to `k` products sharing a category with the customer's past
    /// purchases, excluding products already purchased, ranked by units
    /// sold all-time descending, ties by product id ascending.
    async fn recommendations_for(
        &self,
        customer_id: CustomerId,
        k: usize,
    ) -> StoreResult<Vec<Product>>;

    /// The full sale-history ledger in append order.
    async fn sale_history(&self) -> Vec<SaleFact>;
}

/// Handle to the read path. Cloning shares the underlying storage.
#[derive(Clone)]
pub struct QueryRouter {
    shared: Arc<SharedState>,
}

impl QueryRouter {
    pub(crate) const fn new(shared: Arc<SharedState>) -> Self {
        Self { shared }
    }

    /// Recomputes the category-revenue aggregate and atomically swaps it
    /// in as the new snapshot version. In-flight readers of the previous
    /// version are unaffected. Caller-triggered only.
    #[instrument(skip(self))]
    pub async fn refresh_category_revenue_snapshot(&self) -> StoreResult<Arc<RevenueSnapshot>> {
        let rows = {
            let state = self.shared.state.read();
            live_category_revenue(&state)?
        };
        let snapshot = Arc::new(RevenueSnapshot {
            rows,
            refreshed_at: Timestamp::now(),
        });
        *self.shared.snapshot.write() = Arc::clone(&snapshot);
        info!(rows = snapshot.rows.len(), "category revenue snapshot refreshed");
        Ok(snapshot)
    }
}

/// Computes the live roll-up. Shared by the live query and the refresh.
fn live_category_revenue(state: &EngineState) -> StoreResult<Vec<CategoryRevenue>> {
    let mut revenue_by_category: BTreeMap<CategoryId, Money> = BTreeMap::new();
    for line in state.order_lines.values() {
        let Some(product) = state.products.get(&line.product_id) else {
            continue;
        };
        let line_total = line.unit_price.multiply_by_quantity(line.quantity)?;
        let entry = revenue_by_category
            .entry(product.category_id)
            .or_default();
        *entry = entry.checked_add(line_total)?;
    }
    let mut rows: Vec<CategoryRevenue> = revenue_by_category
        .into_iter()
        .filter_map(|(category_id, revenue)| {
            state.categories.get(&category_id).map(|category| CategoryRevenue {
                category_id,
                name: category.name.clone(),
                revenue,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.category_id.cmp(&b.category_id))
    });
    Ok(rows)
}

#[async_trait]
impl StorefrontReads for QueryRouter {
    async fn daily_revenue(&self, date: OrderDate) -> StoreResult<Money> {
        let state = self.shared.state.read();
        let mut revenue = Money::default();
        for order_id in state.indexes.orders_by_date.get(&date) {
            if let Some(order) = state.orders.get(order_id) {
                revenue = revenue.checked_add(order.total_amount)?;
            }
        }
        Ok(revenue)
    }

    async fn monthly_top_sellers(
        &self,
        year: i32,
        month: u32,
        k: usize,
    ) -> StoreResult<Vec<TopSeller>> {
        let (start, end) = OrderDate::month_of(year, month).ok_or_else(|| {
            StoreError::Validation(format!("{year}-{month} is not a calendar month"))
        })?;

        let state = self.shared.state.read();
        let mut units_by_product: BTreeMap<ProductId, u64> = BTreeMap::new();
        for (_, order_id) in state.indexes.orders_by_date.range(start..end) {
            let Some(line_ids) = state.lines_by_order.get(order_id) else {
                continue;
            };
            for line_id in line_ids {
                if let Some(line) = state.order_lines.get(line_id) {
                    *units_by_product.entry(line.product_id).or_default() +=
                        u64::from(line.quantity.value());
                }
            }
        }

        let mut rows: Vec<TopSeller> = units_by_product
            .into_iter()
            .filter_map(|(product_id, units)| {
                state.products.get(&product_id).map(|product| TopSeller {
                    product_id,
                    name: product.name.clone(),
                    units,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.units
                .cmp(&a.units)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        rows.truncate(k);
        Ok(rows)
    }

    async fn high_spend_customers(
        &self,
        window_end: OrderDate,
        threshold: Money,
    ) -> StoreResult<Vec<CustomerSpend>> {
        let window_start = window_end.months_back(1).ok_or_else(|| {
            StoreError::Validation(format!("no prior-month window before {window_end}"))
        })?;

        let state = self.shared.state.read();
        let mut rows = Vec::new();
        for &customer_id in state.customers.keys() {
            let mut spend = Money::default();
            for (_, order_id) in state
                .indexes
                .orders_by_customer
                .range((customer_id, window_start)..(customer_id, window_end))
            {
                if let Some(order) = state.orders.get(order_id) {
                    spend = spend.checked_add(order.total_amount)?;
                }
            }
            if spend > threshold {
                rows.push(CustomerSpend { customer_id, spend });
            }
        }
        rows.sort_by(|a, b| {
            b.spend
                .cmp(&a.spend)
                .then_with(|| a.customer_id.cmp(&b.customer_id))
        });
        Ok(rows)
    }

    async fn low_stock(&self, limit: usize) -> StoreResult<Vec<LowStockItem>> {
        let state = self.shared.state.read();
        Ok(state
            .indexes
            .low_stock
            .scan()
            .take(limit)
            .map(|(&(stock, product_id), name)| LowStockItem {
                product_id,
                name: name.clone(),
                stock,
            })
            .collect())
    }

    async fn products_below_stock(
        &self,
        threshold: u32,
        limit: usize,
    ) -> StoreResult<Vec<LowStockItem>> {
        let state = self.shared.state.read();
        if state.indexes.covers_stock_below(threshold) {
            debug!(threshold, "stock predicate served by partial index");
            return Ok(state
                .indexes
                .low_stock
                .scan()
                .take_while(|((stock, _), _)| stock.is_below(threshold))
                .take(limit)
                .map(|(&(stock, product_id), name)| LowStockItem {
                    product_id,
                    name: name.clone(),
                    stock,
                })
                .collect());
        }

        warn!(
            threshold,
            index_threshold = state.indexes.low_stock_threshold,
            "stock predicate not implied by partial index; falling back to full scan"
        );
        let mut rows: Vec<LowStockItem> = state
            .products
            .values()
            .filter(|product| product.stock.is_below(threshold))
            .map(|product| LowStockItem {
                product_id: product.id,
                name: product.name.clone(),
                stock: product.stock,
            })
            .collect();
        rows.sort_by_key(|row| (row.stock, row.product_id));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn category_revenue(&self) -> StoreResult<Vec<CategoryRevenue>> {
        let state = self.shared.state.read();
        live_category_revenue(&state)
    }

    async fn category_revenue_snapshot(&self) -> Arc<RevenueSnapshot> {
        Arc::clone(&self.shared.snapshot.read())
    }

    async fn recent_orders(&self, k: usize) -> StoreResult<Vec<Order>> {
        let state = self.shared.state.read();
        Ok(state
            .indexes
            .orders_by_date
            .range_rev(..)
            .take(k)
            .filter_map(|(_, order_id)| state.orders.get(order_id))
            .cloned()
            .collect())
    }

    async fn search_products(&self, text: &str) -> StoreResult<Vec<Product>> {
        let state = self.shared.state.read();
        Ok(state
            .indexes
            .product_text
            .search(text)
            .iter()
            .filter_map(|product_id| state.products.get(product_id))
            .cloned()
            .collect())
    }

    async fn search_products_substring(&self, text: &str) -> StoreResult<Vec<Product>> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let state = self.shared.state.read();
        let mut rows: Vec<Product> = state
            .products
            .values()
            .filter(|product| {
                product.name.as_ref().to_lowercase().contains(&needle)
                    || product.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|product| product.id);
        Ok(rows)
    }

    async fn recommendations_for(
        &self,
        customer_id: CustomerId,
        k: usize,
    ) -> StoreResult<Vec<Product>> {
        let state = self.shared.state.read();
        if !state.customers.contains_key(&customer_id) {
            return Err(StoreError::not_found(Entity::Customer, customer_id));
        }

        let mut purchased: BTreeSet<ProductId> = BTreeSet::new();
        for (_, order_id) in state
            .indexes
            .orders_by_customer
            .range((customer_id, OrderDate::MIN)..=(customer_id, OrderDate::MAX))
        {
            if let Some(line_ids) = state.lines_by_order.get(order_id) {
                purchased.extend(
                    line_ids
                        .iter()
                        .filter_map(|line_id| state.order_lines.get(line_id))
                        .map(|line| line.product_id),
                );
            }
        }
        if purchased.is_empty() {
            return Ok(Vec::new());
        }

        let categories: BTreeSet<_> = purchased
            .iter()
            .filter_map(|product_id| state.products.get(product_id))
            .map(|product| product.category_id)
            .collect();

        let mut candidates: BTreeSet<ProductId> = BTreeSet::new();
        for category_id in categories {
            candidates.extend(
                state
                    .indexes
                    .products_by_category
                    .get(&category_id)
                    .filter(|product_id| !purchased.contains(*product_id))
                    .copied(),
            );
        }

        // Rank candidates by all-time units sold, from the fact ledger.
        let mut units_sold: BTreeMap<ProductId, u64> = BTreeMap::new();
        for fact in &state.facts {
            if candidates.contains(&fact.product_id) {
                *units_sold.entry(fact.product_id).or_default() +=
                    u64::from(fact.quantity.value());
            }
        }

        let mut ranked: Vec<ProductId> = candidates.into_iter().collect();
        ranked.sort_by(|a, b| {
            let ua = units_sold.get(a).copied().unwrap_or(0);
            let ub = units_sold.get(b).copied().unwrap_or(0);
            ub.cmp(&ua).then_with(|| a.cmp(b))
        });

        Ok(ranked
            .into_iter()
            .take(k)
            .filter_map(|product_id| state.products.get(&product_id).cloned())
            .collect())
    }

    async fn sale_history(&self) -> Vec<SaleFact> {
        self.shared.state.read().facts.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EngineConfig, RecordStore};
    use crate::types::{CategoryName, ProductName};

    async fn store_with_products(stocks: &[u32]) -> RecordStore {
        let store = RecordStore::with_config(EngineConfig {
            low_stock_threshold: 10,
        });
        let category = store
            .catalog()
            .create_category(CategoryName::try_new("Vinyl").unwrap())
            .await
            .unwrap();
        for (i, &stock) in stocks.iter().enumerate() {
            store
                .catalog()
                .create_product(
                    category,
                    ProductName::try_new(format!("LP {i}")).unwrap(),
                    "",
                    Money::from_cents(1999).unwrap(),
                    StockLevel::new(stock),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn low_stock_boundary_is_exclusive_at_threshold() {
        let store = store_with_products(&[9, 10, 11, 0]).await;
        let rows = store.queries().low_stock(usize::MAX).await.unwrap();
        let stocks: Vec<u32> = rows.iter().map(|r| r.stock.value()).collect();
        assert_eq!(stocks, vec![0, 9]);
    }

    #[tokio::test]
    async fn uncovered_stock_predicate_falls_back_to_full_scan() {
        let store = store_with_products(&[9, 10, 11, 50]).await;
        // threshold 12 > index threshold 10: index would miss stock 10/11.
        let rows = store
            .queries()
            .products_below_stock(12, usize::MAX)
            .await
            .unwrap();
        let stocks: Vec<u32> = rows.iter().map(|r| r.stock.value()).collect();
        assert_eq!(stocks, vec![9, 10, 11]);
    }

    #[tokio::test]
    async fn covered_stock_predicate_uses_index() {
        let store = store_with_products(&[9, 5, 10, 3]).await;
        let rows = store
            .queries()
            .products_below_stock(6, usize::MAX)
            .await
            .unwrap();
        let stocks: Vec<u32> = rows.iter().map(|r| r.stock.value()).collect();
        assert_eq!(stocks, vec![3, 5]);
    }

    #[tokio::test]
    async fn empty_search_matches_nothing() {
        let store = store_with_products(&[5]).await;
        assert!(store.queries().search_products("").await.unwrap().is_empty());
        assert!(store
            .queries()
            .search_products_substring("  ")
            .await
            .unwrap()
            .is_empty());
    }
}
