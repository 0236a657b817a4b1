//! Order engine: atomic order placement.
//!
//! `place_order` is the single write path for orders, order lines, stock
//! reservations, and sale-history facts. The whole set commits or none of
//! it does:
//!
//! 1. validate input and referenced rows,
//! 2. acquire row locks for the distinct products, ascending by id,
//! 3. check every line's stock under those locks,
//! 4. compute the order total,
//! 5. derive one sale fact per line,
//! 6. commit stock, order, lines, facts, and index entries in one
//!    critical section.
//!
//! Steps 1–5 mutate nothing, so any failure is a clean abort. Stock
//! checked in step 3 cannot move before step 6 because every stock writer
//! takes the row lock first.

use crate::errors::{Entity, StoreError, StoreResult};
use crate::fact::derive_fact;
use crate::store::SharedState;
use crate::types::{
    CustomerId, Money, OrderDate, OrderId, OrderLineId, ProductId, Quantity, StockLevel,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// An order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique, immutable identifier.
    pub id: OrderId,
    /// Customer who placed the order.
    pub customer_id: CustomerId,
    /// Calendar date the order was placed on.
    pub order_date: OrderDate,
    /// Exact sum of the line totals at commit time.
    pub total_amount: Money,
}

/// An order line row. The same product may appear on several lines of one
/// order; each is a separate row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Unique, immutable identifier.
    pub id: OrderLineId,
    /// Containing order.
    pub order_id: OrderId,
    /// Product sold.
    pub product_id: ProductId,
    /// Units sold, strictly positive.
    pub quantity: Quantity,
    /// Unit price at order time, strictly positive.
    pub unit_price: Money,
}

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpec {
    /// Product to sell.
    pub product_id: ProductId,
    /// Units requested.
    pub quantity: Quantity,
    /// Unit price to charge.
    pub unit_price: Money,
}

impl LineSpec {
    /// Creates a line spec.
    pub const fn new(product_id: ProductId, quantity: Quantity, unit_price: Money) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
        }
    }
}

/// Handle to the order engine. Cloning shares the underlying storage.
#[derive(Clone)]
pub struct OrderEngine {
    shared: Arc<SharedState>,
}

impl OrderEngine {
    pub(crate) const fn new(shared: Arc<SharedState>) -> Self {
        Self { shared }
    }

    /// Places an order: reserves stock for every line, persists the order
    /// and its lines, and appends one sale fact per line, all atomically.
    ///
    /// On any failure the store is exactly as it was before the call: no
    /// order, no lines, no facts, no stock movement.
    #[instrument(skip(self, lines), fields(%customer_id, %order_date, line_count = lines.len()))]
    pub async fn place_order(
        &self,
        customer_id: CustomerId,
        order_date: OrderDate,
        lines: Vec<LineSpec>,
    ) -> StoreResult<OrderId> {
        if lines.is_empty() {
            return Err(StoreError::Validation(
                "order must contain at least one line".to_string(),
            ));
        }
        for spec in &lines {
            // Quantity positivity is carried by the type; unit price is
            // checked here because Money permits zero for aggregates.
            if spec.unit_price.is_zero() {
                return Err(StoreError::Validation(format!(
                    "unit price for product {} must be greater than 0",
                    spec.product_id
                )));
            }
        }

        // Units requested per distinct product; a product listed on several
        // lines must be covered by stock in aggregate.
        let mut requested: BTreeMap<ProductId, u64> = BTreeMap::new();
        for spec in &lines {
            *requested.entry(spec.product_id).or_default() += u64::from(spec.quantity.value());
        }

        // Row locks, ascending by product id, held until return.
        let _row_locks = self
            .shared
            .row_locks
            .lock_rows(requested.keys().copied())
            .await;

        // Validation under a read lock. The locked products' stock cannot
        // move beneath us; every stock writer takes the row lock first.
        {
            let state = self.shared.state.read();
            if !state.customers.contains_key(&customer_id) {
                return Err(StoreError::not_found(Entity::Customer, customer_id));
            }
            for (&product_id, &units) in &requested {
                let product = state
                    .products
                    .get(&product_id)
                    .ok_or_else(|| StoreError::not_found(Entity::Product, product_id))?;
                let available = u64::from(product.stock.value());
                if units > available {
                    return Err(StoreError::InsufficientStock {
                        product_id,
                        requested: u32::try_from(units).unwrap_or(u32::MAX),
                        available: product.stock.value(),
                    });
                }
            }
        }

        let mut total = Money::default();
        for spec in &lines {
            let line_total = spec.unit_price.multiply_by_quantity(spec.quantity)?;
            total = total.checked_add(line_total)?;
        }
        if total.is_zero() {
            return Err(StoreError::Validation(
                "order total must be greater than 0".to_string(),
            ));
        }

        // Commit point. Everything below is infallible except fact
        // derivation, which runs before the first mutation.
        let mut guard = self.shared.state.write();
        let state = &mut *guard;

        // The customer may have been deleted between validation and here;
        // re-check so the order table never gains a dangling reference.
        // Products are re-checked too, so nothing below this point can fail
        // with a mutation already applied.
        if !state.customers.contains_key(&customer_id) {
            return Err(StoreError::not_found(Entity::Customer, customer_id));
        }
        for product_id in requested.keys() {
            if !state.products.contains_key(product_id) {
                return Err(StoreError::not_found(Entity::Product, *product_id));
            }
        }

        let order_id = state.allocate_order_id();
        let mut new_lines = Vec::with_capacity(lines.len());
        let mut new_facts = Vec::with_capacity(lines.len());
        for spec in &lines {
            let line = OrderLine {
                id: state.allocate_line_id(),
                order_id,
                product_id: spec.product_id,
                quantity: spec.quantity,
                unit_price: spec.unit_price,
            };
            new_facts.push(derive_fact(order_date, customer_id, &line)?);
            new_lines.push(line);
        }

        for (&product_id, &units) in &requested {
            let product = state
                .products
                .get_mut(&product_id)
                .expect("existence checked at the commit point");
            let old = product.stock;
            // Cannot underflow: checked against current stock above, and
            // the row lock has been held since.
            let next = product.stock.value() - u32::try_from(units).unwrap_or(u32::MAX);
            product.stock = StockLevel::new(next);
            let (id, name, new_stock) = (product.id, product.name.clone(), product.stock);
            state.indexes.product_stock_changed(id, &name, old, new_stock);
        }

        let order = Order {
            id: order_id,
            customer_id,
            order_date,
            total_amount: total,
        };
        state.indexes.index_order(&order);
        state.orders.insert(order_id, order);
        let line_ids: Vec<OrderLineId> = new_lines.iter().map(|line| line.id).collect();
        state.lines_by_order.insert(order_id, line_ids);
        for line in new_lines {
            state.order_lines.insert(line.id, line);
        }
        state.facts.extend(new_facts);

        info!(%order_id, %total, "order committed");
        Ok(order_id)
    }

    /// Fetches an order by id.
    pub async fn get_order(&self, id: OrderId) -> StoreResult<Order> {
        self.shared
            .state
            .read()
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::Order, id))
    }

    /// Fetches an order's lines, in line-id order.
    pub async fn get_order_lines(&self, id: OrderId) -> StoreResult<Vec<OrderLine>> {
        let state = self.shared.state.read();
        let line_ids = state
            .lines_by_order
            .get(&id)
            .ok_or_else(|| StoreError::not_found(Entity::Order, id))?;
        Ok(line_ids
            .iter()
            .filter_map(|line_id| state.order_lines.get(line_id))
            .cloned()
            .collect())
    }
}
