//! Secondary-index layer.
//!
//! Four index kinds, each picked for a declared query shape:
//!
//! - [`OrderedIndex`] — equality and range lookups returning rows already
//!   sorted, enabling streaming aggregation and backward top-K traversal.
//! - [`CoveringIndex`] — key plus included payload; answers a
//!   predicate-and-project query without touching the base row.
//! - [`PartialIndex`] — built only over rows matching a fixed predicate;
//!   valid only for queries whose predicate is implied by it.
//! - [`InvertedIndex`] — normalized token postings for containment search.
//!
//! Every index is maintained synchronously, inside the same critical
//! section as the base-row write; a reader can never observe a row whose
//! index entries have not been created yet.

pub mod covering;
pub mod inverted;
pub mod ordered;
pub mod partial;

pub use covering::CoveringIndex;
pub use inverted::{tokenize, InvertedIndex};
pub use ordered::OrderedIndex;
pub use partial::PartialIndex;

use crate::catalog::Product;
use crate::order::Order;
use crate::types::{CategoryId, CustomerId, OrderDate, OrderId, ProductId, ProductName, StockLevel};

/// The engine's concrete index set.
///
/// Declared mapping from query shape to access path (there is no cost
/// model; the query set is closed and known):
///
/// | query shape                  | index                                  |
/// |------------------------------|----------------------------------------|
/// | daily revenue                | `orders_by_date` equality probe        |
/// | monthly top sellers          | `orders_by_date` range scan            |
/// | recent orders (top-K)        | `orders_by_date` backward, stop at K   |
/// | per-customer spend window    | `orders_by_customer` range scan        |
/// | category listing / roll-up   | `products_by_category` equality probe  |
/// | low-stock listing            | `low_stock` partial covering scan      |
/// | free-text product search     | `product_text` postings intersection   |
#[derive(Debug)]
pub(crate) struct Indexes {
    /// Ordered index on `Order::order_date`.
    pub orders_by_date: OrderedIndex<OrderDate, OrderId>,
    /// Composite ordered index on `(Order::customer_id, Order::order_date)`.
    pub orders_by_customer: OrderedIndex<(CustomerId, OrderDate), OrderId>,
    /// Ordered index on `Product::category_id`.
    pub products_by_category: OrderedIndex<CategoryId, ProductId>,
    /// Partial covering index: rows with `stock < low_stock_threshold`,
    /// keyed `(stock, product_id)`, carrying the product name as payload.
    pub low_stock: PartialIndex<(StockLevel, ProductId), ProductName>,
    /// The fixed predicate threshold `low_stock` was built with.
    pub low_stock_threshold: u32,
    /// Inverted index over product name + description tokens.
    pub product_text: InvertedIndex<ProductId>,
}

impl Indexes {
    /// Creates the index set with the given low-stock predicate threshold.
    pub fn new(low_stock_threshold: u32) -> Self {
        Self {
            orders_by_date: OrderedIndex::new(),
            orders_by_customer: OrderedIndex::new(),
            products_by_category: OrderedIndex::new(),
            low_stock: PartialIndex::new(move |key: &(StockLevel, ProductId)| {
                key.0.is_below(low_stock_threshold)
            }),
            low_stock_threshold,
            product_text: InvertedIndex::new(),
        }
    }

    /// Whether the partial index can serve a `stock < threshold` query:
    /// the query predicate must be implied by the index predicate.
    pub fn covers_stock_below(&self, threshold: u32) -> bool {
        threshold <= self.low_stock_threshold
    }

    /// Indexes a newly created product in every product index.
    pub fn index_product(&mut self, product: &Product) {
        self.products_by_category
            .insert(product.category_id, product.id);
        self.low_stock
            .upsert((product.stock, product.id), product.name.clone());
        self.product_text
            .index_row(product.id, &[product.name.as_ref(), &product.description]);
    }

    /// Moves a product between stock buckets after a counter change.
    pub fn product_stock_changed(
        &mut self,
        id: ProductId,
        name: &ProductName,
        old: StockLevel,
        new: StockLevel,
    ) {
        if old == new {
            return;
        }
        self.low_stock.remove(&(old, id));
        self.low_stock.upsert((new, id), name.clone());
    }

    /// Indexes a newly committed order.
    pub fn index_order(&mut self, order: &Order) {
        self.orders_by_date.insert(order.order_date, order.id);
        self.orders_by_customer
            .insert((order.customer_id, order.order_date), order.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryId, Money, ProductName};

    fn product(id: u64, stock: u32) -> Product {
        Product {
            id: ProductId::try_new(id).unwrap(),
            category_id: CategoryId::try_new(1).unwrap(),
            name: ProductName::try_new(format!("LP {id}")).unwrap(),
            description: "heavyweight pressing".to_string(),
            price: Money::from_cents(1999).unwrap(),
            stock: StockLevel::new(stock),
        }
    }

    #[test]
    fn low_stock_membership_tracks_counter_changes() {
        let mut indexes = Indexes::new(10);
        let p = product(1, 12);
        indexes.index_product(&p);
        assert!(indexes.low_stock.is_empty());

        indexes.product_stock_changed(p.id, &p.name, StockLevel::new(12), StockLevel::new(9));
        assert_eq!(indexes.low_stock.len(), 1);

        indexes.product_stock_changed(p.id, &p.name, StockLevel::new(9), StockLevel::new(10));
        assert!(indexes.low_stock.is_empty());
    }

    #[test]
    fn coverage_check_requires_implied_predicate() {
        let indexes = Indexes::new(10);
        assert!(indexes.covers_stock_below(10));
        assert!(indexes.covers_stock_below(5));
        assert!(!indexes.covers_stock_below(11));
    }

    #[test]
    fn product_text_finds_description_tokens() {
        let mut indexes = Indexes::new(10);
        indexes.index_product(&product(3, 4));
        assert!(indexes.product_text.search("heavyweight").contains(&ProductId::try_new(3).unwrap()));
    }
}
