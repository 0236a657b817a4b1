//! Spindle - single-node storage engine for a record-shop storefront.
//!
//! The engine exposes transactional writes to a normalized order model,
//! synchronous propagation of every committed order line into an immutable
//! sale-history fact, a secondary-index layer (ordered, covering, partial,
//! inverted-text) whose maintenance is atomic with the base-row write, and
//! per-product row locks serializing concurrent mutation of an inventory
//! counter.
//!
//! The write and read surfaces are plain function calls: network, auth and
//! presentation layers are external collaborators.
//!
//! # Example
//!
//! ```rust,ignore
//! use spindle::{LineSpec, RecordStore, StorefrontReads};
//!
//! let store = RecordStore::new();
//! let category = store.catalog().create_category(name).await?;
//! let product = store
//!     .catalog()
//!     .create_product(category, title, "", price, stock)
//!     .await?;
//! let order = store
//!     .orders()
//!     .place_order(customer, date, vec![LineSpec::new(product, qty, price)])
//!     .await?;
//! let report = store.queries().daily_revenue(date).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

pub mod catalog;
pub mod customer;
pub mod errors;
pub mod fact;
pub mod index;
pub mod order;
pub mod query;
pub mod snapshot;
pub mod store;
pub mod types;

pub use catalog::{CatalogStore, Category, Product};
pub use customer::{Customer, CustomerStore};
pub use errors::{Entity, StoreError, StoreResult};
pub use fact::SaleFact;
pub use order::{LineSpec, Order, OrderEngine, OrderLine};
pub use query::{CustomerSpend, LowStockItem, QueryRouter, StorefrontReads, TopSeller};
pub use snapshot::{CategoryRevenue, RevenueSnapshot};
pub use store::{EngineConfig, RecordStore};
pub use types::{
    CategoryId, CategoryName, CustomerId, EmailAddress, FactId, Money, OrderDate, OrderId,
    OrderLineId, PasswordHash, PersonName, ProductId, ProductName, Quantity, StockLevel, Timestamp,
};
