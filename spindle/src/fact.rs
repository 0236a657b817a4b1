//! Sale-history fact propagation.
//!
//! Every committed order line yields exactly one [`SaleFact`]: a
//! write-once ledger row capturing the line as it was at commit time, for
//! historical analytics independent of later mutation to the live tables.
//! Facts are never updated or deleted.
//!
//! Propagation is an explicit call from the order engine inside the order
//! transaction, not hidden event wiring: derivation runs before the commit
//! point, so a derivation failure aborts the whole transaction and the
//! ledger can never diverge from the transactional tables. Nothing is
//! retried asynchronously.

use crate::errors::{StoreError, StoreResult};
use crate::order::OrderLine;
use crate::types::{CustomerId, FactId, Money, OrderDate, ProductId, Quantity};
use serde::{Deserialize, Serialize};

/// An immutable sale-history record, one per committed order line.
///
/// `total_amount` is the line total (`quantity × unit_price`) at commit
/// time; it is recorded here for point-in-time auditability and stays
/// fixed even if the live order data were ever to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFact {
    /// Time-ordered ledger id (UUIDv7).
    pub id: FactId,
    /// Date of the containing order.
    pub order_date: OrderDate,
    /// Customer who placed the order.
    pub customer_id: CustomerId,
    /// Product sold.
    pub product_id: ProductId,
    /// Line total at commit time.
    pub total_amount: Money,
    /// Units sold on the line.
    pub quantity: Quantity,
}

/// Derives the fact for one order line.
///
/// Called exactly once per line, inside the line's own transaction, before
/// any table is mutated. A failure here is a [`StoreError::ConsistencyFault`]
/// and aborts the enclosing order wholesale.
pub(crate) fn derive_fact(
    order_date: OrderDate,
    customer_id: CustomerId,
    line: &OrderLine,
) -> StoreResult<SaleFact> {
    let total_amount = line
        .unit_price
        .multiply_by_quantity(line.quantity)
        .map_err(|err| StoreError::ConsistencyFault(err.to_string()))?;
    Ok(SaleFact {
        id: FactId::new(),
        order_date,
        customer_id,
        product_id: line.product_id,
        total_amount,
        quantity: line.quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderId, OrderLineId};

    fn line(qty: u32, unit_cents: u64) -> OrderLine {
        OrderLine {
            id: OrderLineId::try_new(1).unwrap(),
            order_id: OrderId::try_new(1).unwrap(),
            product_id: ProductId::try_new(7).unwrap(),
            quantity: Quantity::new(qty).unwrap(),
            unit_price: Money::from_cents(unit_cents).unwrap(),
        }
    }

    #[test]
    fn fact_records_line_total() {
        let date = OrderDate::from_ymd(2025, 6, 1).unwrap();
        let customer = CustomerId::try_new(3).unwrap();
        let fact = derive_fact(date, customer, &line(3, 10_000)).unwrap();

        assert_eq!(fact.order_date, date);
        assert_eq!(fact.customer_id, customer);
        assert_eq!(fact.total_amount.to_cents(), 30_000);
        assert_eq!(fact.quantity.value(), 3);
    }

    #[test]
    fn each_fact_gets_a_distinct_id() {
        let date = OrderDate::from_ymd(2025, 6, 1).unwrap();
        let customer = CustomerId::try_new(3).unwrap();
        let a = derive_fact(date, customer, &line(1, 100)).unwrap();
        let b = derive_fact(date, customer, &line(1, 100)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn oversized_line_total_is_a_consistency_fault() {
        // 1000 × $99,999,999.99 exceeds Money::MAX_AMOUNT.
        let date = OrderDate::from_ymd(2025, 6, 1).unwrap();
        let customer = CustomerId::try_new(3).unwrap();
        let err = derive_fact(date, customer, &line(1000, 9_999_999_999)).unwrap_err();
        assert!(matches!(err, StoreError::ConsistencyFault(_)));
    }
}
