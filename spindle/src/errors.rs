//! Error types for the Spindle storage engine.
//!
//! One taxonomy covers every write-path failure. All errors are synchronous
//! and reported to the caller; the engine never retries a failed write in
//! the background.
//!
//! # Handling strategy
//!
//! - **Validation**: malformed input, rejected before any mutation. Fix the
//!   input and retry.
//! - **NotFound**: a referenced row does not exist, rejected before any
//!   mutation.
//! - **InsufficientStock**: the whole order aborts; no partial reservation
//!   survives. Retry with a smaller quantity or after restocking.
//! - **ConstraintViolation**: duplicate unique key or a delete with live
//!   references; no partial state is left behind.
//! - **ConsistencyFault**: fact derivation failed inside an order
//!   transaction. The transaction rolls back as a whole; an order can never
//!   exist without its sale-history rows, or vice versa.

use crate::types::ProductId;
use thiserror::Error;

/// The kind of row a failed lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// A category row.
    Category,
    /// A product row.
    Product,
    /// A customer row.
    Customer,
    /// An order row.
    Order,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Category => write!(f, "category"),
            Self::Product => write!(f, "product"),
            Self::Customer => write!(f, "customer"),
            Self::Order => write!(f, "order"),
        }
    }
}

/// Errors produced by store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Input failed validation; nothing was mutated.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced row does not exist; nothing was mutated.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Which table the lookup ran against.
        entity: Entity,
        /// The id that missed.
        id: u64,
    },

    /// A stock reservation would drive the counter below zero. The whole
    /// enclosing order aborts and stock is left unchanged.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        /// The product whose counter would underflow.
        product_id: ProductId,
        /// Units the caller asked to reserve.
        requested: u32,
        /// Units actually on hand.
        available: u32,
    },

    /// A uniqueness or referential constraint was violated; no partial
    /// state was left behind.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Sale-fact derivation failed inside an order transaction. Manifests
    /// as a full rollback, never a partial record.
    #[error("fact propagation failed: {0}")]
    ConsistencyFault(String),
}

impl StoreError {
    /// Convenience constructor for a missing row.
    pub(crate) fn not_found(entity: Entity, id: impl Into<u64>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Result alias used throughout the engine.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductId;

    #[test]
    fn display_includes_context() {
        let err = StoreError::not_found(Entity::Product, 7u64);
        assert_eq!(err.to_string(), "product 7 not found");

        let err = StoreError::InsufficientStock {
            product_id: ProductId::try_new(3).unwrap(),
            requested: 10,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for product 3: requested 10, available 2"
        );
    }

    #[test]
    fn errors_are_comparable() {
        assert_eq!(
            StoreError::Validation("x".to_string()),
            StoreError::Validation("x".to_string())
        );
        assert_ne!(
            StoreError::Validation("x".to_string()),
            StoreError::ConstraintViolation("x".to_string())
        );
    }
}
