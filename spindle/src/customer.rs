//! Customer store.
//!
//! Identity records only; authentication is an external collaborator and
//! the password hash is carried as an opaque value.

use crate::errors::{Entity, StoreError, StoreResult};
use crate::store::SharedState;
use crate::types::{CustomerId, EmailAddress, OrderDate, PasswordHash, PersonName};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A customer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Unique, immutable identifier.
    pub id: CustomerId,
    /// Given name.
    pub first_name: PersonName,
    /// Family name.
    pub last_name: PersonName,
    /// Unique email address (lowercased at construction).
    pub email: EmailAddress,
    /// Opaque password hash; never interpreted by the engine.
    pub password_hash: PasswordHash,
}

/// Handle to the customer table. Cloning shares the underlying storage.
#[derive(Clone)]
pub struct CustomerStore {
    shared: Arc<SharedState>,
}

impl CustomerStore {
    pub(crate) const fn new(shared: Arc<SharedState>) -> Self {
        Self { shared }
    }

    /// Creates a customer and returns its id.
    ///
    /// The email must be unique across all customers; since `EmailAddress`
    /// lowercases at construction, the check is case-insensitive. A
    /// duplicate leaves no partial state behind.
    pub async fn create_customer(
        &self,
        first_name: PersonName,
        last_name: PersonName,
        email: EmailAddress,
        password_hash: PasswordHash,
    ) -> StoreResult<CustomerId> {
        let mut guard = self.shared.state.write();
        let state = &mut *guard;
        if state.email_directory.contains_key(&email) {
            return Err(StoreError::ConstraintViolation(format!(
                "email {email} is already registered"
            )));
        }
        let id = state.allocate_customer_id();
        state.email_directory.insert(email.clone(), id);
        state.customers.insert(
            id,
            Customer {
                id,
                first_name,
                last_name,
                email,
                password_hash,
            },
        );
        Ok(id)
    }

    /// Fetches a customer by id.
    pub async fn get_customer(&self, id: CustomerId) -> StoreResult<Customer> {
        self.shared
            .state
            .read()
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::Customer, id))
    }

    /// Looks a customer up by email address.
    pub async fn find_by_email(&self, email: &EmailAddress) -> Option<Customer> {
        let state = self.shared.state.read();
        let id = state.email_directory.get(email)?;
        state.customers.get(id).cloned()
    }

    /// Deletes a customer. Rejected with `ConstraintViolation` while any
    /// order still references them.
    pub async fn delete_customer(&self, id: CustomerId) -> StoreResult<()> {
        let mut guard = self.shared.state.write();
        let state = &mut *guard;
        let Some(customer) = state.customers.get(&id) else {
            return Err(StoreError::not_found(Entity::Customer, id));
        };
        let has_orders = state
            .indexes
            .orders_by_customer
            .range((id, OrderDate::MIN)..=(id, OrderDate::MAX))
            .next()
            .is_some();
        if has_orders {
            return Err(StoreError::ConstraintViolation(format!(
                "customer {id} still has orders"
            )));
        }
        let email = customer.email.clone();
        state.email_directory.remove(&email);
        state.customers.remove(&id);
        Ok(())
    }
}
