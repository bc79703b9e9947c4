//! Directory storage contract and the in-memory implementation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{CustomerId, Page};

use crate::directory::CustomerDirectory;
use crate::error::CustomerError;
use crate::model::{Customer, CustomerUpdate, NewCustomer};

/// Storage behind the `customers-api` CRUD surface.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn create(&self, new: NewCustomer) -> Result<Customer, CustomerError>;

    async fn get(&self, id: CustomerId) -> Result<Option<Customer>, CustomerError>;

    /// Applies a partial update. Returns `None` if the customer does not exist.
    async fn update(
        &self,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> Result<Option<Customer>, CustomerError>;

    /// Soft-deletes a customer. Returns whether a live row was deleted.
    async fn delete(&self, id: CustomerId) -> Result<bool, CustomerError>;

    async fn list(
        &self,
        search: Option<String>,
        cursor: Option<i64>,
        limit: usize,
    ) -> Result<Page<Customer>, CustomerError>;
}

#[derive(Debug, Default)]
struct State {
    customers: BTreeMap<i64, Customer>,
    deleted: Vec<i64>,
    next_id: i64,
    unavailable: bool,
}

/// In-memory directory for tests. Implements both the storage contract and
/// the cross-service [`CustomerDirectory`] contract.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a customer with a fixed id, bypassing the CRUD path.
    pub fn insert(&self, customer: Customer) {
        let mut state = self.state.lock().unwrap();
        state.next_id = state.next_id.max(customer.id.get());
        state.customers.insert(customer.id.get(), customer);
    }

    /// Makes every directory lookup fail as if the service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn create(&self, new: NewCustomer) -> Result<Customer, CustomerError> {
        let mut state = self.state.lock().unwrap();
        if state.customers.values().any(|c| c.email == new.email) {
            return Err(CustomerError::DuplicateEmail);
        }
        state.next_id += 1;
        let customer = Customer {
            id: CustomerId::new(state.next_id),
            name: new.name,
            email: new.email,
            phone: new.phone,
        };
        state.customers.insert(customer.id.get(), customer.clone());
        Ok(customer)
    }

    async fn get(&self, id: CustomerId) -> Result<Option<Customer>, CustomerError> {
        let state = self.state.lock().unwrap();
        Ok(state.customers.get(&id.get()).cloned())
    }

    async fn update(
        &self,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> Result<Option<Customer>, CustomerError> {
        let mut state = self.state.lock().unwrap();
        if let Some(email) = &update.email
            && state
                .customers
                .values()
                .any(|c| c.email == *email && c.id != id)
        {
            return Err(CustomerError::DuplicateEmail);
        }
        let Some(customer) = state.customers.get_mut(&id.get()) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            customer.name = name;
        }
        if let Some(email) = update.email {
            customer.email = email;
        }
        if let Some(phone) = update.phone {
            customer.phone = Some(phone);
        }
        Ok(Some(customer.clone()))
    }

    async fn delete(&self, id: CustomerId) -> Result<bool, CustomerError> {
        let mut state = self.state.lock().unwrap();
        let removed = state.customers.remove(&id.get()).is_some();
        if removed {
            state.deleted.push(id.get());
        }
        Ok(removed)
    }

    async fn list(
        &self,
        search: Option<String>,
        cursor: Option<i64>,
        limit: usize,
    ) -> Result<Page<Customer>, CustomerError> {
        let state = self.state.lock().unwrap();
        let rows: Vec<Customer> = state
            .customers
            .values()
            .filter(|c| cursor.is_none_or(|cur| c.id.get() > cur))
            .filter(|c| {
                search
                    .as_deref()
                    .is_none_or(|s| c.name.contains(s) || c.email.contains(s))
            })
            .take(limit + 1)
            .cloned()
            .collect();
        Ok(Page::from_rows(rows, limit, |c| c.id.get()))
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryCustomerStore {
    async fn find(&self, id: CustomerId) -> Result<Option<Customer>, CustomerError> {
        {
            let state = self.state.lock().unwrap();
            if state.unavailable {
                return Err(CustomerError::Unavailable { status: 500 });
            }
        }
        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_customer(name: &str, email: &str) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let store = InMemoryCustomerStore::new();
        let a = store.create(new_customer("Ana", "ana@test.dev")).await.unwrap();
        let b = store.create(new_customer("Bo", "bo@test.dev")).await.unwrap();
        assert_eq!(a.id.get() + 1, b.id.get());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryCustomerStore::new();
        store.create(new_customer("Ana", "ana@test.dev")).await.unwrap();
        let result = store.create(new_customer("Ana2", "ana@test.dev")).await;
        assert!(matches!(result, Err(CustomerError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn delete_hides_customer_from_lookups() {
        let store = InMemoryCustomerStore::new();
        let ana = store.create(new_customer("Ana", "ana@test.dev")).await.unwrap();
        assert!(store.delete(ana.id).await.unwrap());
        assert!(store.get(ana.id).await.unwrap().is_none());
        assert!(store.find(ana.id).await.unwrap().is_none());
        // Second delete is a no-op
        assert!(!store.delete(ana.id).await.unwrap());
    }

    #[tokio::test]
    async fn unavailable_hook_fails_directory_lookups_only() {
        let store = InMemoryCustomerStore::new();
        let ana = store.create(new_customer("Ana", "ana@test.dev")).await.unwrap();
        store.set_unavailable(true);
        assert!(store.find(ana.id).await.is_err());
        assert!(store.get(ana.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_paginates_by_cursor() {
        let store = InMemoryCustomerStore::new();
        for i in 0..5 {
            store
                .create(new_customer("C", &format!("c{i}@test.dev")))
                .await
                .unwrap();
        }

        let first = store.list(None, None, 2).await.unwrap();
        assert_eq!(first.data.len(), 2);
        let cursor = first.next_cursor.unwrap();

        let second = store.list(None, Some(cursor), 2).await.unwrap();
        assert_eq!(second.data.len(), 2);
        assert!(second.data.iter().all(|c| c.id.get() > cursor));
    }
}
