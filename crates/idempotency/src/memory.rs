//! In-memory idempotency store for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::IdempotencyError;
use crate::model::{IdempotencyRecord, KeyStatus, StoredResponse};
use crate::store::IdempotencyStore;

/// In-memory implementation of [`IdempotencyStore`].
///
/// The mutex around the map gives `insert_processing` the same
/// exactly-one-winner semantics as the Postgres unique constraint.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdempotencyStore {
    records: Arc<Mutex<HashMap<String, IdempotencyRecord>>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    pub fn key_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn find(&self, key: &str) -> Result<Option<IdempotencyRecord>, IdempotencyError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn insert_processing(
        &self,
        key: &str,
        target_type: &str,
        target_id: i64,
    ) -> Result<(), IdempotencyError> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(key) {
            return Err(IdempotencyError::DuplicateKey);
        }
        records.insert(
            key.to_string(),
            IdempotencyRecord {
                key: key.to_string(),
                target_type: target_type.to_string(),
                target_id,
                status: KeyStatus::Processing,
                response: None,
            },
        );
        Ok(())
    }

    async fn complete(
        &self,
        key: &str,
        response: &StoredResponse,
    ) -> Result<(), IdempotencyError> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.get_mut(key) {
            record.status = KeyStatus::Completed;
            record.response = Some(response.clone());
        }
        Ok(())
    }
}
