use async_trait::async_trait;

use crate::error::IdempotencyError;
use crate::model::{IdempotencyRecord, StoredResponse};

/// Storage contract for idempotency records.
///
/// `insert_processing` must be atomic with respect to concurrent inserts of
/// the same key: exactly one caller succeeds, every other caller gets
/// [`IdempotencyError::DuplicateKey`]. The lookup-then-insert sequence in the
/// coordinator is not atomic, so this is the actual serialization point.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn find(&self, key: &str) -> Result<Option<IdempotencyRecord>, IdempotencyError>;

    async fn insert_processing(
        &self,
        key: &str,
        target_type: &str,
        target_id: i64,
    ) -> Result<(), IdempotencyError>;

    /// Transitions the key to `completed`, storing the captured response.
    async fn complete(
        &self,
        key: &str,
        response: &StoredResponse,
    ) -> Result<(), IdempotencyError>;
}
