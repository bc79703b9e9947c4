//! The idempotency coordinator.

use crate::error::IdempotencyError;
use crate::model::{KeyStatus, StoredResponse};
use crate::store::IdempotencyStore;

/// Wraps a state-changing operation so it executes at most once per key.
///
/// The wrapped operation is modeled as a plain async closure returning an
/// explicit [`StoredResponse`] rather than an intercepted output stream, so
/// the coordinator can persist exactly what the caller saw without coupling
/// to any I/O framework.
pub struct IdempotencyCoordinator<S> {
    store: S,
}

impl<S: IdempotencyStore> IdempotencyCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Conflict outcome returned while a duplicate is in flight, or when a
    /// racing insert loses the unique-constraint race.
    fn in_flight_conflict() -> StoredResponse {
        metrics::counter!("idempotency_conflicts_total").increment(1);
        StoredResponse::new(
            409,
            serde_json::json!({
                "status": "error",
                "code": "IDEMPOTENCY_IN_FLIGHT",
                "message": "a request with this idempotency key is already being processed",
            }),
        )
    }

    /// Executes `op` under the key's state machine.
    ///
    /// - completed key: the stored response is replayed verbatim; `op` is
    ///   not invoked.
    /// - processing key (or a lost insert race): a 409 conflict outcome.
    /// - absent key: `op` runs once and its response, business failures
    ///   included, is persisted as the key's final outcome.
    ///
    /// Errors are infrastructure failures only; every business outcome is a
    /// `StoredResponse`.
    #[tracing::instrument(skip(self, op), fields(key = %key, target_type = %target_type))]
    pub async fn execute<F, Fut>(
        &self,
        key: &str,
        target_type: &str,
        target_id: i64,
        op: F,
    ) -> Result<StoredResponse, IdempotencyError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoredResponse> + Send,
    {
        if let Some(record) = self.store.find(key).await? {
            return match record.status {
                KeyStatus::Completed => match record.response {
                    Some(response) => {
                        metrics::counter!("idempotent_replays_total").increment(1);
                        tracing::info!(status = response.status_code, "replaying stored response");
                        Ok(response)
                    }
                    None => {
                        // Completed without a body should be unreachable;
                        // surface rather than re-run the operation.
                        tracing::error!("completed idempotency key has no stored response");
                        Ok(StoredResponse::new(
                            500,
                            serde_json::json!({
                                "status": "error",
                                "message": "stored response missing",
                            }),
                        ))
                    }
                },
                KeyStatus::Processing => Ok(Self::in_flight_conflict()),
            };
        }

        // The lookup above and this insert are not atomic; the unique
        // constraint on the key decides the race.
        match self.store.insert_processing(key, target_type, target_id).await {
            Ok(()) => {}
            Err(IdempotencyError::DuplicateKey) => return Ok(Self::in_flight_conflict()),
            Err(e) => return Err(e),
        }

        let response = op().await;
        self.store.complete(key, &response).await?;
        Ok(response)
    }
}
