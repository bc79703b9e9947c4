//! PostgreSQL-backed idempotency store.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::IdempotencyError;
use crate::model::{IdempotencyRecord, KeyStatus, StoredResponse};
use crate::store::IdempotencyStore;

/// PostgreSQL implementation of [`IdempotencyStore`].
///
/// The primary key on `idempotency_keys.key` provides the atomic
/// insert-or-conflict semantics required by the contract.
#[derive(Clone)]
pub struct PostgresIdempotencyStore {
    pool: PgPool,
}

impl PostgresIdempotencyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &PgRow) -> Result<IdempotencyRecord, IdempotencyError> {
        let status_str: String = row.try_get("status")?;
        let status = KeyStatus::from_str(&status_str)
            .map_err(|e| IdempotencyError::Serialization(<serde_json::Error as serde::de::Error>::custom(e)))?;

        let response = row
            .try_get::<Option<serde_json::Value>, _>("response_body")?
            .map(serde_json::from_value::<StoredResponse>)
            .transpose()?;

        Ok(IdempotencyRecord {
            key: row.try_get("key")?,
            target_type: row.try_get("target_type")?,
            target_id: row.try_get("target_id")?,
            status,
            response,
        })
    }
}

#[async_trait]
impl IdempotencyStore for PostgresIdempotencyStore {
    async fn find(&self, key: &str) -> Result<Option<IdempotencyRecord>, IdempotencyError> {
        let row = sqlx::query(
            r#"
            SELECT key, target_type, target_id, status, response_body
            FROM idempotency_keys
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn insert_processing(
        &self,
        key: &str,
        target_type: &str,
        target_id: i64,
    ) -> Result<(), IdempotencyError> {
        sqlx::query(
            r#"
            INSERT INTO idempotency_keys (key, target_type, target_id, status)
            VALUES ($1, $2, $3, 'processing')
            "#,
        )
        .bind(key)
        .bind(target_type)
        .bind(target_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("idempotency_keys_pkey")
            {
                return IdempotencyError::DuplicateKey;
            }
            IdempotencyError::Database(e)
        })?;

        Ok(())
    }

    async fn complete(
        &self,
        key: &str,
        response: &StoredResponse,
    ) -> Result<(), IdempotencyError> {
        let body = serde_json::to_value(response)?;

        sqlx::query(
            r#"
            UPDATE idempotency_keys
            SET status = 'completed', response_body = $2
            WHERE key = $1
            "#,
        )
        .bind(key)
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
