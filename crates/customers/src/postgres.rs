//! PostgreSQL-backed directory store.

use async_trait::async_trait;
use common::{CustomerId, Page};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::CustomerError;
use crate::model::{Customer, CustomerUpdate, NewCustomer};
use crate::store::CustomerStore;

/// PostgreSQL implementation of [`CustomerStore`].
#[derive(Clone)]
pub struct PostgresCustomerStore {
    pool: PgPool,
}

impl PostgresCustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_customer(row: &PgRow) -> Result<Customer, CustomerError> {
        Ok(Customer {
            id: CustomerId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
        })
    }

    fn map_insert_error(e: sqlx::Error) -> CustomerError {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.constraint() == Some("customers_email_key")
        {
            return CustomerError::DuplicateEmail;
        }
        CustomerError::Database(e)
    }
}

#[async_trait]
impl CustomerStore for PostgresCustomerStore {
    async fn create(&self, new: NewCustomer) -> Result<Customer, CustomerError> {
        let row = sqlx::query(
            r#"
            INSERT INTO customers (name, email, phone)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, phone
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_insert_error)?;

        Self::row_to_customer(&row)
    }

    async fn get(&self, id: CustomerId) -> Result<Option<Customer>, CustomerError> {
        let row = sqlx::query(
            "SELECT id, name, email, phone FROM customers WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    async fn update(
        &self,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> Result<Option<Customer>, CustomerError> {
        if update.is_empty() {
            return self.get(id).await;
        }

        let row = sqlx::query(
            r#"
            UPDATE customers
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone)
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, email, phone
            "#,
        )
        .bind(id.get())
        .bind(&update.name)
        .bind(&update.email)
        .bind(&update.phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_insert_error)?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    async fn delete(&self, id: CustomerId) -> Result<bool, CustomerError> {
        let result = sqlx::query(
            "UPDATE customers SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        search: Option<String>,
        cursor: Option<i64>,
        limit: usize,
    ) -> Result<Page<Customer>, CustomerError> {
        let mut sql = String::from(
            "SELECT id, name, email, phone FROM customers WHERE deleted_at IS NULL",
        );
        let mut param_count = 0;

        if search.is_some() {
            param_count += 1;
            sql.push_str(&format!(
                " AND (name ILIKE ${param_count} OR email ILIKE ${param_count})"
            ));
        }
        if cursor.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND id > ${param_count}"));
        }

        param_count += 1;
        sql.push_str(&format!(" ORDER BY id ASC LIMIT ${param_count}"));

        let mut query = sqlx::query(&sql);
        if let Some(s) = &search {
            query = query.bind(format!("%{s}%"));
        }
        if let Some(c) = cursor {
            query = query.bind(c);
        }
        query = query.bind((limit + 1) as i64);

        let rows = query.fetch_all(&self.pool).await?;
        let customers = rows
            .iter()
            .map(Self::row_to_customer)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::from_rows(customers, limit, |c| c.id.get()))
    }
}
