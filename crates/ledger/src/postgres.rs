//! PostgreSQL-backed ledger with row-locking transactions.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerId, OrderId, Page, ProductId};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::error::LedgerError;
use crate::model::{
    NewOrderItem, NewProduct, Order, OrderFilter, OrderItem, OrderStatus, OrderWithItems, Product,
};
use crate::store::{CANCEL_WINDOW, LedgerStore};

/// PostgreSQL implementation of [`LedgerStore`].
///
/// The pooled connection is acquired per operation via `pool.begin()` and
/// released on every exit path: an early `?` drops the transaction, which
/// rolls it back and returns the connection.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_product(row: &PgRow) -> Result<Product, LedgerError> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            price_cents: row.try_get("price_cents")?,
            stock: row.try_get("stock")?,
        })
    }

    fn row_to_order(row: &PgRow) -> Result<Order, LedgerError> {
        let status_str: String = row.try_get("status")?;
        let status = OrderStatus::from_str(&status_str)
            .map_err(|e| LedgerError::Validation(format!("corrupt order row: {e}")))?;

        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            customer_id: CustomerId::new(row.try_get("customer_id")?),
            status,
            total_cents: row.try_get("total_cents")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem, LedgerError> {
        Ok(OrderItem {
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            qty: row.try_get("qty")?,
            unit_price_cents: row.try_get("unit_price_cents")?,
            subtotal_cents: row.try_get("subtotal_cents")?,
        })
    }

    /// Locks the order row for the remainder of the transaction.
    async fn lock_order(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
    ) -> Result<Order, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, status, total_cents, created_at
            FROM orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(order_id.get())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(LedgerError::OrderNotFound(order_id))?;

        Self::row_to_order(&row)
    }

    async fn items_for_order(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
    ) -> Result<Vec<OrderItem>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, qty, unit_price_cents, subtotal_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.get())
        .fetch_all(&mut **tx)
        .await?;

        rows.iter().map(Self::row_to_item).collect()
    }
}

#[async_trait]
impl LedgerStore for PostgresLedger {
    #[tracing::instrument(skip(self, items), fields(customer_id = %customer_id))]
    async fn create_order(
        &self,
        customer_id: CustomerId,
        items: &[NewOrderItem],
    ) -> Result<OrderWithItems, LedgerError> {
        let mut tx = self.pool.begin().await?;

        // One locking read covering all referenced products. Acquiring the
        // locks in a single statement avoids lock-ordering deadlocks between
        // two concurrently created orders sharing products.
        let mut product_ids: Vec<i64> = items.iter().map(|i| i.product_id.get()).collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        let rows = sqlx::query(
            "SELECT id, sku, name, price_cents, stock FROM products WHERE id = ANY($1) FOR UPDATE",
        )
        .bind(&product_ids)
        .fetch_all(&mut *tx)
        .await?;

        let products: HashMap<i64, Product> = rows
            .iter()
            .map(|row| Self::row_to_product(row).map(|p| (p.id.get(), p)))
            .collect::<Result<_, _>>()?;

        // Validate every line against remaining stock before writing
        // anything. A duplicate product id across lines draws down the same
        // remaining balance.
        let mut remaining: HashMap<i64, i64> =
            products.iter().map(|(id, p)| (*id, p.stock)).collect();
        let mut total_cents = 0i64;
        let mut lines = Vec::with_capacity(items.len());

        for item in items {
            let product = products
                .get(&item.product_id.get())
                .ok_or(LedgerError::ProductNotFound(item.product_id))?;

            let available = remaining
                .get_mut(&item.product_id.get())
                .ok_or(LedgerError::ProductNotFound(item.product_id))?;
            if *available < item.qty {
                return Err(LedgerError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.qty,
                    available: *available,
                });
            }
            *available -= item.qty;

            let subtotal_cents = product.price_cents * item.qty;
            total_cents += subtotal_cents;
            lines.push((item.product_id, item.qty, product.price_cents, subtotal_cents));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO orders (customer_id, status, total_cents)
            VALUES ($1, 'CREATED', $2)
            RETURNING id, created_at
            "#,
        )
        .bind(customer_id.get())
        .bind(total_cents)
        .fetch_one(&mut *tx)
        .await?;

        let order_id = OrderId::new(row.try_get("id")?);
        let created_at = row.try_get("created_at")?;

        let mut order_items = Vec::with_capacity(lines.len());
        for (product_id, qty, unit_price_cents, subtotal_cents) in lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, qty, unit_price_cents, subtotal_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id.get())
            .bind(product_id.get())
            .bind(qty)
            .bind(unit_price_cents)
            .bind(subtotal_cents)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE products SET stock = stock - $1 WHERE id = $2")
                .bind(qty)
                .bind(product_id.get())
                .execute(&mut *tx)
                .await?;

            order_items.push(OrderItem {
                order_id,
                product_id,
                qty,
                unit_price_cents,
                subtotal_cents,
            });
        }

        tx.commit().await?;

        Ok(OrderWithItems {
            order: Order {
                id: order_id,
                customer_id,
                status: OrderStatus::Created,
                total_cents,
                created_at,
            },
            items: order_items,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn confirm_order(&self, order_id: OrderId) -> Result<OrderWithItems, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let mut order = Self::lock_order(&mut tx, order_id).await?;

        match order.status {
            // Confirm is idempotent at the ledger level: commit to release
            // the lock and return the current state unchanged.
            OrderStatus::Confirmed => {}
            OrderStatus::Canceled => {
                return Err(LedgerError::InvalidOrderStatus {
                    order_id,
                    status: order.status,
                });
            }
            OrderStatus::Created => {
                sqlx::query("UPDATE orders SET status = 'CONFIRMED' WHERE id = $1")
                    .bind(order_id.get())
                    .execute(&mut *tx)
                    .await?;
                order.status = OrderStatus::Confirmed;
            }
        }

        let items = Self::items_for_order(&mut tx, order_id).await?;
        tx.commit().await?;

        Ok(OrderWithItems { order, items })
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_order(&self, order_id: OrderId) -> Result<OrderWithItems, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let mut order = Self::lock_order(&mut tx, order_id).await?;
        let items = Self::items_for_order(&mut tx, order_id).await?;

        match order.status {
            // Already canceled: no-op, return current state.
            OrderStatus::Canceled => {
                tx.commit().await?;
                return Ok(OrderWithItems { order, items });
            }
            OrderStatus::Confirmed => {
                if Utc::now() - order.created_at > CANCEL_WINDOW {
                    return Err(LedgerError::CancelWindowExpired { order_id });
                }
            }
            OrderStatus::Created => {}
        }

        // Stock restoration and the status transition commit together or
        // not at all.
        for item in &items {
            sqlx::query("UPDATE products SET stock = stock + $1 WHERE id = $2")
                .bind(item.qty)
                .bind(item.product_id.get())
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("UPDATE orders SET status = 'CANCELED' WHERE id = $1")
            .bind(order_id.get())
            .execute(&mut *tx)
            .await?;
        order.status = OrderStatus::Canceled;

        tx.commit().await?;

        Ok(OrderWithItems { order, items })
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderWithItems>, LedgerError> {
        let Some(row) = sqlx::query(
            "SELECT id, customer_id, status, total_cents, created_at FROM orders WHERE id = $1",
        )
        .bind(order_id.get())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let order = Self::row_to_order(&row)?;

        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, qty, unit_price_cents, subtotal_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.get())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(Self::row_to_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(OrderWithItems { order, items }))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<Order>, LedgerError> {
        let mut sql = String::from(
            "SELECT id, customer_id, status, total_cents, created_at FROM orders WHERE 1=1",
        );
        let mut param_count = 0;

        if filter.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if filter.from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if filter.to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at < ${param_count}"));
        }
        if filter.cursor.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND id > ${param_count}"));
        }

        param_count += 1;
        sql.push_str(&format!(" ORDER BY id ASC LIMIT ${param_count}"));

        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(from) = filter.from {
            query = query.bind(from.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()));
        }
        if let Some(to) = filter.to {
            // Inclusive date: match everything before the following midnight.
            let next_day = to + chrono::Days::new(1);
            query = query.bind(next_day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()));
        }
        if let Some(cursor) = filter.cursor {
            query = query.bind(cursor);
        }
        query = query.bind((filter.limit + 1) as i64);

        let rows = query.fetch_all(&self.pool).await?;
        let orders = rows
            .iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::from_rows(orders, filter.limit, |o| o.id.get()))
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product, LedgerError> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (sku, name, price_cents, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING id, sku, name, price_cents, stock
            "#,
        )
        .bind(&new.sku)
        .bind(&new.name)
        .bind(new.price_cents)
        .bind(new.stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("products_sku_key")
            {
                return LedgerError::DuplicateSku(new.sku.clone());
            }
            LedgerError::Database(e)
        })?;

        Self::row_to_product(&row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, LedgerError> {
        let row = sqlx::query("SELECT id, sku, name, price_cents, stock FROM products WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn list_products(
        &self,
        cursor: Option<i64>,
        limit: usize,
    ) -> Result<Page<Product>, LedgerError> {
        let mut sql = String::from("SELECT id, sku, name, price_cents, stock FROM products WHERE 1=1");
        let mut param_count = 0;

        if cursor.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND id > ${param_count}"));
        }
        param_count += 1;
        sql.push_str(&format!(" ORDER BY id ASC LIMIT ${param_count}"));

        let mut query = sqlx::query(&sql);
        if let Some(cursor) = cursor {
            query = query.bind(cursor);
        }
        query = query.bind((limit + 1) as i64);

        let rows = query.fetch_all(&self.pool).await?;
        let products = rows
            .iter()
            .map(Self::row_to_product)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::from_rows(products, limit, |p| p.id.get()))
    }
}
