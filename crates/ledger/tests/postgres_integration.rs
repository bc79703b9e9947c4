//! PostgreSQL integration tests for the ledger.
//!
//! These tests share one PostgreSQL container. Run with:
//!
//! ```bash
//! cargo test -p ledger --test postgres_integration
//! ```

use std::sync::Arc;

use common::{CustomerId, ProductId};
use ledger::{
    LedgerError, LedgerStore, NewOrderItem, NewProduct, OrderFilter, OrderStatus, PostgresLedger,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_ledger_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_ledger() -> PostgresLedger {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_items, orders, products RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresLedger::new(pool)
}

async fn seed_product(ledger: &PostgresLedger, sku: &str, price_cents: i64, stock: i64) -> ProductId {
    ledger
        .create_product(NewProduct {
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            price_cents,
            stock,
        })
        .await
        .unwrap()
        .id
}

fn line(product_id: ProductId, qty: i64) -> NewOrderItem {
    NewOrderItem { product_id, qty }
}

#[tokio::test]
#[serial]
async fn create_order_snapshots_prices_and_decrements_stock() {
    let ledger = get_test_ledger().await;
    let widget = seed_product(&ledger, "SKU-W", 1000, 2).await;

    let order = ledger
        .create_order(CustomerId::new(5), &[line(widget, 2)])
        .await
        .unwrap();

    assert_eq!(order.order.status, OrderStatus::Created);
    assert_eq!(order.order.total_cents, 2000);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].unit_price_cents, 1000);
    assert_eq!(order.items[0].subtotal_cents, 2000);

    let product = ledger.get_product(widget).await.unwrap().unwrap();
    assert_eq!(product.stock, 0);

    let fetched = ledger.get_order(order.order.id).await.unwrap().unwrap();
    assert_eq!(fetched, order);
}

#[tokio::test]
#[serial]
async fn failing_line_rolls_back_the_whole_order() {
    let ledger = get_test_ledger().await;
    let widget = seed_product(&ledger, "SKU-W", 1000, 2).await;
    let gadget = seed_product(&ledger, "SKU-G", 500, 100).await;

    // The second line exceeds stock; the first line's writes must roll back.
    let result = ledger
        .create_order(CustomerId::new(5), &[line(gadget, 3), line(widget, 3)])
        .await;

    assert!(matches!(
        result,
        Err(LedgerError::InsufficientStock {
            requested: 3,
            available: 2,
            ..
        })
    ));
    assert_eq!(ledger.get_product(widget).await.unwrap().unwrap().stock, 2);
    assert_eq!(ledger.get_product(gadget).await.unwrap().unwrap().stock, 100);

    let page = ledger.list_orders(&OrderFilter { limit: 10, ..Default::default() }).await.unwrap();
    assert!(page.data.is_empty());
}

#[tokio::test]
#[serial]
async fn unknown_product_aborts_the_order() {
    let ledger = get_test_ledger().await;
    let widget = seed_product(&ledger, "SKU-W", 1000, 2).await;

    let result = ledger
        .create_order(
            CustomerId::new(5),
            &[line(widget, 1), line(ProductId::new(9999), 1)],
        )
        .await;

    assert!(matches!(result, Err(LedgerError::ProductNotFound(p)) if p.get() == 9999));
    assert_eq!(ledger.get_product(widget).await.unwrap().unwrap().stock, 2);
}

#[tokio::test]
#[serial]
async fn concurrent_orders_never_oversell() {
    let ledger = Arc::new(get_test_ledger().await);
    let widget = seed_product(&ledger, "SKU-W", 1000, 5).await;

    // 8 concurrent orders of qty 2 against stock 5: at most 2 can commit.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.create_order(CustomerId::new(5), &[line(widget, 2)]).await
        }));
    }

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(LedgerError::InsufficientStock { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    let stock = ledger.get_product(widget).await.unwrap().unwrap().stock;
    assert_eq!(committed, 2);
    assert_eq!(stock, 5 - committed * 2);
    assert!(stock >= 0);
}

#[tokio::test]
#[serial]
async fn concurrent_multi_product_orders_do_not_deadlock() {
    let ledger = Arc::new(get_test_ledger().await);
    let a = seed_product(&ledger, "SKU-A", 100, 50).await;
    let b = seed_product(&ledger, "SKU-B", 100, 50).await;

    // Half the tasks reference (a, b), the other half (b, a). With per-row
    // locking taken in two separate statements this interleaving deadlocks;
    // the single locking read must survive it.
    let mut handles = Vec::new();
    for i in 0..10 {
        let ledger = ledger.clone();
        let items = if i % 2 == 0 {
            [line(a, 1), line(b, 1)]
        } else {
            [line(b, 1), line(a, 1)]
        };
        handles.push(tokio::spawn(async move {
            ledger.create_order(CustomerId::new(5), &items).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(ledger.get_product(a).await.unwrap().unwrap().stock, 40);
    assert_eq!(ledger.get_product(b).await.unwrap().unwrap().stock, 40);
}

#[tokio::test]
#[serial]
async fn confirm_transitions_and_is_idempotent() {
    let ledger = get_test_ledger().await;
    let widget = seed_product(&ledger, "SKU-W", 1000, 5).await;

    let order = ledger
        .create_order(CustomerId::new(5), &[line(widget, 1)])
        .await
        .unwrap();

    let confirmed = ledger.confirm_order(order.order.id).await.unwrap();
    assert_eq!(confirmed.order.status, OrderStatus::Confirmed);

    let again = ledger.confirm_order(order.order.id).await.unwrap();
    assert_eq!(again.order.status, OrderStatus::Confirmed);
    assert_eq!(again.order.total_cents, confirmed.order.total_cents);
}

#[tokio::test]
#[serial]
async fn cancel_restores_stock_and_keeps_items() {
    let ledger = get_test_ledger().await;
    let widget = seed_product(&ledger, "SKU-W", 1000, 5).await;

    let order = ledger
        .create_order(CustomerId::new(5), &[line(widget, 3)])
        .await
        .unwrap();
    ledger.confirm_order(order.order.id).await.unwrap();
    assert_eq!(ledger.get_product(widget).await.unwrap().unwrap().stock, 2);

    let canceled = ledger.cancel_order(order.order.id).await.unwrap();
    assert_eq!(canceled.order.status, OrderStatus::Canceled);
    assert_eq!(ledger.get_product(widget).await.unwrap().unwrap().stock, 5);

    // Items survive cancellation as the audit trail.
    let fetched = ledger.get_order(order.order.id).await.unwrap().unwrap();
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].qty, 3);

    // Re-canceling is a no-op and must not restore stock twice.
    let again = ledger.cancel_order(order.order.id).await.unwrap();
    assert_eq!(again.order.status, OrderStatus::Canceled);
    assert_eq!(ledger.get_product(widget).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
#[serial]
async fn confirmed_order_past_window_cannot_cancel() {
    let ledger = get_test_ledger().await;
    let widget = seed_product(&ledger, "SKU-W", 1000, 5).await;

    let order = ledger
        .create_order(CustomerId::new(5), &[line(widget, 2)])
        .await
        .unwrap();
    ledger.confirm_order(order.order.id).await.unwrap();

    sqlx::query("UPDATE orders SET created_at = NOW() - INTERVAL '11 minutes' WHERE id = $1")
        .bind(order.order.id.get())
        .execute(ledger.pool())
        .await
        .unwrap();

    let result = ledger.cancel_order(order.order.id).await;
    assert!(matches!(result, Err(LedgerError::CancelWindowExpired { .. })));

    let current = ledger.get_order(order.order.id).await.unwrap().unwrap();
    assert_eq!(current.order.status, OrderStatus::Confirmed);
    assert_eq!(ledger.get_product(widget).await.unwrap().unwrap().stock, 3);
}

#[tokio::test]
#[serial]
async fn created_order_past_window_still_cancels() {
    let ledger = get_test_ledger().await;
    let widget = seed_product(&ledger, "SKU-W", 1000, 5).await;

    let order = ledger
        .create_order(CustomerId::new(5), &[line(widget, 2)])
        .await
        .unwrap();

    sqlx::query("UPDATE orders SET created_at = NOW() - INTERVAL '2 hours' WHERE id = $1")
        .bind(order.order.id.get())
        .execute(ledger.pool())
        .await
        .unwrap();

    let canceled = ledger.cancel_order(order.order.id).await.unwrap();
    assert_eq!(canceled.order.status, OrderStatus::Canceled);
    assert_eq!(ledger.get_product(widget).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
#[serial]
async fn canceled_order_cannot_confirm() {
    let ledger = get_test_ledger().await;
    let widget = seed_product(&ledger, "SKU-W", 1000, 5).await;

    let order = ledger
        .create_order(CustomerId::new(5), &[line(widget, 1)])
        .await
        .unwrap();
    ledger.cancel_order(order.order.id).await.unwrap();

    let result = ledger.confirm_order(order.order.id).await;
    assert!(matches!(
        result,
        Err(LedgerError::InvalidOrderStatus {
            status: OrderStatus::Canceled,
            ..
        })
    ));
}

#[tokio::test]
#[serial]
async fn missing_order_is_not_found() {
    let ledger = get_test_ledger().await;

    assert!(ledger.get_order(common::OrderId::new(404)).await.unwrap().is_none());
    assert!(matches!(
        ledger.confirm_order(common::OrderId::new(404)).await,
        Err(LedgerError::OrderNotFound(_))
    ));
    assert!(matches!(
        ledger.cancel_order(common::OrderId::new(404)).await,
        Err(LedgerError::OrderNotFound(_))
    ));
}

#[tokio::test]
#[serial]
async fn list_orders_paginates_and_filters_by_status() {
    let ledger = get_test_ledger().await;
    let widget = seed_product(&ledger, "SKU-W", 1000, 100).await;

    let mut confirmed_ids = Vec::new();
    for i in 0..5 {
        let order = ledger
            .create_order(CustomerId::new(5), &[line(widget, 1)])
            .await
            .unwrap();
        if i % 2 == 0 {
            ledger.confirm_order(order.order.id).await.unwrap();
            confirmed_ids.push(order.order.id);
        }
    }

    let filter = OrderFilter {
        status: Some(OrderStatus::Confirmed),
        limit: 2,
        ..Default::default()
    };
    let first = ledger.list_orders(&filter).await.unwrap();
    assert_eq!(first.data.len(), 2);
    let cursor = first.next_cursor.unwrap();
    assert_eq!(cursor, first.data[1].id.get());

    let second = ledger
        .list_orders(&OrderFilter {
            cursor: Some(cursor),
            ..filter
        })
        .await
        .unwrap();
    assert_eq!(second.data.len(), 1);
    assert_eq!(second.next_cursor, None);

    let all: Vec<_> = first
        .data
        .iter()
        .chain(second.data.iter())
        .map(|o| o.id)
        .collect();
    assert_eq!(all, confirmed_ids);
}

#[tokio::test]
#[serial]
async fn list_orders_date_range_is_inclusive() {
    let ledger = get_test_ledger().await;
    let widget = seed_product(&ledger, "SKU-W", 1000, 100).await;

    let order = ledger
        .create_order(CustomerId::new(5), &[line(widget, 1)])
        .await
        .unwrap();
    let today = order.order.created_at.date_naive();

    let hit = ledger
        .list_orders(&OrderFilter {
            from: Some(today),
            to: Some(today),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hit.data.len(), 1);

    let miss = ledger
        .list_orders(&OrderFilter {
            to: Some(today - chrono::Days::new(1)),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(miss.data.is_empty());
}

#[tokio::test]
#[serial]
async fn duplicate_sku_is_rejected() {
    let ledger = get_test_ledger().await;
    seed_product(&ledger, "SKU-W", 1000, 5).await;

    let result = ledger
        .create_product(NewProduct {
            sku: "SKU-W".to_string(),
            name: "Duplicate".to_string(),
            price_cents: 500,
            stock: 1,
        })
        .await;
    assert!(matches!(result, Err(LedgerError::DuplicateSku(sku)) if sku == "SKU-W"));
}

#[tokio::test]
#[serial]
async fn list_products_paginates_by_id() {
    let ledger = get_test_ledger().await;
    for i in 0..3 {
        seed_product(&ledger, &format!("SKU-{i}"), 100, 1).await;
    }

    let first = ledger.list_products(None, 2).await.unwrap();
    assert_eq!(first.data.len(), 2);
    let cursor = first.next_cursor.unwrap();

    let second = ledger.list_products(Some(cursor), 2).await.unwrap();
    assert_eq!(second.data.len(), 1);
    assert_eq!(second.next_cursor, None);
}
