//! Stock/order ledger.
//!
//! Owns Product, Order, and OrderItem state and exposes the atomic
//! create/confirm/cancel operations. Every mutation runs inside one database
//! transaction with row-level locks: no partial order and no partial stock
//! movement ever becomes visible.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod service;
pub mod store;

pub use error::LedgerError;
pub use memory::InMemoryLedger;
pub use model::{
    NewOrderItem, NewProduct, Order, OrderFilter, OrderItem, OrderStatus, OrderWithItems, Product,
};
pub use postgres::PostgresLedger;
pub use service::OrderService;
pub use store::{CANCEL_WINDOW, LedgerStore};
