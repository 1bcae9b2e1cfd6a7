//! SQLite backend for the Holmes review store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write runs inside a single
//! `IMMEDIATE` transaction, which serialises competing promotions of the
//! same page.

mod encode;
mod query;
mod reconcile;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
