//! SQLite backend for the Patron customer registry.
//!
//! Implements every collaborator trait from [`patron_core::store`] against a
//! single database file: customers, their sub-records, the user directory
//! and the audit log. Wraps [`tokio_rusqlite`] so all database access runs
//! on a dedicated thread without blocking the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
