//! SQLite backend for the SaferPlace incident store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each operation runs as one closure on
//! that thread, inside its own transaction where it touches more than one
//! statement.

mod encode;
mod schema;
mod session;
mod store;

pub mod config;
pub mod error;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::SqliteStore;
