//! Core types and trait definitions for the SaferPlace incident store.
//!
//! This crate is deliberately free of database dependencies. Storage backends
//! implement [`store::IncidentStore`] and [`store::SessionStore`]; the service
//! layer depends only on those traits.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod cancel;
pub mod error;
pub mod geo;
pub mod incident;
pub mod resolution;
pub mod session;
pub mod store;

pub use cancel::Cancel;
pub use error::{Error, Result};
pub use resolution::Resolution;
