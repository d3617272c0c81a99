//! SQLite backend for the Marquee catalog.
//!
//! Entities are stored as JSON documents next to mirrored, indexed columns
//! (natural key, lifecycle flag, audit fields and media references). Filters
//! are compiled to SQL over SQLite's JSON1 functions.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod filter;
mod schema;
mod store;
mod users;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
