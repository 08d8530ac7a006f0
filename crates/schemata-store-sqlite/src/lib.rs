//! SQLite backend for the Schemata registry.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Uniqueness of (title, version) and of
//! (revision, subject, data_version) is enforced by UNIQUE constraints in the
//! DDL; the store treats the constraint as the final arbiter under races.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
