//! Database layer for coursepulse
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for queries
//! - A bridge for running store calls from async code

pub mod repo;
pub mod schema;

pub use repo::{ActivityFilter, Database, UserCompletionCount};
pub(crate) use repo::storage_precision;

use std::sync::Arc;

use crate::error::Result;

/// Run a store call on tokio's blocking pool.
///
/// `Database` is synchronous; async services hand each call to the blocking
/// pool so they only suspend at this I/O boundary.
pub async fn run_blocking<T, F>(db: &Arc<Database>, f: F) -> Result<T>
where
    F: FnOnce(&Database) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || f(&db)).await?
}
