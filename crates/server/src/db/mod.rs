//! Database operations for the BookBazaar `PostgreSQL` store.
//!
//! The primary relational store exclusively owns canonical Book/User/Order
//! state. Repositories use runtime-bound queries (`sqlx::query_as` over
//! `FromRow` row structs) converted into domain types.
//!
//! # Tables
//!
//! - `users` - accounts, roles, seller validation flag
//! - `books` - the catalog, including per-book stock
//! - `orders` - placed orders with snapshotted totals
//! - `tower_sessions.session` - tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p bookbazaar-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod books;
pub mod orders;
pub mod users;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness or reference constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be converted into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// One page of query results plus paging metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    /// Page size the query was run with.
    pub per_page: u32,
    /// Total matching rows across all pages.
    pub total_items: u64,
}

impl<T> Page<T> {
    /// Total number of pages (at least 1, even when empty).
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        let pages = self.total_items.div_ceil(u64::from(self.per_page).max(1));
        pages.max(1)
    }

    /// Clamp a requested page number to 1-based.
    #[must_use]
    pub const fn normalize_page(requested: u32) -> u32 {
        if requested == 0 { 1 } else { requested }
    }

    /// OFFSET for a 1-based page number.
    #[must_use]
    pub const fn offset(page: u32, per_page: u32) -> i64 {
        (Self::normalize_page(page) as i64 - 1) * per_page as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        let page: Page<()> = Page {
            items: vec![],
            page: 1,
            per_page: 8,
            total_items: 17,
        };
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn test_total_pages_never_zero() {
        let page: Page<()> = Page {
            items: vec![],
            page: 1,
            per_page: 8,
            total_items: 0,
        };
        assert_eq!(page.total_pages(), 1);
    }

    #[test]
    fn test_offset_is_zero_based() {
        assert_eq!(Page::<()>::offset(1, 8), 0);
        assert_eq!(Page::<()>::offset(3, 8), 16);
        // page 0 is treated as page 1
        assert_eq!(Page::<()>::offset(0, 8), 0);
    }
}
