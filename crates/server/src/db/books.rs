//! Book repository and the stock-mutation primitives used by checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use bookbazaar_core::{BookId, UserId};

use super::{Page, RepositoryError};
use crate::models::Book;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for book queries.
#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: i32,
    title: String,
    author: String,
    description: Option<String>,
    price: Decimal,
    stock: i32,
    seller_id: Option<i32>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self {
            id: BookId::new(row.id),
            title: row.title,
            author: row.author,
            description: row.description,
            price: row.price,
            stock: row.stock,
            seller_id: row.seller_id.map(UserId::new),
            image_url: row.image_url,
            created_at: row.created_at,
        }
    }
}

const BOOK_COLUMNS: &str =
    "id, title, author, description, price, stock, seller_id, image_url, created_at";

/// Input for creating a catalog entry.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    /// `None` creates a system-owned book.
    pub seller_id: Option<UserId>,
    pub image_url: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for book database operations.
pub struct BookRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookRepository<'a> {
    /// Create a new book repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a book by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Book::from))
    }

    /// Get a book by exact title (natural key for seed files).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_title(&self, title: &str) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE title = $1 LIMIT 1"
        ))
        .bind(title)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Book::from))
    }

    /// One page of the catalog, newest first, optionally filtered by a
    /// case-insensitive title/author search.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_paginated(
        &self,
        query: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Book>, RepositoryError> {
        let page = Page::<Book>::normalize_page(page);
        let offset = Page::<Book>::offset(page, per_page);

        let (rows, total) = match query.filter(|q| !q.trim().is_empty()) {
            Some(q) => {
                let pattern = format!("%{}%", q.trim());
                let rows = sqlx::query_as::<_, BookRow>(&format!(
                    "SELECT {BOOK_COLUMNS} FROM books
                     WHERE title ILIKE $1 OR author ILIKE $1
                     ORDER BY created_at DESC, id DESC
                     LIMIT $2 OFFSET $3"
                ))
                .bind(&pattern)
                .bind(i64::from(per_page))
                .bind(offset)
                .fetch_all(self.pool)
                .await?;

                let total: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM books WHERE title ILIKE $1 OR author ILIKE $1",
                )
                .bind(&pattern)
                .fetch_one(self.pool)
                .await?;

                (rows, total)
            }
            None => {
                let rows = sqlx::query_as::<_, BookRow>(&format!(
                    "SELECT {BOOK_COLUMNS} FROM books
                     ORDER BY created_at DESC, id DESC
                     LIMIT $1 OFFSET $2"
                ))
                .bind(i64::from(per_page))
                .bind(offset)
                .fetch_all(self.pool)
                .await?;

                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
                    .fetch_one(self.pool)
                    .await?;

                (rows, total)
            }
        };

        Ok(Page {
            items: rows.into_iter().map(Book::from).collect(),
            page,
            per_page,
            total_items: u64::try_from(total).unwrap_or(0),
        })
    }

    /// Create a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new_book: &NewBook) -> Result<Book, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "INSERT INTO books (title, author, description, price, stock, seller_id, image_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&new_book.title)
        .bind(&new_book.author)
        .bind(&new_book.description)
        .bind(new_book.price)
        .bind(new_book.stock)
        .bind(new_book.seller_id.map(|id| id.as_i32()))
        .bind(&new_book.image_url)
        .fetch_one(self.pool)
        .await?;

        Ok(Book::from(row))
    }

    /// All books owned by a seller, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_seller(&self, seller_id: UserId) -> Result<Vec<Book>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE seller_id = $1 ORDER BY created_at DESC"
        ))
        .bind(seller_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    /// Delete a seller's own book.
    ///
    /// Deletion is refused while any order still references the book, so
    /// order history never dangles.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if orders reference the book.
    /// Returns `RepositoryError::NotFound` if the book doesn't exist or is
    /// owned by someone else.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete_owned(
        &self,
        book_id: BookId,
        seller_id: UserId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let referencing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE book_id = $1")
            .bind(book_id.as_i32())
            .fetch_one(&mut *tx)
            .await?;

        if referencing > 0 {
            return Err(RepositoryError::Conflict(
                "book has existing orders".to_owned(),
            ));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1 AND seller_id = $2")
            .bind(book_id.as_i32())
            .bind(seller_id.as_i32())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    /// Set a book's stock to an absolute amount.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_stock(&self, book_id: BookId, amount: i32) -> Result<Book, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "UPDATE books SET stock = $2 WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book_id.as_i32())
        .bind(amount)
        .fetch_optional(self.pool)
        .await?;

        row.map(Book::from).ok_or(RepositoryError::NotFound)
    }

    /// Add units to a book's stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add_stock(&self, book_id: BookId, amount: i32) -> Result<Book, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "UPDATE books SET stock = stock + $2 WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book_id.as_i32())
        .bind(amount)
        .fetch_optional(self.pool)
        .await?;

        row.map(Book::from).ok_or(RepositoryError::NotFound)
    }

    /// Books with stock below a threshold, lowest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, threshold: i32) -> Result<Vec<Book>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE stock < $1 ORDER BY stock ASC"
        ))
        .bind(threshold)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    /// Count catalog entries, optionally only those with / without stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, stocked: Option<bool>) -> Result<i64, RepositoryError> {
        let sql = match stocked {
            None => "SELECT COUNT(*) FROM books",
            Some(true) => "SELECT COUNT(*) FROM books WHERE stock > 0",
            Some(false) => "SELECT COUNT(*) FROM books WHERE stock = 0",
        };
        let count: i64 = sqlx::query_scalar(sql).fetch_one(self.pool).await?;

        Ok(count)
    }
}

// =============================================================================
// Transactional stock primitives (used inside the checkout transaction)
// =============================================================================

/// Atomically decrement stock, refusing to go negative.
///
/// Returns `false` when the book is missing or has fewer than `quantity`
/// units - the caller decides which, and the surrounding transaction rolls
/// back. Two concurrent checkouts racing for the last unit serialize on the
/// row; at most one sees a nonzero update count.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn try_decrement_stock(
    conn: &mut PgConnection,
    book_id: BookId,
    quantity: i32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE books SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
        .bind(book_id.as_i32())
        .bind(quantity)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Restore stock released by a cancellation.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the book no longer exists.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn restore_stock(
    conn: &mut PgConnection,
    book_id: BookId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query("UPDATE books SET stock = stock + $2 WHERE id = $1")
        .bind(book_id.as_i32())
        .bind(quantity)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Fetch a book inside an open transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_in_tx(
    conn: &mut PgConnection,
    book_id: BookId,
) -> Result<Option<Book>, RepositoryError> {
    let row =
        sqlx::query_as::<_, BookRow>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(book_id.as_i32())
            .fetch_optional(conn)
            .await?;

    Ok(row.map(Book::from))
}
