//! Book domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bookbazaar_core::{BookId, UserId};

/// A catalog entry (domain type).
///
/// `stock` never goes negative: the only decrement path is the checkout
/// transaction's conditional update, backed by a database CHECK constraint.
#[derive(Debug, Clone)]
pub struct Book {
    /// Unique book ID, assigned by the primary store.
    pub id: BookId,
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Optional long description.
    pub description: Option<String>,
    /// Unit price; non-negative.
    pub price: Decimal,
    /// Units available; non-negative.
    pub stock: i32,
    /// Owning seller; `None` means the book is system-owned.
    pub seller_id: Option<UserId>,
    /// Cover image reference.
    pub image_url: Option<String>,
    /// When the listing was created.
    pub created_at: DateTime<Utc>,
}
