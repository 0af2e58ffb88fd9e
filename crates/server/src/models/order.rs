//! Order domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bookbazaar_core::{BookId, OrderId, OrderStatus, UserId};

/// A placed order (domain type).
///
/// `total_price` is `quantity x unit price` snapshotted at checkout time;
/// later price edits on the book never change it. Orders are mutated only
/// by status transitions.
#[derive(Debug, Clone)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Buyer.
    pub user_id: UserId,
    /// Ordered book.
    pub book_id: BookId,
    /// Units ordered; positive.
    pub quantity: i32,
    /// Snapshotted total.
    pub total_price: Decimal,
    /// Fulfillment status.
    pub status: OrderStatus,
    /// When the order was placed.
    pub order_date: DateTime<Utc>,
}
