//! Order repository and the order-mutation primitives used by checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use bookbazaar_core::{BookId, OrderId, OrderStatus, UserId};

use super::RepositoryError;
use crate::models::Order;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    book_id: i32,
    quantity: i32,
    total_price: Decimal,
    status: String,
    order_date: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            book_id: BookId::new(row.book_id),
            quantity: row.quantity,
            total_price: row.total_price,
            status,
            order_date: row.order_date,
        })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, book_id, quantity, total_price, status, order_date";

/// Internal row type for order-with-title joins.
#[derive(Debug, sqlx::FromRow)]
struct OrderWithTitleRow {
    #[sqlx(flatten)]
    order: OrderRow,
    title: String,
}

/// An order joined with its book's title, for buyer and seller listings.
#[derive(Debug, Clone)]
pub struct OrderWithTitle {
    pub order: Order,
    pub title: String,
}

impl TryFrom<OrderWithTitleRow> for OrderWithTitle {
    type Error = RepositoryError;

    fn try_from(row: OrderWithTitleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            order: Order::try_from(row.order)?,
            title: row.title,
        })
    }
}

/// Input for creating an order row.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub book_id: BookId,
    pub quantity: i32,
    /// Snapshotted `quantity x unit price`.
    pub total_price: Decimal,
    pub status: OrderStatus,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// All orders placed by a buyer, with book titles, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<OrderWithTitle>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderWithTitleRow>(&format!(
            "SELECT o.{}, b.title FROM orders o
             JOIN books b ON b.id = o.book_id
             WHERE o.user_id = $1
             ORDER BY o.order_date DESC",
            ORDER_COLUMNS.replace(", ", ", o."),
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderWithTitle::try_from).collect()
    }

    /// All orders against books owned by a seller, with titles, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_seller(
        &self,
        seller_id: UserId,
    ) -> Result<Vec<OrderWithTitle>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderWithTitleRow>(&format!(
            "SELECT o.{}, b.title FROM orders o
             JOIN books b ON b.id = o.book_id
             WHERE b.seller_id = $1
             ORDER BY o.order_date DESC",
            ORDER_COLUMNS.replace(", ", ", o."),
        ))
        .bind(seller_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderWithTitle::try_from).collect()
    }

    /// The most recent orders store-wide.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY order_date DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Count all orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Sum of all order totals (zero when there are no orders).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue_total(&self) -> Result<Decimal, RepositoryError> {
        let total: Option<Decimal> = sqlx::query_scalar("SELECT SUM(total_price) FROM orders")
            .fetch_one(self.pool)
            .await?;

        Ok(total.unwrap_or_default())
    }

    /// Order counts grouped by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_counts(&self) -> Result<Vec<(String, i64)>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM orders GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Create an order row directly (seed tooling).
    ///
    /// The checkout path never uses this - it inserts inside its own
    /// transaction via [`insert_in_tx`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new_order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_in_tx(&mut *conn, new_order).await
    }
}

// =============================================================================
// Transactional order primitives (used inside the checkout transaction)
// =============================================================================

/// Insert an order row inside an open transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_in_tx(
    conn: &mut PgConnection,
    new_order: &NewOrder,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "INSERT INTO orders (user_id, book_id, quantity, total_price, status)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(new_order.user_id.as_i32())
    .bind(new_order.book_id.as_i32())
    .bind(new_order.quantity)
    .bind(new_order.total_price)
    .bind(new_order.status.to_string())
    .fetch_one(conn)
    .await?;

    Order::try_from(row)
}

/// Transition an order to `Cancelled`, guarded on ownership and on the
/// order still being `Placed`.
///
/// Returns the cancelled order, or `None` when no row matched (missing,
/// not owned by `user_id`, or no longer cancellable - the caller
/// distinguishes by re-reading).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn mark_cancelled(
    conn: &mut PgConnection,
    order_id: OrderId,
    user_id: UserId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "UPDATE orders SET status = $3
         WHERE id = $1 AND user_id = $2 AND status = $4
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id.as_i32())
    .bind(user_id.as_i32())
    .bind(OrderStatus::Cancelled.to_string())
    .bind(OrderStatus::Placed.to_string())
    .fetch_optional(conn)
    .await?;

    row.map(Order::try_from).transpose()
}

/// Fetch an order inside an open transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_in_tx(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(order_id.as_i32())
    .fetch_optional(conn)
    .await?;

    row.map(Order::try_from).transpose()
}
