//! Best-effort replication to the secondary key-value store.
//!
//! Immediately after a primary-store commit of a user, book, or order
//! creation, an equivalent JSON document is written to Redis under
//! `user:{id}` / `book:{id}` / `order:{id}` - the stringified primary-store
//! identifier is the key. The mirror is derived, non-authoritative data:
//! it is never read back by the checkout path, a failed write is logged and
//! swallowed, and there is no retry or reconciliation beyond an out-of-band
//! reseed (`bb-cli seed`).
//!
//! Monetary fields serialize through [`rust_decimal::serde::str`] so the
//! mirror carries exact decimals rather than floats.

use std::future::Future;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookbazaar_core::{BookId, UserId};

use crate::models::{Book, Order, User};

/// Upper bound on any single mirror operation; a slow secondary store must
/// never stall a user-facing request.
pub const MIRROR_TIMEOUT: Duration = Duration::from_secs(2);

/// Seller marker used when a book has no owning seller.
pub const SYSTEM_SELLER: &str = "system";

/// Errors from mirror operations. Callers on the request path never see
/// these - [`spawn_best_effort`] logs and swallows them.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// Redis connection or command failure.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// =============================================================================
// Mirror Documents
// =============================================================================

/// Mirrored user document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    /// Carried so the mirror could serve cloud user management directly.
    pub password_hash: String,
}

impl UserRecord {
    /// Build a mirror document from a committed user row.
    #[must_use]
    pub fn new(user: &User, password_hash: &str) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.to_string(),
            role: user.role.to_string(),
            password_hash: password_hash.to_owned(),
        }
    }
}

/// Mirrored book document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub stock: i32,
    pub seller_id: String,
    pub image_url: String,
}

impl From<&Book> for BookRecord {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.to_string(),
            title: book.title.clone(),
            author: book.author.clone(),
            price: book.price,
            stock: book.stock,
            seller_id: book
                .seller_id
                .map_or_else(|| SYSTEM_SELLER.to_owned(), |id| id.to_string()),
            image_url: book.image_url.clone().unwrap_or_default(),
        }
    }
}

/// Mirrored order document.
///
/// Carries a denormalized `seller_id` so seller-sales lookups can filter
/// without joining back through books.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub seller_id: String,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_price: Decimal,
    pub status: String,
    pub order_date: String,
}

impl OrderRecord {
    /// Build a mirror document from a committed order row.
    #[must_use]
    pub fn new(order: &Order, seller_id: Option<UserId>) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            book_id: order.book_id.to_string(),
            seller_id: seller_id.map_or_else(|| SYSTEM_SELLER.to_owned(), |id| id.to_string()),
            quantity: order.quantity,
            total_price: order.total_price,
            status: order.status.to_string(),
            order_date: order.order_date.to_rfc3339(),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Handle to the secondary key-value store.
///
/// Cheap to clone - the connection manager multiplexes one connection.
#[derive(Clone)]
pub struct MirrorStore {
    conn: ConnectionManager,
}

impl MirrorStore {
    /// Connect to the mirror store.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is unreachable; the caller treats
    /// that as "mirroring disabled", never as a fatal condition.
    pub async fn connect(url: &str) -> Result<Self, MirrorError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// A clone of the underlying connection, for the pub/sub dispatcher.
    #[must_use]
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    fn user_key(id: &str) -> String {
        format!("user:{id}")
    }

    fn book_key(id: &str) -> String {
        format!("book:{id}")
    }

    fn order_key(id: &str) -> String {
        format!("order:{id}")
    }

    /// Check connectivity.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint does not answer `PING`.
    pub async fn ping(&self) -> Result<(), MirrorError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Write a user document.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or write failure.
    pub async fn put_user(&self, record: &UserRecord) -> Result<(), MirrorError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(record)?;
        let _: () = conn.set(Self::user_key(&record.id), payload).await?;
        Ok(())
    }

    /// Write a book document.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or write failure.
    pub async fn put_book(&self, record: &BookRecord) -> Result<(), MirrorError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(record)?;
        let _: () = conn.set(Self::book_key(&record.id), payload).await?;
        Ok(())
    }

    /// Drop a book document after the primary row is deleted.
    ///
    /// # Errors
    ///
    /// Returns an error on write failure.
    pub async fn remove_book(&self, id: BookId) -> Result<(), MirrorError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(Self::book_key(&id.to_string())).await?;
        Ok(())
    }

    /// Write an order document.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or write failure.
    pub async fn put_order(&self, record: &OrderRecord) -> Result<(), MirrorError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(record)?;
        let _: () = conn.set(Self::order_key(&record.id), payload).await?;
        Ok(())
    }

    /// Read a mirrored book document.
    ///
    /// # Errors
    ///
    /// Returns an error on read or deserialization failure.
    pub async fn get_book(&self, id: BookId) -> Result<Option<BookRecord>, MirrorError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(Self::book_key(&id.to_string())).await?;
        payload
            .map(|p| serde_json::from_str(&p))
            .transpose()
            .map_err(MirrorError::from)
    }

    /// All mirrored orders against a seller's books.
    ///
    /// Scans the `order:*` keyspace and filters on the denormalized
    /// `seller_id` - acceptable for this non-authoritative, low-cardinality
    /// side store.
    ///
    /// # Errors
    ///
    /// Returns an error on scan, read, or deserialization failure.
    pub async fn orders_for_seller(
        &self,
        seller_id: UserId,
    ) -> Result<Vec<OrderRecord>, MirrorError> {
        let mut conn = self.conn.clone();

        let mut keys = Vec::new();
        {
            let mut iter = conn.scan_match::<_, String>("order:*").await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        let seller = seller_id.to_string();
        let mut records = Vec::new();
        for key in keys {
            let payload: Option<String> = conn.get(&key).await?;
            let Some(payload) = payload else { continue };
            let record: OrderRecord = serde_json::from_str(&payload)?;
            if record.seller_id == seller {
                records.push(record);
            }
        }

        Ok(records)
    }
}

/// Run a mirror write off the request path: spawned, bounded by
/// [`MIRROR_TIMEOUT`], logged and swallowed on failure.
///
/// The triggering primary operation has already committed by the time this
/// is called; nothing here can change its outcome.
pub fn spawn_best_effort<F>(entity: &'static str, fut: F)
where
    F: Future<Output = Result<(), MirrorError>> + Send + 'static,
{
    tokio::spawn(async move {
        match tokio::time::timeout(MIRROR_TIMEOUT, fut).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(entity, error = %e, "mirror sync failed"),
            Err(_) => tracing::warn!(entity, "mirror sync timed out"),
        }
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bookbazaar_core::{Email, OrderId, OrderStatus, Role};
    use chrono::Utc;

    fn sample_book(seller: Option<UserId>) -> Book {
        Book {
            id: BookId::new(5),
            title: "The Rust Programming Language".to_owned(),
            author: "Klabnik & Nichols".to_owned(),
            description: None,
            price: Decimal::new(3999, 2),
            stock: 12,
            seller_id: seller,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_book_record_decimal_serializes_as_string() {
        let record = BookRecord::from(&sample_book(Some(UserId::new(3))));
        let json = serde_json::to_value(&record).unwrap();
        // Exact-decimal representation, not a float
        assert_eq!(json["price"], "39.99");
        assert_eq!(json["seller_id"], "3");
        assert_eq!(json["id"], "5");
    }

    #[test]
    fn test_book_record_system_seller() {
        let record = BookRecord::from(&sample_book(None));
        assert_eq!(record.seller_id, SYSTEM_SELLER);
    }

    #[test]
    fn test_order_record_carries_snapshot_total() {
        let order = Order {
            id: OrderId::new(77),
            user_id: UserId::new(2),
            book_id: BookId::new(5),
            quantity: 3,
            total_price: Decimal::new(11997, 2),
            status: OrderStatus::Placed,
            order_date: Utc::now(),
        };
        let record = OrderRecord::new(&order, None);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["total_price"], "119.97");
        assert_eq!(json["status"], "Placed");
        assert_eq!(json["seller_id"], SYSTEM_SELLER);
    }

    #[test]
    fn test_user_record_keys_by_stringified_id() {
        let user = User {
            id: UserId::new(42),
            username: "reader".to_owned(),
            email: Email::parse("reader@example.com").unwrap(),
            role: Role::Buyer,
            is_validated: false,
            created_at: Utc::now(),
        };
        let record = UserRecord::new(&user, "argon2-hash");
        assert_eq!(record.id, "42");
        assert_eq!(MirrorStore::user_key(&record.id), "user:42");
    }
}
