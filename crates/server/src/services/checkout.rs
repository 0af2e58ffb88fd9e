//! Order checkout and cancellation workflow.
//!
//! The one place where multiple entities mutate together. A checkout runs
//! as a single transaction covering every cart line: each line atomically
//! decrements the book's stock (refusing to go negative) and inserts an
//! order row with the total snapshotted at the price read inside the same
//! transaction. Any line failure rolls the whole checkout back - no
//! partial-commit state is ever observable.
//!
//! Mirror writes and notifications happen strictly after commit and are
//! best-effort: they cannot change the primary outcome.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use bookbazaar_core::{BookId, OrderId, OrderStatus, UserId};

use crate::db::orders::NewOrder;
use crate::db::{RepositoryError, books, orders};
use crate::models::{Cart, CurrentUser, Order};
use crate::services::mirror::{self, MirrorStore, OrderRecord};
use crate::services::notify::Notifier;

/// Errors from the checkout workflow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout was attempted with no cart lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line references a book that no longer exists.
    #[error("book {book_id} not found")]
    BookNotFound {
        book_id: BookId,
    },

    /// A cart line asked for more units than are in stock.
    #[error("insufficient stock for \"{title}\"")]
    InsufficientStock {
        book_id: BookId,
        title: String,
    },

    /// The order does not exist or belongs to another buyer.
    #[error("order not found")]
    OrderNotFound,

    /// The order has left the `Placed` state.
    #[error("order cannot be cancelled in status {status}")]
    NotCancellable {
        status: OrderStatus,
    },

    /// Primary-store failure; the transaction was aborted.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// An order created by a successful checkout, with the book context needed
/// for the response, the mirror document, and the notification.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub title: String,
    pub seller_id: Option<UserId>,
}

/// A cancelled order plus the restored book's title.
#[derive(Debug, Clone)]
pub struct CancelledOrder {
    pub order: Order,
    pub title: String,
}

/// Snapshotted line total: `quantity x unit price` at checkout time.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Order checkout and cancellation workflow.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    mirror: Option<&'a MirrorStore>,
    notifier: &'a Notifier,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        mirror: Option<&'a MirrorStore>,
        notifier: &'a Notifier,
    ) -> Self {
        Self {
            pool,
            mirror,
            notifier,
        }
    }

    /// Place orders for every cart line, all-or-nothing.
    ///
    /// Line items are processed in cart iteration order. Each decrement is
    /// conditional (`stock >= quantity`), so concurrent checkouts racing
    /// for the last units serialize at the row and at most one wins; the
    /// loser aborts with [`CheckoutError::InsufficientStock`] naming the
    /// failing title and nothing committed.
    ///
    /// The caller clears the session cart only on `Ok`.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart`, `BookNotFound`,
    /// `InsufficientStock`, or `Repository`; in every error case the
    /// transaction has rolled back and the catalog is unchanged.
    pub async fn place_order(
        &self,
        buyer: &CurrentUser,
        cart: &Cart,
    ) -> Result<Vec<PlacedOrder>, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let mut placed = Vec::with_capacity(cart.len());

        for (book_id, quantity) in cart.iter() {
            // A quantity beyond i32 can never be satisfiable; let the stock
            // check reject it.
            let units = i32::try_from(quantity).unwrap_or(i32::MAX);

            // Atomic check-and-decrement; rolls the whole checkout back on
            // the first line that cannot be satisfied.
            if !books::try_decrement_stock(&mut *tx, book_id, units).await? {
                return Err(match books::get_in_tx(&mut *tx, book_id).await? {
                    Some(book) => CheckoutError::InsufficientStock {
                        book_id,
                        title: book.title,
                    },
                    None => CheckoutError::BookNotFound { book_id },
                });
            }

            let book = books::get_in_tx(&mut *tx, book_id)
                .await?
                .ok_or(CheckoutError::BookNotFound { book_id })?;

            let order = orders::insert_in_tx(
                &mut *tx,
                &NewOrder {
                    user_id: buyer.id,
                    book_id,
                    quantity: units,
                    total_price: line_total(book.price, quantity),
                    status: OrderStatus::Placed,
                },
            )
            .await?;

            placed.push(PlacedOrder {
                order,
                title: book.title,
                seller_id: book.seller_id,
            });
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        // Post-commit, best-effort: never awaited for the primary outcome.
        if let Some(store) = self.mirror {
            for item in &placed {
                let store = store.clone();
                let record = OrderRecord::new(&item.order, item.seller_id);
                mirror::spawn_best_effort("order", async move { store.put_order(&record).await });
            }
        }

        let titles: Vec<&str> = placed.iter().map(|p| p.title.as_str()).collect();
        self.notifier
            .send(
                &buyer.email,
                &format!("Order placed for: {}", titles.join(", ")),
            )
            .await;

        Ok(placed)
    }

    /// Cancel a `Placed` order, restoring the book's stock by exactly the
    /// order quantity.
    ///
    /// Only the owning buyer may cancel, and only while the order is still
    /// `Placed`; anything else rejects without mutation. A missing order
    /// and another buyer's order are indistinguishable to the caller.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound`, `NotCancellable`, or
    /// `Repository`.
    pub async fn cancel_order(
        &self,
        buyer: &CurrentUser,
        order_id: OrderId,
    ) -> Result<CancelledOrder, CheckoutError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let Some(order) = orders::mark_cancelled(&mut *tx, order_id, buyer.id).await? else {
            return Err(match orders::get_in_tx(&mut *tx, order_id).await? {
                Some(existing) if existing.user_id == buyer.id => CheckoutError::NotCancellable {
                    status: existing.status,
                },
                _ => CheckoutError::OrderNotFound,
            });
        };

        books::restore_stock(&mut *tx, order.book_id, order.quantity).await?;

        let title = books::get_in_tx(&mut *tx, order.book_id)
            .await?
            .map_or_else(|| "your item".to_owned(), |book| book.title);

        tx.commit().await.map_err(RepositoryError::from)?;

        self.notifier
            .send(
                &buyer.email,
                &format!("Order #{} for {title} has been cancelled.", order.id),
            )
            .await;

        Ok(CancelledOrder { order, title })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_snapshots_quantity_times_price() {
        let price = Decimal::new(1250, 2); // 12.50
        assert_eq!(line_total(price, 3), Decimal::new(3750, 2));
        assert_eq!(line_total(price, 1), price);
    }

    #[test]
    fn test_line_total_exact_decimal_arithmetic() {
        // 0.10 * 3 must be exactly 0.30, not 0.30000000000000004
        let price = Decimal::new(10, 2);
        assert_eq!(line_total(price, 3).to_string(), "0.30");
    }

    #[test]
    fn test_insufficient_stock_message_names_title() {
        let err = CheckoutError::InsufficientStock {
            book_id: BookId::new(2),
            title: "Dune".to_owned(),
        };
        assert_eq!(err.to_string(), "insufficient stock for \"Dune\"");
    }

    #[test]
    fn test_not_cancellable_message_names_status() {
        let err = CheckoutError::NotCancellable {
            status: OrderStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "order cannot be cancelled in status Cancelled"
        );
    }
}
