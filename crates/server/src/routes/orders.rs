//! Checkout and order route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use bookbazaar_core::{Action, BookId, OrderId, OrderStatus};

use crate::db::orders::{OrderRepository, OrderWithTitle};
use crate::error::{AppError, Result};
use crate::middleware::auth::{RequireAuth, authorize};
use crate::models::{Cart, Order};
use crate::routes::cart::{get_cart, set_cart};
use crate::services::checkout::PlacedOrder;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Order data returned to clients.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub book_id: BookId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub quantity: i32,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
}

impl OrderView {
    /// Build a view, with or without book context.
    #[must_use]
    pub fn from_order(order: &Order, title: Option<String>) -> Self {
        Self {
            id: order.id,
            book_id: order.book_id,
            title,
            quantity: order.quantity,
            total_price: order.total_price,
            status: order.status,
            order_date: order.order_date,
        }
    }
}

impl From<&OrderWithTitle> for OrderView {
    fn from(item: &OrderWithTitle) -> Self {
        Self::from_order(&item.order, Some(item.title.clone()))
    }
}

impl From<&PlacedOrder> for OrderView {
    fn from(item: &PlacedOrder) -> Self {
        Self::from_order(&item.order, Some(item.title.clone()))
    }
}

/// Successful checkout response.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: String,
    pub orders: Vec<OrderView>,
}

/// Order history response.
#[derive(Debug, Serialize)]
pub struct OrderListView {
    pub orders: Vec<OrderView>,
}

/// Cancellation response.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub message: String,
    pub order: OrderView,
}

// =============================================================================
// Handlers
// =============================================================================

/// Finalize the cart: one all-or-nothing checkout.
///
/// The cart clears only on full success; on any failure it is left
/// untouched so the buyer can adjust and retry.
#[instrument(skip(state, session, user))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    authorize(&user, Action::CreateOrder)?;

    let cart = get_cart(&session).await;
    let placed = state.checkout().place_order(&user, &cart).await?;

    // Clear the cart in one step, only now that every line committed
    set_cart(&session, &Cart::new())
        .await
        .map_err(|e| AppError::Internal(format!("failed to clear cart: {e}")))?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            message: "Your order has been placed successfully!".to_owned(),
            orders: placed.iter().map(OrderView::from).collect(),
        }),
    ))
}

/// Buyer's order history, newest first.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<OrderListView>> {
    let orders = OrderRepository::new(state.pool()).for_user(user.id).await?;

    Ok(Json(OrderListView {
        orders: orders.iter().map(OrderView::from).collect(),
    }))
}

/// Order confirmation view, owner-only.
///
/// Another buyer's order is reported as not found, leaking nothing.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<OrderView>> {
    let order = OrderRepository::new(state.pool())
        .get_by_id(OrderId::new(id))
        .await?
        .filter(|order| order.user_id == user.id)
        .ok_or_else(|| AppError::NotFound("Order".to_owned()))?;

    Ok(Json(OrderView::from_order(&order, None)))
}

/// Cancel a placed order, restoring the book's stock.
#[instrument(skip(state, user))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<CancelResponse>> {
    authorize(&user, Action::CancelOwnOrder)?;

    let cancelled = state
        .checkout()
        .cancel_order(&user, OrderId::new(id))
        .await?;

    Ok(Json(CancelResponse {
        message: format!("Order #{} cancelled successfully.", cancelled.order.id),
        order: OrderView::from_order(&cancelled.order, Some(cancelled.title)),
    }))
}
