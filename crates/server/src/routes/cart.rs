//! Cart route handlers.
//!
//! The cart lives in the session: a map of book id to quantity, created
//! empty on first add and dropped with the session. Prices shown here are
//! the books' current prices; totals are only snapshotted at checkout.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use bookbazaar_core::BookId;

use crate::db::books::BookRepository;
use crate::error::{AppError, Result};
use crate::middleware::auth::RequireAuth;
use crate::models::{Cart, session_keys};
use crate::services::checkout::line_total;
use crate::state::AppState;

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart from the session (empty if none stored yet).
pub async fn get_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Store the cart in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_cart(
    session: &Session,
    cart: &Cart,
) -> std::result::Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

fn session_error(e: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("failed to save cart to session: {e}"))
}

// =============================================================================
// Form Types
// =============================================================================

/// Update-quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub quantity: u32,
}

// =============================================================================
// View Types
// =============================================================================

/// One cart line priced at the book's current price.
#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub book_id: BookId,
    pub title: String,
    pub price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// Cart contents returned to clients.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total_price: Decimal,
    /// Total units across all lines.
    pub count: u32,
}

/// Build the priced view of a cart. Lines whose book has vanished from the
/// catalog are skipped rather than failing the page.
async fn cart_view(state: &AppState, cart: &Cart) -> Result<CartView> {
    let repo = BookRepository::new(state.pool());
    let mut items = Vec::with_capacity(cart.len());
    let mut total_price = Decimal::ZERO;

    for (book_id, quantity) in cart.iter() {
        let Some(book) = repo.get_by_id(book_id).await? else {
            continue;
        };
        let line = line_total(book.price, quantity);
        total_price += line;
        items.push(CartLineView {
            book_id,
            title: book.title,
            price: book.price,
            quantity,
            line_total: line,
        });
    }

    Ok(CartView {
        items,
        total_price,
        count: cart.count(),
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    session: Session,
) -> Result<Json<CartView>> {
    let cart = get_cart(&session).await;
    Ok(Json(cart_view(&state, &cart).await?))
}

/// Add one unit of a book to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    session: Session,
    Path(book_id): Path<i32>,
) -> Result<Json<CartView>> {
    let book_id = BookId::new(book_id);
    let book = BookRepository::new(state.pool())
        .get_by_id(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Book".to_owned()))?;

    if book.stock < 1 {
        return Err(AppError::Conflict(
            "Sorry, this book is out of stock".to_owned(),
        ));
    }

    let mut cart = get_cart(&session).await;
    cart.add(book_id);
    set_cart(&session, &cart).await.map_err(session_error)?;

    Ok(Json(cart_view(&state, &cart).await?))
}

/// Set the quantity of a cart line.
///
/// Zero removes the line; a request beyond the current stock is clamped to
/// the stock level, matching the store's cart page behavior.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    session: Session,
    Path(book_id): Path<i32>,
    Json(form): Json<UpdateCartForm>,
) -> Result<Json<CartView>> {
    let book_id = BookId::new(book_id);
    let mut cart = get_cart(&session).await;

    if form.quantity == 0 {
        cart.remove(book_id);
    } else {
        let book = BookRepository::new(state.pool())
            .get_by_id(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book".to_owned()))?;

        let stock = u32::try_from(book.stock).unwrap_or(0);
        cart.set(book_id, form.quantity.min(stock));
    }

    set_cart(&session, &cart).await.map_err(session_error)?;

    Ok(Json(cart_view(&state, &cart).await?))
}

/// Remove a line from the cart.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    session: Session,
    Path(book_id): Path<i32>,
) -> Result<Json<CartView>> {
    let mut cart = get_cart(&session).await;
    cart.remove(BookId::new(book_id));
    set_cart(&session, &cart).await.map_err(session_error)?;

    Ok(Json(cart_view(&state, &cart).await?))
}
