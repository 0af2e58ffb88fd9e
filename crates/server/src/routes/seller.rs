//! Seller route handlers: own listings, sales, and listing management.
//!
//! Every handler authorizes against the role permission table before
//! touching the catalog.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bookbazaar_core::{Action, BookId};

use crate::db::RepositoryError;
use crate::db::books::{BookRepository, NewBook};
use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::auth::{RequireAuth, authorize};
use crate::routes::books::BookView;
use crate::routes::orders::OrderView;
use crate::services::mirror::{self, BookRecord};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// New listing form data.
#[derive(Debug, Deserialize)]
pub struct CreateBookForm {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
}

// =============================================================================
// View Types
// =============================================================================

/// Seller dashboard: own listings plus stock totals.
#[derive(Debug, Serialize)]
pub struct SellerBooksView {
    pub books: Vec<BookView>,
    pub total_stock: i64,
}

/// Seller sales: orders on own books plus revenue.
#[derive(Debug, Serialize)]
pub struct SellerSalesView {
    pub sales: Vec<OrderView>,
    pub total_revenue: Decimal,
}

// =============================================================================
// Handlers
// =============================================================================

/// Own listings, newest first.
#[instrument(skip(state, user))]
pub async fn books(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<SellerBooksView>> {
    authorize(&user, Action::ViewSales)?;

    let books = BookRepository::new(state.pool()).for_seller(user.id).await?;
    let total_stock = books.iter().map(|b| i64::from(b.stock)).sum();

    Ok(Json(SellerBooksView {
        books: books.iter().map(BookView::from).collect(),
        total_stock,
    }))
}

/// Create a listing owned by the calling seller.
///
/// The created book is mirrored to the secondary store, best-effort.
#[instrument(skip(state, user, form))]
pub async fn create_book(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<CreateBookForm>,
) -> Result<(StatusCode, Json<BookView>)> {
    authorize(&user, Action::AddBook)?;
    validate_book_form(&form)?;

    let book = BookRepository::new(state.pool())
        .create(&NewBook {
            title: form.title.trim().to_owned(),
            author: form.author.trim().to_owned(),
            description: form.description,
            price: form.price,
            stock: form.stock,
            seller_id: Some(user.id),
            image_url: form.image_url,
        })
        .await?;

    if let Some(store) = state.mirror() {
        let store = store.clone();
        let record = BookRecord::from(&book);
        mirror::spawn_best_effort("book", async move { store.put_book(&record).await });
    }

    tracing::info!(book_id = %book.id, seller_id = %user.id, "book listed");

    Ok((StatusCode::CREATED, Json(BookView::from(&book))))
}

/// Delete an own listing.
///
/// Refused while any order references the book, so order history never
/// dangles.
#[instrument(skip(state, user))]
pub async fn delete_book(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    authorize(&user, Action::DeleteOwnBook)?;

    let book_id = BookId::new(id);
    BookRepository::new(state.pool())
        .delete_owned(book_id, user.id)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::Conflict("Cannot delete a book with existing orders".to_owned())
            }
            RepositoryError::NotFound => AppError::NotFound("Book".to_owned()),
            other => AppError::Database(other),
        })?;

    if let Some(store) = state.mirror() {
        let store = store.clone();
        mirror::spawn_best_effort("book", async move { store.remove_book(book_id).await });
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Orders placed against own books, newest first, with revenue total.
#[instrument(skip(state, user))]
pub async fn sales(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<SellerSalesView>> {
    authorize(&user, Action::ViewSales)?;

    let sales = OrderRepository::new(state.pool())
        .for_seller(user.id)
        .await?;
    let total_revenue = sales.iter().map(|s| s.order.total_price).sum();

    Ok(Json(SellerSalesView {
        sales: sales.iter().map(OrderView::from).collect(),
        total_revenue,
    }))
}

// =============================================================================
// Validation
// =============================================================================

/// Shared listing validation for seller and admin creation paths.
pub fn validate_book_form(form: &CreateBookForm) -> Result<()> {
    if form.title.trim().is_empty() || form.author.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and Author are required".to_owned(),
        ));
    }
    if form.price < Decimal::ZERO {
        return Err(AppError::BadRequest("Price cannot be negative".to_owned()));
    }
    if form.stock < 0 {
        return Err(AppError::BadRequest("Stock cannot be negative".to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> CreateBookForm {
        CreateBookForm {
            title: "Dune".to_owned(),
            author: "Frank Herbert".to_owned(),
            description: None,
            price: Decimal::new(1299, 2),
            stock: 4,
            image_url: None,
        }
    }

    #[test]
    fn test_validate_accepts_valid_form() {
        assert!(validate_book_form(&valid_form()).is_ok());
    }

    #[test]
    fn test_validate_requires_title_and_author() {
        let mut form = valid_form();
        form.title = "   ".to_owned();
        assert!(validate_book_form(&form).is_err());

        let mut form = valid_form();
        form.author = String::new();
        assert!(validate_book_form(&form).is_err());
    }

    #[test]
    fn test_validate_rejects_negative_price_and_stock() {
        let mut form = valid_form();
        form.price = Decimal::new(-1, 2);
        assert!(validate_book_form(&form).is_err());

        let mut form = valid_form();
        form.stock = -1;
        assert!(validate_book_form(&form).is_err());
    }
}
