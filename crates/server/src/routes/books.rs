//! Catalog route handlers: paginated listing with search, and book detail.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use bookbazaar_core::{BookId, UserId};

use crate::db::books::BookRepository;
use crate::error::{AppError, Result};
use crate::middleware::auth::RequireAuth;
use crate::models::Book;
use crate::routes::cart::get_cart;
use crate::state::AppState;

/// Books shown per catalog page.
pub const BOOKS_PER_PAGE: u32 = 8;

// =============================================================================
// Query Types
// =============================================================================

/// Catalog listing query parameters.
#[derive(Debug, Deserialize)]
pub struct BooksQuery {
    /// Case-insensitive title/author search.
    pub q: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
}

// =============================================================================
// View Types
// =============================================================================

/// Catalog entry returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct BookView {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub seller_id: Option<UserId>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Book> for BookView {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            description: book.description.clone(),
            price: book.price,
            stock: book.stock,
            seller_id: book.seller_id,
            image_url: book.image_url.clone(),
            created_at: book.created_at,
        }
    }
}

/// One page of the catalog plus cart context.
#[derive(Debug, Serialize)]
pub struct BookListView {
    pub books: Vec<BookView>,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
    pub total_books: u64,
    pub query: Option<String>,
    /// Total units in the session cart, for the badge.
    pub cart_count: u32,
}

// =============================================================================
// Handlers
// =============================================================================

/// Paginated catalog listing with optional search.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    session: Session,
    Query(params): Query<BooksQuery>,
) -> Result<Json<BookListView>> {
    let repo = BookRepository::new(state.pool());
    let page = repo
        .list_paginated(
            params.q.as_deref(),
            params.page.unwrap_or(1),
            BOOKS_PER_PAGE,
        )
        .await?;

    let cart = get_cart(&session).await;

    Ok(Json(BookListView {
        books: page.items.iter().map(BookView::from).collect(),
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages(),
        total_books: page.total_items,
        query: params.q,
        cart_count: cart.count(),
    }))
}

/// Book detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<BookView>> {
    let book = BookRepository::new(state.pool())
        .get_by_id(BookId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Book".to_owned()))?;

    Ok(Json(BookView::from(&book)))
}
