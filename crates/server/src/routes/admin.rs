//! Admin route handlers: store statistics, user management, stock edits.
//!
//! Every handler authorizes against the role permission table; `admin`
//! implicitly allows every action.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bookbazaar_core::{Action, BookId, Role, UserId};

use crate::db::books::{BookRepository, NewBook};
use crate::db::orders::OrderRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::auth::{RequireAuth, authorize};
use crate::models::User;
use crate::routes::books::BookView;
use crate::routes::orders::OrderView;
use crate::routes::seller::{CreateBookForm, validate_book_form};
use crate::services::mirror::{self, BookRecord};
use crate::state::AppState;

/// Books with stock below this show up in the low-stock report.
const LOW_STOCK_THRESHOLD: i32 = 10;

/// How many recent orders the dashboard shows.
const RECENT_ORDERS_LIMIT: i64 = 10;

// =============================================================================
// Query / Form Types
// =============================================================================

/// User listing filter.
#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    /// Restrict to one role (`buyer`, `seller`, `admin`).
    pub role: Option<String>,
}

/// Stock edit form data.
#[derive(Debug, Deserialize)]
pub struct UpdateStockForm {
    pub amount: i32,
    /// `set` replaces the stock level, `add` tops it up.
    #[serde(default)]
    pub mode: StockMode,
}

/// Stock edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockMode {
    #[default]
    Set,
    Add,
}

/// Role promotion form data.
#[derive(Debug, Deserialize)]
pub struct PromoteForm {
    /// Target role: `seller` or `admin`.
    pub role: Role,
}

// =============================================================================
// View Types
// =============================================================================

/// Account data shown to admins.
#[derive(Debug, Serialize)]
pub struct AdminUserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_validated: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for AdminUserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.to_string(),
            role: user.role,
            is_validated: user.is_validated,
            created_at: user.created_at,
        }
    }
}

/// Store-wide statistics for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct AdminStatsView {
    pub total_buyers: i64,
    pub total_sellers: i64,
    pub total_books: i64,
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub in_stock: i64,
    pub out_of_stock: i64,
    pub order_status_counts: Vec<StatusCount>,
    pub low_stock_books: Vec<BookView>,
    pub recent_orders: Vec<OrderView>,
}

/// One order-status bucket.
#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Message-plus-user response for role mutations.
#[derive(Debug, Serialize)]
pub struct UserActionResponse {
    pub message: String,
    pub user: AdminUserView,
}

// =============================================================================
// Handlers
// =============================================================================

/// Store-wide statistics.
#[instrument(skip(state, user))]
pub async fn stats(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<AdminStatsView>> {
    authorize(&user, Action::ViewReports)?;

    let users = UserRepository::new(state.pool());
    let books = BookRepository::new(state.pool());
    let orders = OrderRepository::new(state.pool());

    let total_buyers = users.count_by_role(Role::Buyer).await?;
    let total_sellers = users.count_by_role(Role::Seller).await?;
    let total_books = books.count(None).await?;
    let in_stock = books.count(Some(true)).await?;
    let out_of_stock = books.count(Some(false)).await?;
    let total_orders = orders.count().await?;
    let total_revenue = orders.revenue_total().await?;
    let low_stock = books.low_stock(LOW_STOCK_THRESHOLD).await?;
    let recent = orders.recent(RECENT_ORDERS_LIMIT).await?;
    let status_counts = orders.status_counts().await?;

    Ok(Json(AdminStatsView {
        total_buyers,
        total_sellers,
        total_books,
        total_orders,
        total_revenue,
        in_stock,
        out_of_stock,
        order_status_counts: status_counts
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
        low_stock_books: low_stock.iter().map(BookView::from).collect(),
        recent_orders: recent
            .iter()
            .map(|order| OrderView::from_order(order, None))
            .collect(),
    }))
}

/// List users, optionally filtered by role.
#[instrument(skip(state, user))]
pub async fn users(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<UsersQuery>,
) -> Result<Json<Vec<AdminUserView>>> {
    authorize(&user, Action::ManageUsers)?;

    let role = match params.role.as_deref() {
        None | Some("all") => None,
        Some(raw) => Some(
            raw.parse::<Role>()
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
        ),
    };

    let listed = UserRepository::new(state.pool()).list(role).await?;

    Ok(Json(listed.iter().map(AdminUserView::from).collect()))
}

/// Add a system-owned book (no seller).
#[instrument(skip(state, user, form))]
pub async fn add_book(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<CreateBookForm>,
) -> Result<(StatusCode, Json<BookView>)> {
    authorize(&user, Action::ManageStock)?;
    validate_book_form(&form)?;

    let book = BookRepository::new(state.pool())
        .create(&NewBook {
            title: form.title.trim().to_owned(),
            author: form.author.trim().to_owned(),
            description: form.description,
            price: form.price,
            stock: form.stock,
            seller_id: None,
            image_url: form.image_url,
        })
        .await?;

    if let Some(store) = state.mirror() {
        let store = store.clone();
        let record = BookRecord::from(&book);
        mirror::spawn_best_effort("book", async move { store.put_book(&record).await });
    }

    Ok((StatusCode::CREATED, Json(BookView::from(&book))))
}

/// Set or add stock on a book.
#[instrument(skip(state, user))]
pub async fn update_stock(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Json(form): Json<UpdateStockForm>,
) -> Result<Json<BookView>> {
    authorize(&user, Action::ManageStock)?;

    if form.amount < 0 {
        return Err(AppError::BadRequest(
            "Stock amount cannot be negative".to_owned(),
        ));
    }

    let repo = BookRepository::new(state.pool());
    let book_id = BookId::new(id);
    let book = match form.mode {
        StockMode::Set => repo.set_stock(book_id, form.amount).await,
        StockMode::Add => repo.add_stock(book_id, form.amount).await,
    }
    .map_err(|e| match e {
        crate::db::RepositoryError::NotFound => AppError::NotFound("Book".to_owned()),
        other => AppError::Database(other),
    })?;

    Ok(Json(BookView::from(&book)))
}

/// Promote a user to seller or admin.
///
/// Promotion to seller is only valid from buyer; promotion to admin from
/// any non-admin role.
#[instrument(skip(state, user))]
pub async fn promote_user(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Json(form): Json<PromoteForm>,
) -> Result<Json<UserActionResponse>> {
    authorize(&user, Action::ManageUsers)?;

    let repo = UserRepository::new(state.pool());
    let target_id = UserId::new(id);
    let target = repo
        .get_by_id(target_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_owned()))?;

    match form.role {
        Role::Admin => {
            if target.role == Role::Admin {
                return Err(AppError::Conflict(format!(
                    "User {} is already an admin",
                    target.username
                )));
            }
        }
        Role::Seller => {
            if target.role != Role::Buyer {
                return Err(AppError::Conflict(
                    "Only buyers can be promoted to seller".to_owned(),
                ));
            }
        }
        Role::Buyer => {
            return Err(AppError::BadRequest(
                "Use the revoke endpoint to demote a user".to_owned(),
            ));
        }
    }

    repo.set_role(target_id, form.role).await?;
    let updated = repo
        .get_by_id(target_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_owned()))?;

    Ok(Json(UserActionResponse {
        message: format!(
            "User {} promoted to {} successfully!",
            updated.username, form.role
        ),
        user: AdminUserView::from(&updated),
    }))
}

/// Demote a user back to buyer.
///
/// Self-protection: an admin cannot revoke their own role.
#[instrument(skip(state, user))]
pub async fn revoke_user(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<UserActionResponse>> {
    authorize(&user, Action::ManageUsers)?;

    let target_id = UserId::new(id);
    if target_id == user.id {
        return Err(AppError::Conflict(
            "You cannot revoke your own admin status".to_owned(),
        ));
    }

    let repo = UserRepository::new(state.pool());
    let target = repo
        .get_by_id(target_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_owned()))?;

    if target.role == Role::Buyer {
        return Err(AppError::Conflict(format!(
            "User {} is already a buyer",
            target.username
        )));
    }

    repo.set_role(target_id, Role::Buyer).await?;
    let updated = repo
        .get_by_id(target_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_owned()))?;

    Ok(Json(UserActionResponse {
        message: format!("Role revoked for user {}.", updated.username),
        user: AdminUserView::from(&updated),
    }))
}

/// Toggle a seller's credential-validation flag.
#[instrument(skip(state, user))]
pub async fn validate_user(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<UserActionResponse>> {
    authorize(&user, Action::ManageUsers)?;

    let repo = UserRepository::new(state.pool());
    let target_id = UserId::new(id);

    repo.toggle_validation(target_id).await.map_err(|e| match e {
        crate::db::RepositoryError::NotFound => AppError::NotFound("User".to_owned()),
        other => AppError::Database(other),
    })?;

    let updated = repo
        .get_by_id(target_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_owned()))?;

    let status = if updated.is_validated {
        "validated"
    } else {
        "unvalidated"
    };

    Ok(Json(UserActionResponse {
        message: format!("User {} is now {status}.", updated.username),
        user: AdminUserView::from(&updated),
    }))
}
