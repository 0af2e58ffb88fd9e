//! HTTP route handlers for the store.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (DB ping)
//!
//! # Auth
//! POST /auth/register          - Create a buyer account
//! POST /auth/login             - Login, establishes the session
//! POST /auth/logout            - Logout, destroys the session
//! GET  /auth/me                - Current session identity
//!
//! # Catalog
//! GET  /books                  - Paginated catalog with ?q= search
//! GET  /books/{id}             - Book detail
//!
//! # Cart (session-scoped)
//! GET  /cart                   - Cart lines priced at current book prices
//! POST /cart/add/{book_id}     - Add one unit
//! POST /cart/update/{book_id}  - Set quantity (0 removes; clamped to stock)
//! POST /cart/remove/{book_id}  - Remove a line
//!
//! # Checkout & Orders
//! POST /checkout               - Place orders for every cart line
//! GET  /orders                 - Buyer's order history
//! GET  /orders/{id}            - Order confirmation (owner only)
//! POST /orders/{id}/cancel     - Cancel a placed order
//!
//! # Seller (role-gated)
//! GET    /seller/books         - Own listings + stock totals
//! POST   /seller/books         - Create a listing
//! DELETE /seller/books/{id}    - Delete an unreferenced listing
//! GET    /seller/sales         - Orders on own books + revenue
//!
//! # Admin (role-gated)
//! GET  /admin/stats                    - Store-wide statistics
//! GET  /admin/users                    - Users, optionally ?role=
//! POST /admin/books                    - Add a system-owned book
//! POST /admin/books/{id}/stock         - Set or add stock
//! POST /admin/users/{id}/promote       - Promote buyer->seller / ->admin
//! POST /admin/users/{id}/revoke        - Demote back to buyer
//! POST /admin/users/{id}/validate      - Toggle seller validation
//! ```

pub mod admin;
pub mod auth;
pub mod books;
pub mod cart;
pub mod orders;
pub mod seller;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the catalog routes router.
pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(books::index))
        .route("/{id}", get(books::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{book_id}", post(cart::add))
        .route("/update/{book_id}", post(cart::update))
        .route("/remove/{book_id}", post(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the seller routes router.
pub fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(seller::books).post(seller::create_book))
        .route("/books/{id}", delete(seller::delete_book))
        .route("/sales", get(seller::sales))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(admin::stats))
        .route("/users", get(admin::users))
        .route("/books", post(admin::add_book))
        .route("/books/{id}/stock", post(admin::update_stock))
        .route("/users/{id}/promote", post(admin::promote_user))
        .route("/users/{id}/revoke", post(admin::revoke_user))
        .route("/users/{id}/validate", post(admin::validate_user))
}

/// Create all routes for the server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/books", book_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(orders::checkout))
        .nest("/orders", order_routes())
        .nest("/seller", seller_routes())
        .nest("/admin", admin_routes())
}
