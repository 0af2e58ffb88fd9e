//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`. Internal error text never reaches the client -
//! responses carry a short, non-leaking message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout workflow failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks the role for the action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    /// HTTP status for this error.
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_)
                | AuthError::InvalidUsername
                | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::PasswordHash(_) | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
                CheckoutError::InsufficientStock { .. } | CheckoutError::NotCancellable { .. } => {
                    StatusCode::CONFLICT
                }
                CheckoutError::BookNotFound { .. } | CheckoutError::OrderNotFound => {
                    StatusCode::NOT_FOUND
                }
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Client-facing message; never internal error text.
    fn client_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::InvalidUsername => "Username cannot be empty".to_string(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::PasswordHash(_) | AuthError::Repository(_) => {
                    "Internal server error".to_string()
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart => "Your cart is empty".to_string(),
                CheckoutError::InsufficientStock { title, .. } => {
                    format!("Issue with book \"{title}\": insufficient stock")
                }
                CheckoutError::BookNotFound { .. } => "Book not found".to_string(),
                CheckoutError::OrderNotFound => "Order not found".to_string(),
                CheckoutError::NotCancellable { .. } => {
                    "This order cannot be cancelled as it is already being processed".to_string()
                }
                CheckoutError::Repository(_) => "An error occurred during checkout".to_string(),
            },
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(_) => "Please log in to access this page".to_string(),
            Self::Forbidden(_) => "Access denied".to_string(),
            Self::BadRequest(msg) | Self::Conflict(msg) => msg.clone(),
        }
    }

    /// Whether this error should be captured to Sentry.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Auth(AuthError::PasswordHash(_) | AuthError::Repository(_))
                | Self::Checkout(CheckoutError::Repository(_))
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let body = ErrorBody {
            error: self.client_message(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use bookbazaar_core::BookId;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Book".to_string());
        assert_eq!(err.to_string(), "Not found: Book");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::NotFound("Book".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Unauthorized("no session".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Forbidden("buyer".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_checkout_error_mapping() {
        assert_eq!(
            status_of(AppError::Checkout(CheckoutError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Checkout(CheckoutError::InsufficientStock {
                book_id: BookId::new(1),
                title: "Dune".to_string(),
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Checkout(CheckoutError::OrderNotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let err = AppError::Internal("connection refused at 10.0.0.7:5432".to_string());
        let message = err.client_message();
        assert_eq!(message, "Internal server error");
        assert!(!message.contains("10.0.0.7"));
    }

    #[test]
    fn test_insufficient_stock_names_failing_item() {
        let err = AppError::Checkout(CheckoutError::InsufficientStock {
            book_id: BookId::new(2),
            title: "Dune".to_string(),
        });
        assert_eq!(
            err.client_message(),
            "Issue with book \"Dune\": insufficient stock"
        );
    }
}
