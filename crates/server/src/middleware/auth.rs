//! Authentication extractors and the authorization guard.
//!
//! [`RequireAuth`] pulls the logged-in identity out of the session;
//! [`authorize`] is the pure role/action predicate privileged handlers call
//! before mutating anything.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use bookbazaar_core::Action;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Rejection returned when authentication is required but missing.
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Please log in to access this page" })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts.extensions.get::<Session>().ok_or(AuthRejection)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or(AuthRejection)?;

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request when nobody is
/// logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Authorize `user` for `action` via the role permission table.
///
/// Pure predicate, no side effects; the uniform denial message leaks
/// nothing about the resource.
///
/// # Errors
///
/// Returns `AppError::Forbidden` when the role does not allow the action.
pub fn authorize(user: &CurrentUser, action: Action) -> Result<(), AppError> {
    if user.role.allows(action) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role {} denied {action:?}",
            user.role
        )))
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bookbazaar_core::{Email, Role, UserId};

    fn user_with_role(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            username: "someone".to_owned(),
            email: Email::parse("someone@example.com").unwrap(),
            role,
        }
    }

    #[test]
    fn test_authorize_allows_matching_role() {
        let seller = user_with_role(Role::Seller);
        assert!(authorize(&seller, Action::AddBook).is_ok());
    }

    #[test]
    fn test_authorize_denies_with_forbidden() {
        let buyer = user_with_role(Role::Buyer);
        let err = authorize(&buyer, Action::ManageUsers).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_authorize_admin_allows_everything() {
        let admin = user_with_role(Role::Admin);
        assert!(authorize(&admin, Action::ManageUsers).is_ok());
        assert!(authorize(&admin, Action::AddBook).is_ok());
        assert!(authorize(&admin, Action::ViewReports).is_ok());
    }
}
