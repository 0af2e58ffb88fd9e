//! Authentication route handlers.
//!
//! Registration, login, and logout over the session layer. Login failures
//! return one uniform message, never revealing whether the email exists.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use bookbazaar_core::{Role, UserId};

use crate::error::{AppError, Result};
use crate::middleware::auth::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::mirror::{self, UserRecord};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

// =============================================================================
// View Types
// =============================================================================

/// Account data returned to clients.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.to_string(),
            role: user.role,
        }
    }
}

impl From<&CurrentUser> for UserView {
    fn from(user: &CurrentUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.to_string(),
            role: user.role,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new buyer account.
///
/// The created user is mirrored to the secondary store, best-effort.
#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> Result<impl IntoResponse> {
    let (user, password_hash) = state
        .auth()
        .register(&form.username, &form.email, &form.password)
        .await?;

    if let Some(store) = state.mirror() {
        let store = store.clone();
        let record = UserRecord::new(&user, &password_hash);
        mirror::spawn_best_effort("user", async move { store.put_user(&record).await });
    }

    tracing::info!(user_id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

/// Login with email and password; establishes the session.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<UserView>> {
    let user = state.auth().login(&form.email, &form.password).await?;

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("failed to set session: {e}")))?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(UserView::from(&user)))
}

/// Logout: clears the identity and destroys the whole session (cart included).
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session user: {e}");
    }

    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("failed to flush session: {e}")))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Current session identity.
#[instrument(skip_all)]
pub async fn me(RequireAuth(user): RequireAuth) -> Json<UserView> {
    Json(UserView::from(&user))
}
