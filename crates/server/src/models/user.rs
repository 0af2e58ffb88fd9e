//! User domain type.

use chrono::{DateTime, Utc};

use bookbazaar_core::{Email, Role, UserId};

/// A store account (domain type).
///
/// The password credential is never part of this type - it stays inside the
/// auth service as a salted hash.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Unique email address, used for login and notifications.
    pub email: Email,
    /// Role: buyer, seller, or admin.
    pub role: Role,
    /// Seller credential-approval flag, toggled by admins.
    pub is_validated: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}
