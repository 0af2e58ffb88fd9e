//! Business services.
//!
//! - [`auth`] - registration and login over argon2 password hashes
//! - [`checkout`] - the order placement / cancellation workflow
//! - [`mirror`] - best-effort replication to the secondary key-value store
//! - [`notify`] - pluggable order notifications (log or pub/sub topic)

pub mod auth;
pub mod checkout;
pub mod mirror;
pub mod notify;

pub use auth::{AuthError, AuthService};
pub use checkout::{CheckoutError, CheckoutService};
pub use mirror::{MirrorError, MirrorStore};
pub use notify::Notifier;
