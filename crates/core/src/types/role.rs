//! User roles and the role/action permission table.
//!
//! Authorization is a pure predicate over `(role, action)` - no state, no
//! side effects. Privileged handlers call [`Role::allows`] before mutating
//! anything; `Admin` implicitly allows every action.

use serde::{Deserialize, Serialize};

/// A user's role in the store.
///
/// Stored in the database as lowercase text (`buyer`, `seller`, `admin`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular customer: browses the catalog and places orders.
    #[default]
    Buyer,
    /// Validated merchant: manages their own books and views their sales.
    Seller,
    /// Store operator: full access to every action.
    Admin,
}

/// Privileged actions consulted through the permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Browse the catalog.
    ViewBooks,
    /// Place an order at checkout.
    CreateOrder,
    /// Cancel one's own placed order.
    CancelOwnOrder,
    /// Add a book to the catalog.
    AddBook,
    /// Delete one's own book listing.
    DeleteOwnBook,
    /// View orders placed against one's own books.
    ViewSales,
    /// Manage user accounts (roles, validation).
    ManageUsers,
    /// Edit stock levels on any book.
    ManageStock,
    /// View store-wide reports and statistics.
    ViewReports,
}

impl Role {
    /// Whether this role may perform `action`.
    ///
    /// Admin allows everything; buyers and sellers get the explicit sets
    /// below. Sellers retain the buyer actions - a merchant can still shop.
    #[must_use]
    pub const fn allows(self, action: Action) -> bool {
        match self {
            Self::Admin => true,
            Self::Buyer => matches!(
                action,
                Action::ViewBooks | Action::CreateOrder | Action::CancelOwnOrder
            ),
            Self::Seller => matches!(
                action,
                Action::ViewBooks
                    | Action::CreateOrder
                    | Action::CancelOwnOrder
                    | Action::AddBook
                    | Action::DeleteOwnBook
                    | Action::ViewSales
            ),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Seller => write!(f, "seller"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            other => Err(RoleParseError(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_allows_everything() {
        for action in [
            Action::ViewBooks,
            Action::CreateOrder,
            Action::CancelOwnOrder,
            Action::AddBook,
            Action::DeleteOwnBook,
            Action::ViewSales,
            Action::ManageUsers,
            Action::ManageStock,
            Action::ViewReports,
        ] {
            assert!(Role::Admin.allows(action), "admin denied {action:?}");
        }
    }

    #[test]
    fn test_buyer_permissions() {
        assert!(Role::Buyer.allows(Action::ViewBooks));
        assert!(Role::Buyer.allows(Action::CreateOrder));
        assert!(Role::Buyer.allows(Action::CancelOwnOrder));
        assert!(!Role::Buyer.allows(Action::AddBook));
        assert!(!Role::Buyer.allows(Action::ManageUsers));
        assert!(!Role::Buyer.allows(Action::ManageStock));
    }

    #[test]
    fn test_seller_permissions() {
        assert!(Role::Seller.allows(Action::AddBook));
        assert!(Role::Seller.allows(Action::DeleteOwnBook));
        assert!(Role::Seller.allows(Action::ViewSales));
        // Sellers can still shop
        assert!(Role::Seller.allows(Action::CreateOrder));
        // But cannot administer the store
        assert!(!Role::Seller.allows(Action::ManageUsers));
        assert!(!Role::Seller.allows(Action::ViewReports));
    }

    #[test]
    fn test_role_string_roundtrip() {
        for role in [Role::Buyer, Role::Seller, Role::Admin] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Seller).unwrap(), "\"seller\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
