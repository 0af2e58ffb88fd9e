//! Order status lifecycle.

use serde::{Deserialize, Serialize};

/// Fulfillment status of an order.
///
/// Orders are created `Placed` and mutated only by status transitions.
/// Only a `Placed` order may be cancelled; cancellation restores the
/// book's stock by the order quantity. Stored as text (`Placed`,
/// `Shipped`, ...) in the primary store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Created at checkout; the only cancellable state.
    #[default]
    Placed,
    /// Handed to fulfillment.
    Shipped,
    /// Received by the buyer.
    Delivered,
    /// Cancelled by the buyer while still `Placed`.
    Cancelled,
}

impl OrderStatus {
    /// Whether an order in this status may still be cancelled.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Placed)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed => write!(f, "Placed"),
            Self::Shipped => write!(f, "Shipped"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid order status: {0}")]
pub struct OrderStatusParseError(pub String);

impl std::str::FromStr for OrderStatus {
    type Err = OrderStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Placed" => Ok(Self::Placed),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(OrderStatusParseError(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_only_placed_is_cancellable() {
        assert!(OrderStatus::Placed.is_cancellable());
        assert!(!OrderStatus::Shipped.is_cancellable());
        assert!(!OrderStatus::Delivered.is_cancellable());
        assert!(!OrderStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            OrderStatus::Placed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("Returned".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_default_is_placed() {
        assert_eq!(OrderStatus::default(), OrderStatus::Placed);
    }
}
