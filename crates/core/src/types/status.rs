//! Normalized order and payment statuses from the storefront channel.
//!
//! Channel payloads spell statuses inconsistently (casing, en-US vs en-GB
//! variants); everything is normalized to lower case at the boundary and
//! unknown values are preserved rather than dropped, so an order is never
//! rejected just because the channel introduced a new status string.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a channel order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Closed,
    Cancelled,
    /// A status string this version does not recognize, kept verbatim
    /// (lower-cased) for storage and logging.
    Other(String),
}

impl OrderStatus {
    /// Normalize a raw channel status string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "open" | "pending" => Self::Open,
            "closed" | "completed" => Self::Closed,
            "cancelled" | "canceled" | "voided" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this status means the order was cancelled or voided.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Stored/lower-case representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized payment status of a channel order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Authorized,
    Paid,
    PartiallyPaid,
    Refunded,
    PartiallyRefunded,
    Cancelled,
    /// Unrecognized status, kept verbatim (lower-cased).
    Other(String),
}

impl PaymentStatus {
    /// Normalize a raw channel payment status string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pending" | "" => Self::Pending,
            "authorized" => Self::Authorized,
            "paid" => Self::Paid,
            "partially_paid" => Self::PartiallyPaid,
            "refunded" => Self::Refunded,
            "partially_refunded" => Self::PartiallyRefunded,
            "cancelled" | "canceled" | "voided" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }

    /// Normalize a payment status in the context of its order status.
    ///
    /// A cancelled order forces the payment status to [`Self::Cancelled`]
    /// regardless of what the channel payload says.
    #[must_use]
    pub fn normalized_for(raw: &str, order_status: &OrderStatus) -> Self {
        if order_status.is_cancelled() {
            Self::Cancelled
        } else {
            Self::parse(raw)
        }
    }

    /// Whether inventory should be debited for an order in this state.
    #[must_use]
    pub const fn is_chargeable(&self) -> bool {
        matches!(self, Self::Paid | Self::Authorized)
    }

    /// Stored/lower-case representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::Paid => "paid",
            Self::PartiallyPaid => "partially_paid",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
            Self::Cancelled => "cancelled",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_normalizes_case_and_spelling() {
        assert_eq!(OrderStatus::parse("Cancelled"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::parse("CANCELED"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::parse("voided"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::parse(" Open "), OrderStatus::Open);
    }

    #[test]
    fn test_unknown_status_preserved_lowercase() {
        let status = OrderStatus::parse("In-Dispute");
        assert_eq!(status, OrderStatus::Other("in-dispute".to_string()));
        assert_eq!(status.as_str(), "in-dispute");
    }

    #[test]
    fn test_cancelled_order_forces_payment_cancelled() {
        let cancelled = OrderStatus::Cancelled;
        // Channel still says "paid" - cancellation wins.
        assert_eq!(
            PaymentStatus::normalized_for("paid", &cancelled),
            PaymentStatus::Cancelled
        );
        let open = OrderStatus::Open;
        assert_eq!(
            PaymentStatus::normalized_for("paid", &open),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn test_chargeable_states() {
        assert!(PaymentStatus::Paid.is_chargeable());
        assert!(PaymentStatus::Authorized.is_chargeable());
        assert!(!PaymentStatus::Pending.is_chargeable());
        assert!(!PaymentStatus::Cancelled.is_chargeable());
        assert!(!PaymentStatus::Refunded.is_chargeable());
    }
}
