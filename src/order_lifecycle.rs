//! # Order Lifecycle Module
//!
//! The order status state machine. Every status change goes through
//! [`OrderStatus::apply`], which holds the single transition table:
//!
//! | From                   | To                     | Actor | Action           |
//! |------------------------|------------------------|-------|------------------|
//! | pending_payment        | pending_admin_review   | buyer | `ClaimPayment`   |
//! | pending_payment        | cancelled              | buyer | `Cancel`         |
//! | pending_admin_review   | confirmed              | admin | `Approve`        |
//! | pending_admin_review   | rejected               | admin | `Reject`         |
//! | confirmed              | in_delivery            | admin | `Dispatch`       |
//! | in_delivery            | delivered              | admin | `MarkDelivered`  |
//! | delivered              | completed              | buyer | `ConfirmReceipt` |
//!
//! `rejected`, `completed` and `cancelled` are terminal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Field, ValidationError, ValidationIssue};

/// Order status as persisted in both store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    PendingAdminReview,
    Confirmed,
    InDelivery,
    Delivered,
    Completed,
    Rejected,
    Cancelled,
}

/// Who performs a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Buyer,
    Admin,
}

/// A request to move an order forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    ClaimPayment,
    Approve,
    Reject,
    Dispatch { days: u32 },
    MarkDelivered,
    ConfirmReceipt,
    Cancel,
}

/// Why a transition was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The action is not allowed from the current status
    NotAllowed { from: OrderStatus },
    /// The action belongs to the other actor
    WrongActor { required: Actor },
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::PendingPayment,
        OrderStatus::PendingAdminReview,
        OrderStatus::Confirmed,
        OrderStatus::InDelivery,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::Rejected,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::PendingAdminReview => "pending_admin_review",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::InDelivery => "in_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Localization key for the buyer-facing status label
    pub fn label_key(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "status-pending-payment",
            OrderStatus::PendingAdminReview => "status-pending-admin-review",
            OrderStatus::Confirmed => "status-confirmed",
            OrderStatus::InDelivery => "status-in-delivery",
            OrderStatus::Delivered => "status-delivered",
            OrderStatus::Completed => "status-completed",
            OrderStatus::Rejected => "status-rejected",
            OrderStatus::Cancelled => "status-cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    /// Statuses still waiting on the buyer's payment or on admin verification
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            OrderStatus::PendingPayment | OrderStatus::PendingAdminReview
        )
    }

    /// Compute the status reached by applying `action` as `actor`
    pub fn apply(self, action: OrderAction, actor: Actor) -> Result<OrderStatus, TransitionError> {
        let (from, to, required) = action.edge();
        if actor != required {
            return Err(TransitionError::WrongActor { required });
        }
        if self != from {
            return Err(TransitionError::NotAllowed { from: self });
        }
        Ok(to)
    }

    /// Actions that may legally follow this status
    pub fn available_actions(&self) -> Vec<OrderAction> {
        OrderAction::TEMPLATES
            .iter()
            .copied()
            .filter(|action| action.edge().0 == *self)
            .collect()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status '{s}'"))
    }
}

impl OrderAction {
    /// One instance of every action, used to enumerate the table
    const TEMPLATES: [OrderAction; 7] = [
        OrderAction::ClaimPayment,
        OrderAction::Cancel,
        OrderAction::Approve,
        OrderAction::Reject,
        OrderAction::Dispatch { days: 1 },
        OrderAction::MarkDelivered,
        OrderAction::ConfirmReceipt,
    ];

    /// (from, to, actor) edge of the transition table
    fn edge(&self) -> (OrderStatus, OrderStatus, Actor) {
        use OrderStatus::*;
        match self {
            OrderAction::ClaimPayment => (PendingPayment, PendingAdminReview, Actor::Buyer),
            OrderAction::Cancel => (PendingPayment, Cancelled, Actor::Buyer),
            OrderAction::Approve => (PendingAdminReview, Confirmed, Actor::Admin),
            OrderAction::Reject => (PendingAdminReview, Rejected, Actor::Admin),
            OrderAction::Dispatch { .. } => (Confirmed, InDelivery, Actor::Admin),
            OrderAction::MarkDelivered => (InDelivery, Delivered, Actor::Admin),
            OrderAction::ConfirmReceipt => (Delivered, Completed, Actor::Buyer),
        }
    }

    pub fn actor(&self) -> Actor {
        self.edge().2
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderAction::ClaimPayment => "claim payment",
            OrderAction::Approve => "approve",
            OrderAction::Reject => "reject",
            OrderAction::Dispatch { .. } => "dispatch",
            OrderAction::MarkDelivered => "mark delivered",
            OrderAction::ConfirmReceipt => "confirm receipt",
            OrderAction::Cancel => "cancel",
        }
    }
}

/// Parse an admin-entered delivery estimate in whole days
pub fn parse_delivery_days(input: &str) -> Result<u32, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(Field::DeliveryDays, ValidationIssue::Empty));
    }
    let days: i64 = trimmed
        .parse()
        .map_err(|_| ValidationError::new(Field::DeliveryDays, ValidationIssue::NotANumber))?;
    if days <= 0 {
        return Err(ValidationError::new(Field::DeliveryDays, ValidationIssue::NotPositive));
    }
    u32::try_from(days)
        .map_err(|_| ValidationError::new(Field::DeliveryDays, ValidationIssue::NotANumber))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let status = OrderStatus::PendingPayment;
        let status = status.apply(OrderAction::ClaimPayment, Actor::Buyer).unwrap();
        let status = status.apply(OrderAction::Approve, Actor::Admin).unwrap();
        let status = status.apply(OrderAction::Dispatch { days: 5 }, Actor::Admin).unwrap();
        let status = status.apply(OrderAction::MarkDelivered, Actor::Admin).unwrap();
        let status = status.apply(OrderAction::ConfirmReceipt, Actor::Buyer).unwrap();
        assert_eq!(status, OrderStatus::Completed);
    }

    #[test]
    fn test_terminal_states_have_no_actions() {
        for status in OrderStatus::ALL {
            if status.is_terminal() {
                assert!(status.available_actions().is_empty(), "{status} should be terminal");
            } else {
                assert!(!status.available_actions().is_empty(), "{status} should not be terminal");
            }
        }
    }

    fn allowed_edge(from: OrderStatus, action: OrderAction) -> Option<(OrderStatus, Actor)> {
        use OrderStatus::*;
        match (from, action) {
            (PendingPayment, OrderAction::ClaimPayment) => Some((PendingAdminReview, Actor::Buyer)),
            (PendingPayment, OrderAction::Cancel) => Some((Cancelled, Actor::Buyer)),
            (PendingAdminReview, OrderAction::Approve) => Some((Confirmed, Actor::Admin)),
            (PendingAdminReview, OrderAction::Reject) => Some((Rejected, Actor::Admin)),
            (Confirmed, OrderAction::Dispatch { .. }) => Some((InDelivery, Actor::Admin)),
            (InDelivery, OrderAction::MarkDelivered) => Some((Delivered, Actor::Admin)),
            (Delivered, OrderAction::ConfirmReceipt) => Some((Completed, Actor::Buyer)),
            _ => None,
        }
    }

    #[test]
    fn test_only_table_edges_are_allowed() {
        let mut allowed = 0;
        for from in OrderStatus::ALL {
            for action in OrderAction::TEMPLATES {
                for actor in [Actor::Buyer, Actor::Admin] {
                    let result = from.apply(action, actor);
                    match allowed_edge(from, action) {
                        Some((to, required)) if required == actor => {
                            assert_eq!(result, Ok(to), "{from} + {}", action.name());
                            allowed += 1;
                        }
                        _ => assert!(result.is_err(), "{from} + {} by {actor:?}", action.name()),
                    }
                }
            }
        }
        assert_eq!(allowed, 7);
    }

    #[test]
    fn test_wrong_actor_is_refused() {
        let result = OrderStatus::PendingAdminReview.apply(OrderAction::Approve, Actor::Buyer);
        assert_eq!(result, Err(TransitionError::WrongActor { required: Actor::Admin }));
    }

    #[test]
    fn test_delivery_days_parsing() {
        assert_eq!(parse_delivery_days(" 5 ").unwrap(), 5);
        assert_eq!(
            parse_delivery_days("soon").unwrap_err().issue,
            ValidationIssue::NotANumber
        );
        assert_eq!(
            parse_delivery_days("0").unwrap_err().issue,
            ValidationIssue::NotPositive
        );
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("pending".parse::<OrderStatus>().is_err());
    }
}
