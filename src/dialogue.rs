//! Conversation state kept per Telegram chat.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::checkout::{CheckoutDraft, CheckoutStep};
use crate::model::TieField;

/// Steps of the admin "add tie" conversation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieDraftStep {
    Name,
    Color,
    Price,
    Description,
    Photo,
}

impl TieDraftStep {
    pub fn prompt_key(&self) -> &'static str {
        match self {
            TieDraftStep::Name => "admin-add-ask-name",
            TieDraftStep::Color => "admin-add-ask-color",
            TieDraftStep::Price => "admin-add-ask-price",
            TieDraftStep::Description => "admin-add-ask-description",
            TieDraftStep::Photo => "admin-add-ask-photo",
        }
    }
}

/// Fields collected so far while adding a tie
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieDraft {
    pub name: Option<String>,
    pub color: Option<String>,
    pub price: Option<i64>,
    pub description: Option<String>,
}

/// Recipients of a broadcast
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastTarget {
    All,
    User(i64),
}

/// What the next free-form message from a chat means
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    #[default]
    Idle,
    Checkout {
        tie_id: i64,
        step: CheckoutStep,
        draft: CheckoutDraft,
    },
    AddingTie {
        step: TieDraftStep,
        draft: TieDraft,
    },
    EditingTie {
        tie_id: i64,
        field: TieField,
    },
    ComposingBroadcast {
        target: BroadcastTarget,
    },
    AwaitingDeliveryDays {
        order_id: i64,
    },
    ConfirmingPurge,
}

impl SessionMode {
    /// Start a checkout for `tie_id` at the first question
    pub fn checkout(tie_id: i64) -> Self {
        SessionMode::Checkout {
            tie_id,
            step: CheckoutStep::FIRST,
            draft: CheckoutDraft::default(),
        }
    }

    /// Start adding a tie at the first question
    pub fn adding_tie() -> Self {
        SessionMode::AddingTie {
            step: TieDraftStep::Name,
            draft: TieDraft::default(),
        }
    }

    /// Modes only an admin may be in
    pub fn requires_admin(&self) -> bool {
        !matches!(self, SessionMode::Idle | SessionMode::Checkout { .. })
    }
}

/// Type alias for the per-chat dialogue
pub type ShopDialogue = Dialogue<SessionMode, InMemStorage<SessionMode>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_modes() {
        assert!(!SessionMode::Idle.requires_admin());
        assert!(!SessionMode::checkout(1).requires_admin());
        assert!(SessionMode::adding_tie().requires_admin());
        assert!(SessionMode::ConfirmingPurge.requires_admin());
        assert!(SessionMode::AwaitingDeliveryDays { order_id: 3 }.requires_admin());
    }
}
