//! Inline button payloads.
//!
//! Telegram hands callback data back as a short string. Every button the shop
//! sends is described by one [`CallbackData`] value, encoded with `Display`
//! and decoded with `FromStr`, so handlers match on variants instead of
//! string prefixes.

use std::fmt;
use std::str::FromStr;

use crate::model::{Language, TieField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackData {
    SetLanguage(Language),
    ChangeLanguage,
    Menu,
    /// Catalog card at a position in the active listing
    Catalog { index: usize },
    Buy { tie_id: i64 },
    Pay,
    CancelCheckout,
    MyOrders,
    Paid { order_id: i64 },
    CancelOrder { order_id: i64 },
    Received { order_id: i64 },
    AdminPanel,
    AdminOrders,
    Approve { order_id: i64 },
    Reject { order_id: i64 },
    AskDeliveryDays { order_id: i64 },
    Delivered { order_id: i64 },
    AdminCatalog,
    AddTie,
    EditTie { tie_id: i64 },
    EditField { tie_id: i64, field: TieField },
    DeleteTie { tie_id: i64 },
    ToggleTie { tie_id: i64 },
    BroadcastAll,
    BroadcastPick,
    BroadcastUser { telegram_id: i64 },
    Report,
    Purge,
}

impl CallbackData {
    /// Whether pressing this button requires admin rights
    pub fn is_admin_action(&self) -> bool {
        matches!(
            self,
            CallbackData::AdminPanel
                | CallbackData::AdminOrders
                | CallbackData::Approve { .. }
                | CallbackData::Reject { .. }
                | CallbackData::AskDeliveryDays { .. }
                | CallbackData::Delivered { .. }
                | CallbackData::AdminCatalog
                | CallbackData::AddTie
                | CallbackData::EditTie { .. }
                | CallbackData::EditField { .. }
                | CallbackData::DeleteTie { .. }
                | CallbackData::ToggleTie { .. }
                | CallbackData::BroadcastAll
                | CallbackData::BroadcastPick
                | CallbackData::BroadcastUser { .. }
                | CallbackData::Report
                | CallbackData::Purge
        )
    }
}

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackData::SetLanguage(lang) => write!(f, "lang_{}", lang.code()),
            CallbackData::ChangeLanguage => f.write_str("change_lang"),
            CallbackData::Menu => f.write_str("menu"),
            CallbackData::Catalog { index } => write!(f, "cat_{index}"),
            CallbackData::Buy { tie_id } => write!(f, "buy_{tie_id}"),
            CallbackData::Pay => f.write_str("pay"),
            CallbackData::CancelCheckout => f.write_str("cancel_checkout"),
            CallbackData::MyOrders => f.write_str("my_orders"),
            CallbackData::Paid { order_id } => write!(f, "paid_{order_id}"),
            CallbackData::CancelOrder { order_id } => write!(f, "cancel_order_{order_id}"),
            CallbackData::Received { order_id } => write!(f, "received_{order_id}"),
            CallbackData::AdminPanel => f.write_str("admin"),
            CallbackData::AdminOrders => f.write_str("admin_orders"),
            CallbackData::Approve { order_id } => write!(f, "approve_{order_id}"),
            CallbackData::Reject { order_id } => write!(f, "reject_{order_id}"),
            CallbackData::AskDeliveryDays { order_id } => write!(f, "delivery_{order_id}"),
            CallbackData::Delivered { order_id } => write!(f, "delivered_{order_id}"),
            CallbackData::AdminCatalog => f.write_str("admin_catalog"),
            CallbackData::AddTie => f.write_str("add_tie"),
            CallbackData::EditTie { tie_id } => write!(f, "edit_{tie_id}"),
            CallbackData::EditField { tie_id, field } => {
                write!(f, "edit_field_{}_{tie_id}", field.code())
            }
            CallbackData::DeleteTie { tie_id } => write!(f, "delete_{tie_id}"),
            CallbackData::ToggleTie { tie_id } => write!(f, "toggle_{tie_id}"),
            CallbackData::BroadcastAll => f.write_str("broadcast_all"),
            CallbackData::BroadcastPick => f.write_str("broadcast_pick"),
            CallbackData::BroadcastUser { telegram_id } => write!(f, "broadcast_user_{telegram_id}"),
            CallbackData::Report => f.write_str("report"),
            CallbackData::Purge => f.write_str("purge"),
        }
    }
}

fn id_after<T: FromStr>(data: &str, prefix: &str) -> Option<T> {
    data.strip_prefix(prefix)?.parse().ok()
}

impl FromStr for CallbackData {
    type Err = String;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let fixed = match data {
            "change_lang" => Some(CallbackData::ChangeLanguage),
            "menu" => Some(CallbackData::Menu),
            "pay" => Some(CallbackData::Pay),
            "cancel_checkout" => Some(CallbackData::CancelCheckout),
            "my_orders" => Some(CallbackData::MyOrders),
            "admin" => Some(CallbackData::AdminPanel),
            "admin_orders" => Some(CallbackData::AdminOrders),
            "admin_catalog" => Some(CallbackData::AdminCatalog),
            "add_tie" => Some(CallbackData::AddTie),
            "broadcast_all" => Some(CallbackData::BroadcastAll),
            "broadcast_pick" => Some(CallbackData::BroadcastPick),
            "report" => Some(CallbackData::Report),
            "purge" => Some(CallbackData::Purge),
            _ => None,
        };
        if let Some(parsed) = fixed {
            return Ok(parsed);
        }

        if let Some(code) = data.strip_prefix("lang_") {
            if let Some(lang) = Language::from_code(code) {
                return Ok(CallbackData::SetLanguage(lang));
            }
        }
        if let Some(rest) = data.strip_prefix("edit_field_") {
            if let Some((code, id)) = rest.rsplit_once('_') {
                if let (Some(field), Ok(tie_id)) = (TieField::from_code(code), id.parse()) {
                    return Ok(CallbackData::EditField { tie_id, field });
                }
            }
        }

        let parsed = None
            .or_else(|| id_after(data, "cat_").map(|index| CallbackData::Catalog { index }))
            .or_else(|| id_after(data, "buy_").map(|tie_id| CallbackData::Buy { tie_id }))
            .or_else(|| id_after(data, "paid_").map(|order_id| CallbackData::Paid { order_id }))
            .or_else(|| {
                id_after(data, "cancel_order_").map(|order_id| CallbackData::CancelOrder { order_id })
            })
            .or_else(|| id_after(data, "received_").map(|order_id| CallbackData::Received { order_id }))
            .or_else(|| id_after(data, "approve_").map(|order_id| CallbackData::Approve { order_id }))
            .or_else(|| id_after(data, "reject_").map(|order_id| CallbackData::Reject { order_id }))
            .or_else(|| {
                id_after(data, "delivery_").map(|order_id| CallbackData::AskDeliveryDays { order_id })
            })
            .or_else(|| id_after(data, "delivered_").map(|order_id| CallbackData::Delivered { order_id }))
            .or_else(|| id_after(data, "edit_").map(|tie_id| CallbackData::EditTie { tie_id }))
            .or_else(|| id_after(data, "delete_").map(|tie_id| CallbackData::DeleteTie { tie_id }))
            .or_else(|| id_after(data, "toggle_").map(|tie_id| CallbackData::ToggleTie { tie_id }))
            .or_else(|| {
                id_after(data, "broadcast_user_")
                    .map(|telegram_id| CallbackData::BroadcastUser { telegram_id })
            });

        parsed.ok_or_else(|| format!("unknown callback data '{data}'"))
    }
}
