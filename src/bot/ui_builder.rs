//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::callbacks::CallbackData;
use crate::checkout::CheckoutDetails;
use crate::error::{ShopError, ValidationError, ValidationIssue};
use crate::localization::{t_args_lang, t_lang};
use crate::model::{format_price, Language, Order, Tie, TieField, User};
use crate::order_lifecycle::OrderStatus;

/// How many users the broadcast picker lists
pub const BROADCAST_PICKER_LIMIT: usize = 30;

fn button(label: String, data: CallbackData) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, data.to_string())
}

/// Language selection shown on `/start`
pub fn language_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("🇷🇺 Русский".to_string(), CallbackData::SetLanguage(Language::Ru)),
        button("🇰🇿 Қазақша".to_string(), CallbackData::SetLanguage(Language::Kz)),
        button("🇬🇧 English".to_string(), CallbackData::SetLanguage(Language::En)),
    ]])
}

pub fn main_menu_keyboard(lang: Language, is_admin: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![
        vec![button(t_lang("menu-catalog", lang), CallbackData::Catalog { index: 0 })],
        vec![button(t_lang("menu-my-orders", lang), CallbackData::MyOrders)],
        vec![button(t_lang("menu-language", lang), CallbackData::ChangeLanguage)],
    ];
    if is_admin {
        rows.push(vec![button(t_lang("menu-admin", lang), CallbackData::AdminPanel)]);
    }
    InlineKeyboardMarkup::new(rows)
}

/// Card text for one catalog entry
pub fn format_tie_card(tie: &Tie, lang: Language, index: usize, total: usize) -> String {
    t_args_lang(
        "catalog-card",
        &[
            ("name", tie.name(lang)),
            ("color", tie.color(lang)),
            ("material", tie.material(lang)),
            ("description", tie.description(lang)),
            ("price", &format_price(tie.price)),
            ("position", &(index + 1).to_string()),
            ("total", &total.to_string()),
        ],
        lang,
    )
}

/// Previous / next / buy buttons; navigation wraps around
pub fn tie_card_keyboard(tie: &Tie, lang: Language, index: usize, total: usize) -> InlineKeyboardMarkup {
    let previous = if index == 0 { total.saturating_sub(1) } else { index - 1 };
    let next = if index + 1 >= total { 0 } else { index + 1 };
    let mut rows = Vec::new();
    if total > 1 {
        rows.push(vec![
            button("⬅️".to_string(), CallbackData::Catalog { index: previous }),
            button("➡️".to_string(), CallbackData::Catalog { index: next }),
        ]);
    }
    rows.push(vec![button(
        t_lang("catalog-buy", lang),
        CallbackData::Buy { tie_id: tie.id },
    )]);
    rows.push(vec![button(t_lang("menu-back", lang), CallbackData::Menu)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn format_checkout_summary(tie: &Tie, details: &CheckoutDetails, lang: Language) -> String {
    t_args_lang(
        "checkout-summary",
        &[
            ("tie", tie.name(lang)),
            ("price", &format_price(tie.price)),
            ("name", &details.name),
            ("surname", &details.surname),
            ("phone", &details.phone),
            ("address", &details.address),
        ],
        lang,
    )
}

pub fn checkout_summary_keyboard(lang: Language) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button(t_lang("checkout-pay", lang), CallbackData::Pay),
        button(t_lang("checkout-cancel", lang), CallbackData::CancelCheckout),
    ]])
}

pub fn format_payment_instructions(order: &Order, payment_link: &str, lang: Language) -> String {
    t_args_lang(
        "payment-instructions",
        &[
            ("id", &order.id.to_string()),
            ("price", &format_price(order.price)),
            ("link", payment_link),
        ],
        lang,
    )
}

pub fn payment_keyboard(order: &Order, payment_link: &str, lang: Language) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Ok(url) = reqwest::Url::parse(payment_link) {
        rows.push(vec![InlineKeyboardButton::url(t_lang("payment-open-link", lang), url)]);
    }
    rows.push(vec![button(
        t_lang("payment-claim", lang),
        CallbackData::Paid { order_id: order.id },
    )]);
    rows.push(vec![button(
        t_lang("payment-cancel-order", lang),
        CallbackData::CancelOrder { order_id: order.id },
    )]);
    InlineKeyboardMarkup::new(rows)
}

pub fn status_label(status: OrderStatus, lang: Language) -> String {
    t_lang(status.label_key(), lang)
}

/// A buyer's order history
pub fn format_user_orders(orders: &[Order], lang: Language) -> String {
    if orders.is_empty() {
        return t_lang("orders-empty", lang);
    }
    let mut result = t_lang("orders-title", lang);
    for order in orders {
        result.push_str("\n\n");
        result.push_str(&t_args_lang(
            "orders-entry",
            &[
                ("id", &order.id.to_string()),
                ("tie", &order.tie_name),
                ("price", &format_price(order.price)),
                ("status", &status_label(order.status, lang)),
                ("date", &order.created_at.format("%d.%m.%Y").to_string()),
            ],
            lang,
        ));
        if let Some(days) = order.delivery_days {
            if order.status == OrderStatus::InDelivery {
                result.push('\n');
                result.push_str(&t_args_lang(
                    "orders-delivery-days",
                    &[("days", &days.to_string())],
                    lang,
                ));
            }
        }
    }
    result
}

/// Buttons a buyer can press on their own order
pub fn user_order_keyboard(order: &Order, lang: Language) -> Option<InlineKeyboardMarkup> {
    let row = match order.status {
        OrderStatus::PendingPayment => vec![
            button(t_lang("payment-claim", lang), CallbackData::Paid { order_id: order.id }),
            button(
                t_lang("payment-cancel-order", lang),
                CallbackData::CancelOrder { order_id: order.id },
            ),
        ],
        OrderStatus::Delivered => vec![button(
            t_lang("btn-confirm-receipt", lang),
            CallbackData::Received { order_id: order.id },
        )],
        _ => return None,
    };
    Some(InlineKeyboardMarkup::new(vec![row]))
}

pub fn admin_panel_keyboard(lang: Language) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(t_lang("admin-orders", lang), CallbackData::AdminOrders)],
        vec![button(t_lang("admin-catalog", lang), CallbackData::AdminCatalog)],
        vec![
            button(t_lang("admin-broadcast-all", lang), CallbackData::BroadcastAll),
            button(t_lang("admin-broadcast-one", lang), CallbackData::BroadcastPick),
        ],
        vec![button(t_lang("admin-report", lang), CallbackData::Report)],
        vec![button(t_lang("admin-purge", lang), CallbackData::Purge)],
    ])
}

pub fn format_admin_order(order: &Order, lang: Language) -> String {
    let mut text = t_args_lang(
        "admin-order-entry",
        &[
            ("id", &order.id.to_string()),
            ("status", &status_label(order.status, lang)),
            ("tie", &order.tie_name),
            ("price", &format_price(order.price)),
            ("name", &order.recipient_full_name()),
            ("phone", &order.recipient_phone),
            ("address", &order.delivery_address),
            ("buyer", &order.buyer_id.to_string()),
            ("date", &order.created_at.format("%d.%m.%Y %H:%M").to_string()),
        ],
        lang,
    );
    if let Some(days) = order.delivery_days {
        text.push('\n');
        text.push_str(&t_args_lang(
            "orders-delivery-days",
            &[("days", &days.to_string())],
            lang,
        ));
    }
    text
}

/// Status-dependent admin actions for one order
pub fn admin_order_keyboard(order: &Order, lang: Language) -> Option<InlineKeyboardMarkup> {
    let order_id = order.id;
    let row = match order.status {
        OrderStatus::PendingAdminReview => vec![
            button(t_lang("admin-btn-approve", lang), CallbackData::Approve { order_id }),
            button(t_lang("admin-btn-reject", lang), CallbackData::Reject { order_id }),
        ],
        OrderStatus::Confirmed => vec![button(
            t_lang("admin-btn-set-delivery", lang),
            CallbackData::AskDeliveryDays { order_id },
        )],
        OrderStatus::InDelivery => vec![button(
            t_lang("admin-btn-delivered", lang),
            CallbackData::Delivered { order_id },
        )],
        _ => return None,
    };
    Some(InlineKeyboardMarkup::new(vec![row]))
}

pub fn format_admin_tie(tie: &Tie, lang: Language) -> String {
    let state = if tie.is_active {
        t_lang("admin-tie-active", lang)
    } else {
        t_lang("admin-tie-hidden", lang)
    };
    t_args_lang(
        "admin-tie-entry",
        &[
            ("id", &tie.id.to_string()),
            ("name", tie.name(lang)),
            ("color", tie.color(lang)),
            ("price", &format_price(tie.price)),
            ("state", &state),
        ],
        lang,
    )
}

pub fn admin_tie_keyboard(tie: &Tie, lang: Language) -> InlineKeyboardMarkup {
    let visibility = if tie.is_active {
        button(t_lang("admin-btn-delete", lang), CallbackData::DeleteTie { tie_id: tie.id })
    } else {
        button(t_lang("admin-btn-restore", lang), CallbackData::ToggleTie { tie_id: tie.id })
    };
    InlineKeyboardMarkup::new(vec![vec![
        button(t_lang("admin-btn-edit", lang), CallbackData::EditTie { tie_id: tie.id }),
        visibility,
    ]])
}

pub fn admin_catalog_keyboard(lang: Language) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(t_lang("admin-btn-add-tie", lang), CallbackData::AddTie)],
        vec![button(t_lang("menu-back", lang), CallbackData::AdminPanel)],
    ])
}

pub fn edit_fields_keyboard(tie_id: i64, lang: Language) -> InlineKeyboardMarkup {
    let rows = TieField::ALL
        .iter()
        .map(|&field| {
            vec![button(
                t_lang(field.label_key(), lang),
                CallbackData::EditField { tie_id, field },
            )]
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

pub fn broadcast_users_keyboard(users: &[User]) -> InlineKeyboardMarkup {
    let rows = users
        .iter()
        .take(BROADCAST_PICKER_LIMIT)
        .map(|user| {
            let label = match &user.display_name {
                Some(name) => format!("{name} ({})", user.telegram_id),
                None => user.telegram_id.to_string(),
            };
            vec![button(
                label,
                CallbackData::BroadcastUser {
                    telegram_id: user.telegram_id,
                },
            )]
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

/// Explain which field needs correcting
pub fn format_validation_error(error: &ValidationError, lang: Language) -> String {
    let field = t_lang(&format!("field-{}", error.field.as_str()), lang);
    let min = match error.issue {
        ValidationIssue::TooShort { min } => min.to_string(),
        _ => String::new(),
    };
    t_args_lang(
        error.issue.message_key(),
        &[("field", &field), ("min", &min)],
        lang,
    )
}

/// User-facing text for a failed operation. Admins also see the cause.
pub fn format_error(error: &ShopError, lang: Language, show_cause: bool) -> String {
    let text = match error {
        ShopError::Validation(validation) => format_validation_error(validation, lang),
        ShopError::NotFound { id, .. } => {
            t_args_lang(error.message_key(), &[("id", &id.to_string())], lang)
        }
        ShopError::Conflict { order_id, actual, .. } => t_args_lang(
            error.message_key(),
            &[
                ("id", &order_id.to_string()),
                ("status", &status_label(*actual, lang)),
            ],
            lang,
        ),
        ShopError::InvalidTransition { order_id, from, .. } => t_args_lang(
            error.message_key(),
            &[
                ("id", &order_id.to_string()),
                ("status", &status_label(*from, lang)),
            ],
            lang,
        ),
        ShopError::Unauthorized | ShopError::Store(_) => t_lang(error.message_key(), lang),
    };
    if show_cause {
        format!("{text}\n\n{error}")
    } else {
        text
    }
}
