//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, InputFile};
use tracing::{debug, warn};

use crate::callbacks::CallbackData;
use crate::checkout::CheckoutStep;
use crate::dialogue::{BroadcastTarget, SessionMode, ShopDialogue, TieDraftStep};
use crate::error::{Entity, ShopError, ShopResult};
use crate::localization::{t_args_lang, t_lang};
use crate::model::{Language, TieField};
use crate::report::SalesReport;
use crate::router::PURGE_CONFIRMATION;
use crate::store::ShopRepository;
use crate::catalog;

use super::dialogue_manager::report_error;
use super::message_handler::{send_main_menu, user_language};
use super::ui_builder::{
    admin_catalog_keyboard, admin_order_keyboard, admin_panel_keyboard, admin_tie_keyboard,
    broadcast_users_keyboard, edit_fields_keyboard, format_admin_order, format_admin_tie,
    format_payment_instructions, format_tie_card, format_user_orders, language_keyboard,
    payment_keyboard, tie_card_keyboard, user_order_keyboard,
};
use super::BotContext;

/// How many recent orders the admin order list shows
const ADMIN_ORDER_LIMIT: usize = 10;

/// Send `ok(value)` on success or the localized error on failure
async fn reply<T>(
    bot: &Bot,
    chat_id: ChatId,
    result: ShopResult<T>,
    lang: Language,
    is_admin: bool,
    ok: impl FnOnce(T) -> String,
) -> Result<()> {
    match result {
        Ok(value) => {
            bot.send_message(chat_id, ok(value)).await?;
            Ok(())
        }
        Err(e) => report_error(bot, chat_id, &e, lang, is_admin).await,
    }
}

async fn show_catalog_card(bot: &Bot, chat_id: ChatId, ctx: &BotContext, lang: Language, index: usize) -> Result<()> {
    let ties = ctx.store.list_active_ties().await?;
    if ties.is_empty() {
        bot.send_message(chat_id, t_lang("catalog-empty", lang)).await?;
        return Ok(());
    }
    let index = index % ties.len();
    let tie = &ties[index];
    let text = format_tie_card(tie, lang, index, ties.len());
    let keyboard = tie_card_keyboard(tie, lang, index, ties.len());

    let image = tie
        .image_path
        .as_ref()
        .map(|name| ctx.images_dir.join(name))
        .filter(|path| path.is_file());
    match image {
        Some(path) => {
            bot.send_photo(chat_id, InputFile::file(path))
                .caption(text)
                .reply_markup(keyboard)
                .await?;
        }
        None => {
            bot.send_message(chat_id, text).reply_markup(keyboard).await?;
        }
    }
    Ok(())
}

async fn start_checkout(
    bot: &Bot,
    chat_id: ChatId,
    q: &CallbackQuery,
    dialogue: &ShopDialogue,
    ctx: &BotContext,
    lang: Language,
    tie_id: i64,
) -> Result<()> {
    let tie = match ctx.store.get_tie(tie_id).await? {
        Some(tie) if tie.is_active => tie,
        _ => {
            let err = ShopError::not_found(Entity::Tie, tie_id);
            return report_error(bot, chat_id, &err, lang, false).await;
        }
    };
    ctx.store
        .get_or_create_user(q.from.id.0 as i64, Some(&q.from.full_name()), lang)
        .await?;
    dialogue.update(SessionMode::checkout(tie_id)).await?;
    let text = format!(
        "{}\n\n{}",
        t_args_lang("checkout-start", &[("tie", tie.name(lang))], lang),
        t_lang(CheckoutStep::FIRST.prompt_key(), lang)
    );
    bot.send_message(chat_id, text).await?;
    Ok(())
}

async fn pay(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    dialogue: &ShopDialogue,
    ctx: &BotContext,
    lang: Language,
) -> Result<()> {
    let pending = match dialogue.get().await? {
        Some(SessionMode::Checkout {
            tie_id,
            step: CheckoutStep::Confirm,
            draft,
        }) => draft.details().map(|details| (tie_id, details)),
        _ => None,
    };
    let Some((tie_id, details)) = pending else {
        bot.send_message(chat_id, t_lang("checkout-expired", lang)).await?;
        return Ok(());
    };

    dialogue.exit().await?;
    match ctx.orders().place_order(user_id, tie_id, &details).await {
        Ok(order) => {
            bot.send_message(
                chat_id,
                format_payment_instructions(&order, &ctx.payment_link, lang),
            )
            .reply_markup(payment_keyboard(&order, &ctx.payment_link, lang))
            .await?;
        }
        Err(e) => report_error(bot, chat_id, &e, lang, false).await?,
    }
    Ok(())
}

async fn show_user_orders(bot: &Bot, chat_id: ChatId, user_id: i64, ctx: &BotContext, lang: Language) -> Result<()> {
    let orders = ctx.store.list_user_orders(user_id).await?;
    bot.send_message(chat_id, format_user_orders(&orders, lang))
        .await?;
    for order in &orders {
        if let Some(keyboard) = user_order_keyboard(order, lang) {
            let text = t_args_lang(
                "orders-action-needed",
                &[("id", &order.id.to_string()), ("tie", &order.tie_name)],
                lang,
            );
            bot.send_message(chat_id, text).reply_markup(keyboard).await?;
        }
    }
    Ok(())
}

async fn show_admin_orders(bot: &Bot, chat_id: ChatId, ctx: &BotContext, lang: Language) -> Result<()> {
    let orders = ctx.store.list_orders().await?;
    if orders.is_empty() {
        bot.send_message(chat_id, t_lang("admin-no-orders", lang)).await?;
        return Ok(());
    }
    for order in orders.iter().take(ADMIN_ORDER_LIMIT) {
        let request = bot.send_message(chat_id, format_admin_order(order, lang));
        match admin_order_keyboard(order, lang) {
            Some(keyboard) => request.reply_markup(keyboard).await?,
            None => request.await?,
        };
    }
    Ok(())
}

async fn show_admin_catalog(bot: &Bot, chat_id: ChatId, ctx: &BotContext, lang: Language) -> Result<()> {
    let ties = ctx.store.list_all_ties().await?;
    if ties.is_empty() {
        bot.send_message(chat_id, t_lang("catalog-empty", lang)).await?;
    }
    for tie in &ties {
        bot.send_message(chat_id, format_admin_tie(tie, lang))
            .reply_markup(admin_tie_keyboard(tie, lang))
            .await?;
    }
    bot.send_message(chat_id, t_lang("admin-catalog-actions", lang))
        .reply_markup(admin_catalog_keyboard(lang))
        .await?;
    Ok(())
}

async fn send_report(bot: &Bot, chat_id: ChatId, ctx: &BotContext, lang: Language) -> Result<()> {
    let orders = ctx.store.list_orders().await?;
    let users = ctx.store.list_users().await?;
    let report = SalesReport::build(&orders, &users);
    let document = InputFile::memory(report.render_text().into_bytes()).file_name(report.file_name());
    bot.send_document(chat_id, document)
        .caption(t_lang("admin-report-caption", lang))
        .await?;
    Ok(())
}

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: ShopDialogue,
    ctx: BotContext,
) -> Result<()> {
    let user_id = q.from.id.0 as i64;
    debug!(user_id, data = ?q.data, "Received callback query from user");
    bot.answer_callback_query(q.id.clone()).await?;

    let chat_id = q
        .message
        .as_ref()
        .map(|msg| msg.chat().id)
        .unwrap_or(ChatId(user_id));
    let lang = user_language(&ctx, user_id, q.from.language_code.as_deref()).await;
    let is_admin = ctx.is_admin(user_id);

    let data = match q.data.as_deref().map(str::parse::<CallbackData>) {
        Some(Ok(data)) => data,
        Some(Err(e)) => {
            debug!(user_id, error = %e, "Ignoring unknown callback data");
            return Ok(());
        }
        None => return Ok(()),
    };

    if data.is_admin_action() && !is_admin {
        warn!(user_id, data = %data, "Non-admin pressed an admin button");
        bot.send_message(chat_id, t_lang("error-unauthorized", lang))
            .await?;
        return Ok(());
    }

    let orders = ctx.orders();
    match data {
        CallbackData::SetLanguage(new_lang) => {
            ctx.store
                .get_or_create_user(user_id, Some(&q.from.full_name()), new_lang)
                .await?;
            ctx.store.set_user_language(user_id, new_lang).await?;
            bot.send_message(chat_id, t_lang("language-set", new_lang))
                .await?;
            send_main_menu(&bot, chat_id, new_lang, is_admin).await?;
        }
        CallbackData::ChangeLanguage => {
            bot.send_message(chat_id, t_lang("choose-language", lang))
                .reply_markup(language_keyboard())
                .await?;
        }
        CallbackData::Menu => send_main_menu(&bot, chat_id, lang, is_admin).await?,
        CallbackData::Catalog { index } => show_catalog_card(&bot, chat_id, &ctx, lang, index).await?,
        CallbackData::Buy { tie_id } => {
            start_checkout(&bot, chat_id, &q, &dialogue, &ctx, lang, tie_id).await?
        }
        CallbackData::Pay => pay(&bot, chat_id, user_id, &dialogue, &ctx, lang).await?,
        CallbackData::CancelCheckout => {
            dialogue.exit().await?;
            bot.send_message(chat_id, t_lang("checkout-cancelled", lang))
                .await?;
            send_main_menu(&bot, chat_id, lang, is_admin).await?;
        }
        CallbackData::MyOrders => show_user_orders(&bot, chat_id, user_id, &ctx, lang).await?,
        CallbackData::Paid { order_id } => {
            let result = orders.claim_payment(order_id, user_id).await;
            reply(&bot, chat_id, result, lang, is_admin, |order| {
                t_args_lang("payment-claimed", &[("id", &order.id.to_string())], lang)
            })
            .await?
        }
        CallbackData::CancelOrder { order_id } => {
            let result = orders.cancel(order_id, user_id).await;
            reply(&bot, chat_id, result, lang, is_admin, |order| {
                t_args_lang("order-cancelled", &[("id", &order.id.to_string())], lang)
            })
            .await?
        }
        CallbackData::Received { order_id } => {
            let result = orders.confirm_receipt(order_id, user_id).await;
            reply(&bot, chat_id, result, lang, is_admin, |order| {
                t_args_lang("order-completed", &[("id", &order.id.to_string())], lang)
            })
            .await?
        }
        CallbackData::AdminPanel => {
            dialogue.exit().await?;
            bot.send_message(chat_id, t_lang("admin-panel-title", lang))
                .reply_markup(admin_panel_keyboard(lang))
                .await?;
        }
        CallbackData::AdminOrders => show_admin_orders(&bot, chat_id, &ctx, lang).await?,
        CallbackData::Approve { order_id } => match orders.approve(order_id).await {
            Ok(order) => {
                let text = t_args_lang("admin-order-approved", &[("id", &order.id.to_string())], lang);
                let request = bot.send_message(chat_id, text);
                match admin_order_keyboard(&order, lang) {
                    Some(keyboard) => request.reply_markup(keyboard).await?,
                    None => request.await?,
                };
            }
            Err(e) => report_error(&bot, chat_id, &e, lang, is_admin).await?,
        },
        CallbackData::Reject { order_id } => {
            let result = orders.reject(order_id).await;
            reply(&bot, chat_id, result, lang, is_admin, |order| {
                t_args_lang("admin-order-rejected", &[("id", &order.id.to_string())], lang)
            })
            .await?
        }
        CallbackData::AskDeliveryDays { order_id } => match orders.ready_for_dispatch(order_id).await {
            Ok(_) => {
                dialogue
                    .update(SessionMode::AwaitingDeliveryDays { order_id })
                    .await?;
                bot.send_message(chat_id, t_lang("admin-ask-delivery-days", lang))
                    .await?;
            }
            Err(e) => report_error(&bot, chat_id, &e, lang, is_admin).await?,
        },
        CallbackData::Delivered { order_id } => {
            let result = orders.mark_delivered(order_id).await;
            reply(&bot, chat_id, result, lang, is_admin, |order| {
                t_args_lang("admin-order-delivered", &[("id", &order.id.to_string())], lang)
            })
            .await?
        }
        CallbackData::AdminCatalog => show_admin_catalog(&bot, chat_id, &ctx, lang).await?,
        CallbackData::AddTie => {
            dialogue.update(SessionMode::adding_tie()).await?;
            bot.send_message(chat_id, t_lang(TieDraftStep::Name.prompt_key(), lang))
                .await?;
        }
        CallbackData::EditTie { tie_id } => match ctx.store.get_tie(tie_id).await? {
            Some(tie) => {
                let text = t_args_lang("admin-edit-choose-field", &[("name", tie.name(lang))], lang);
                bot.send_message(chat_id, text)
                    .reply_markup(edit_fields_keyboard(tie_id, lang))
                    .await?;
            }
            None => {
                let err = ShopError::not_found(Entity::Tie, tie_id);
                report_error(&bot, chat_id, &err, lang, is_admin).await?;
            }
        },
        CallbackData::EditField { tie_id, field } => {
            dialogue
                .update(SessionMode::EditingTie { tie_id, field })
                .await?;
            let prompt = if field == TieField::Photo {
                t_lang("admin-edit-ask-photo", lang)
            } else {
                format!(
                    "{}\n{}",
                    t_lang(field.label_key(), lang),
                    t_lang("admin-edit-ask-value", lang)
                )
            };
            bot.send_message(chat_id, prompt).await?;
        }
        CallbackData::DeleteTie { tie_id } => {
            let result = catalog::soft_delete_tie(&ctx.store, tie_id).await;
            reply(&bot, chat_id, result, lang, is_admin, |tie| {
                t_args_lang("admin-tie-deleted", &[("name", tie.name(lang))], lang)
            })
            .await?
        }
        CallbackData::ToggleTie { tie_id } => {
            let result = catalog::toggle_tie(&ctx.store, tie_id).await;
            reply(&bot, chat_id, result, lang, is_admin, |tie| {
                let key = if tie.is_active {
                    "admin-tie-restored"
                } else {
                    "admin-tie-deleted"
                };
                t_args_lang(key, &[("name", tie.name(lang))], lang)
            })
            .await?
        }
        CallbackData::BroadcastAll => {
            dialogue
                .update(SessionMode::ComposingBroadcast {
                    target: BroadcastTarget::All,
                })
                .await?;
            bot.send_message(chat_id, t_lang("admin-broadcast-ask-text", lang))
                .await?;
        }
        CallbackData::BroadcastPick => {
            let users = ctx.store.list_users().await?;
            if users.is_empty() {
                bot.send_message(chat_id, t_lang("admin-no-users", lang)).await?;
            } else {
                bot.send_message(chat_id, t_lang("admin-broadcast-pick-user", lang))
                    .reply_markup(broadcast_users_keyboard(&users))
                    .await?;
            }
        }
        CallbackData::BroadcastUser { telegram_id } => {
            dialogue
                .update(SessionMode::ComposingBroadcast {
                    target: BroadcastTarget::User(telegram_id),
                })
                .await?;
            bot.send_message(chat_id, t_lang("admin-broadcast-ask-text", lang))
                .await?;
        }
        CallbackData::Report => send_report(&bot, chat_id, &ctx, lang).await?,
        CallbackData::Purge => {
            dialogue.update(SessionMode::ConfirmingPurge).await?;
            let text = t_args_lang("admin-purge-confirm", &[("phrase", PURGE_CONFIRMATION)], lang);
            bot.send_message(chat_id, text).await?;
        }
    }

    Ok(())
}
