//! Dialogue Manager module: stores the next session mode and carries out the
//! effect chosen by the mode router

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{error, info, warn};

use crate::broadcast::broadcast_to;
use crate::catalog;
use crate::dialogue::ShopDialogue;
use crate::error::{Entity, ShopError};
use crate::localization::{t_args_lang, t_lang};
use crate::model::{Language, NewTie, TieUpdate};
use crate::router::{CompletedTieDraft, Effect, Routed, PURGE_CONFIRMATION};
use crate::store::ShopRepository;

use super::message_handler::{download_photo, send_main_menu};
use super::ui_builder::{
    checkout_summary_keyboard, format_checkout_summary, format_error, format_validation_error,
};
use super::BotContext;

/// Report a failed operation to the chat; admins also see the cause
pub async fn report_error(
    bot: &Bot,
    chat_id: ChatId,
    err: &ShopError,
    lang: Language,
    is_admin: bool,
) -> Result<()> {
    if let ShopError::Store(cause) = err {
        error!(chat_id = %chat_id, error = %cause, "Store operation failed");
    }
    bot.send_message(chat_id, format_error(err, lang, is_admin))
        .await?;
    Ok(())
}

/// Persist `routed.next` for the chat, then perform `routed.effect`
pub async fn apply_routed(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    dialogue: &ShopDialogue,
    ctx: &BotContext,
    lang: Language,
    routed: Routed,
) -> Result<()> {
    let Routed { next, effect } = routed;
    dialogue.update(next).await?;
    let is_admin = ctx.is_admin(user_id);

    match effect {
        Effect::Discard => {}
        Effect::Prompt(key) => {
            bot.send_message(chat_id, t_lang(key, lang)).await?;
        }
        Effect::Invalid { error, prompt } => {
            let text = format!(
                "⚠️ {}\n\n{}",
                format_validation_error(&error, lang),
                t_lang(prompt, lang)
            );
            bot.send_message(chat_id, text).await?;
        }
        Effect::ShowCheckoutSummary { tie_id, details } => {
            match ctx.store.get_tie(tie_id).await? {
                Some(tie) if tie.is_active => {
                    bot.send_message(chat_id, format_checkout_summary(&tie, &details, lang))
                        .reply_markup(checkout_summary_keyboard(lang))
                        .await?;
                }
                _ => {
                    dialogue.exit().await?;
                    report_error(
                        bot,
                        chat_id,
                        &ShopError::not_found(Entity::Tie, tie_id),
                        lang,
                        is_admin,
                    )
                    .await?;
                }
            }
        }
        Effect::Cancelled => {
            bot.send_message(chat_id, t_lang("cancelled", lang)).await?;
            send_main_menu(bot, chat_id, lang, is_admin).await?;
        }
        Effect::UpdateTie {
            tie_id,
            field,
            update,
        } => match catalog::update_tie(&ctx.store, tie_id, &update).await {
            Ok(tie) => {
                let text = t_args_lang(
                    "admin-tie-updated",
                    &[
                        ("field", &t_lang(field.label_key(), lang)),
                        ("name", tie.name(lang)),
                    ],
                    lang,
                );
                bot.send_message(chat_id, text).await?;
            }
            Err(e) => report_error(bot, chat_id, &e, lang, is_admin).await?,
        },
        Effect::SaveTiePhoto { tie_id, file_id } => {
            let file_name = match download_photo(bot, &file_id, &ctx.images_dir).await {
                Ok(file_name) => file_name,
                Err(e) => {
                    error!(tie_id, error = %e, "Failed to download tie photo");
                    bot.send_message(chat_id, t_lang("error-photo-download", lang))
                        .await?;
                    return Ok(());
                }
            };
            let update = TieUpdate {
                image_path: Some(file_name),
                ..Default::default()
            };
            match catalog::update_tie(&ctx.store, tie_id, &update).await {
                Ok(tie) => {
                    bot.send_message(
                        chat_id,
                        t_args_lang("admin-tie-photo-updated", &[("name", tie.name(lang))], lang),
                    )
                    .await?;
                }
                Err(e) => report_error(bot, chat_id, &e, lang, is_admin).await?,
            }
        }
        Effect::CreateTie(draft) => create_tie_from_draft(bot, chat_id, ctx, lang, draft).await?,
        Effect::SendBroadcast { target, text } => {
            bot.send_message(chat_id, t_lang("admin-broadcast-sending", lang))
                .await?;
            match broadcast_to(&ctx.store, bot, target, &text).await {
                Ok(report) => {
                    let summary = t_args_lang(
                        "admin-broadcast-done",
                        &[
                            ("delivered", &report.delivered.to_string()),
                            ("failed", &report.failed.to_string()),
                        ],
                        lang,
                    );
                    bot.send_message(chat_id, summary).await?;
                }
                Err(e) => report_error(bot, chat_id, &e, lang, is_admin).await?,
            }
        }
        Effect::Dispatch { order_id, days } => match ctx.orders().dispatch(order_id, days).await {
            Ok(order) => {
                let text = t_args_lang(
                    "admin-order-dispatched",
                    &[("id", &order.id.to_string()), ("days", &days.to_string())],
                    lang,
                );
                bot.send_message(chat_id, text).await?;
            }
            Err(e) => report_error(bot, chat_id, &e, lang, is_admin).await?,
        },
        Effect::Purge => {
            warn!(target: "audit", admin_id = user_id, "Purging all orders and users");
            match ctx.store.purge_orders_and_users().await {
                Ok(summary) => {
                    warn!(
                        target: "audit",
                        admin_id = user_id,
                        orders = summary.orders,
                        users = summary.users,
                        "Purge completed"
                    );
                    let text = t_args_lang(
                        "admin-purge-done",
                        &[
                            ("orders", &summary.orders.to_string()),
                            ("users", &summary.users.to_string()),
                        ],
                        lang,
                    );
                    bot.send_message(chat_id, text).await?;
                }
                Err(e) => {
                    report_error(bot, chat_id, &ShopError::Store(e), lang, is_admin).await?;
                }
            }
        }
        Effect::PurgeAborted => {
            let text = t_args_lang(
                "admin-purge-aborted",
                &[("phrase", PURGE_CONFIRMATION)],
                lang,
            );
            bot.send_message(chat_id, text).await?;
        }
    }
    Ok(())
}

async fn create_tie_from_draft(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &BotContext,
    lang: Language,
    draft: CompletedTieDraft,
) -> Result<()> {
    let image_path = match download_photo(bot, &draft.photo_file_id, &ctx.images_dir).await {
        Ok(file_name) => Some(file_name),
        Err(e) => {
            // The tie is still created; a photo can be added later
            error!(error = %e, "Failed to download photo for new tie");
            bot.send_message(chat_id, t_lang("error-photo-download", lang))
                .await?;
            None
        }
    };
    let new_tie = NewTie::same_in_all_languages(
        &draft.name,
        &draft.color,
        &draft.description,
        draft.price,
        image_path,
    );
    match catalog::create_tie(&ctx.store, new_tie).await {
        Ok(tie) => {
            info!(tie_id = tie.id, "Tie added from bot");
            let text = t_args_lang(
                "admin-tie-created",
                &[("id", &tie.id.to_string()), ("name", tie.name(lang))],
                lang,
            );
            bot.send_message(chat_id, text).await?;
        }
        Err(e) => report_error(bot, chat_id, &e, lang, true).await?,
    }
    Ok(())
}
