//! Message Handler module for processing incoming Telegram messages

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::{debug, warn};

use crate::dialogue::ShopDialogue;
use crate::localization::t_lang;
use crate::model::Language;
use crate::router::{route, Input};
use crate::store::ShopRepository;

use super::dialogue_manager::apply_routed;
use super::ui_builder::{admin_panel_keyboard, language_keyboard, main_menu_keyboard};
use super::BotContext;

/// Download a Telegram photo into `images_dir` and return the stored file name
pub async fn download_photo(bot: &Bot, file_id: &str, images_dir: &Path) -> Result<String> {
    let file = bot.get_file(FileId(file_id.to_string())).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    );

    let response = reqwest::get(&url).await?.error_for_status()?;
    let bytes = response.bytes().await?;

    let extension = Path::new(&file.path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("jpg");
    tokio::fs::create_dir_all(images_dir).await?;
    let mut image = tempfile::Builder::new()
        .prefix("tie_")
        .suffix(&format!(".{extension}"))
        .tempfile_in(images_dir)?;
    image.as_file_mut().write_all(&bytes)?;
    let (_, path) = image.keep()?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("stored image has no file name"))?;
    debug!(file_name = %file_name, size = bytes.len(), "Tie photo stored");
    Ok(file_name)
}

/// The language stored for a user, or the one their Telegram client reports
pub async fn user_language(ctx: &BotContext, user_id: i64, telegram_code: Option<&str>) -> Language {
    match ctx.store.get_user(user_id).await {
        Ok(Some(user)) => user.language,
        Ok(None) => Language::detect(telegram_code),
        Err(e) => {
            warn!(user_id, error = %e, "Failed to load user language");
            Language::detect(telegram_code)
        }
    }
}

pub async fn send_main_menu(bot: &Bot, chat_id: ChatId, lang: Language, is_admin: bool) -> Result<()> {
    bot.send_message(chat_id, t_lang("menu-title", lang))
        .reply_markup(main_menu_keyboard(lang, is_admin))
        .await?;
    Ok(())
}

async fn handle_command(
    bot: &Bot,
    msg: &Message,
    dialogue: &ShopDialogue,
    ctx: &BotContext,
    command: &str,
    lang: Language,
    is_admin: bool,
) -> Result<bool> {
    let chat_id = msg.chat.id;
    match command {
        "/start" => {
            dialogue.exit().await?;
            if let Some(from) = msg.from.as_ref() {
                let display_name = from.full_name();
                ctx.store
                    .get_or_create_user(from.id.0 as i64, Some(&display_name), lang)
                    .await?;
            }
            bot.send_message(chat_id, t_lang("welcome", lang))
                .reply_markup(language_keyboard())
                .await?;
        }
        "/menu" => {
            dialogue.exit().await?;
            send_main_menu(bot, chat_id, lang, is_admin).await?;
        }
        "/help" => {
            bot.send_message(chat_id, t_lang("help", lang)).await?;
        }
        "/admin" => {
            if is_admin {
                dialogue.exit().await?;
                bot.send_message(chat_id, t_lang("admin-panel-title", lang))
                    .reply_markup(admin_panel_keyboard(lang))
                    .await?;
            } else {
                bot.send_message(chat_id, t_lang("error-unauthorized", lang))
                    .await?;
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    dialogue: ShopDialogue,
    ctx: BotContext,
) -> Result<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;
    let lang = user_language(&ctx, user_id, from.language_code.as_deref()).await;
    let is_admin = ctx.is_admin(user_id);

    let input = if let Some(text) = msg.text() {
        if handle_command(&bot, &msg, &dialogue, &ctx, text.trim(), lang, is_admin).await? {
            return Ok(());
        }
        Input::Text(text)
    } else if let Some(largest_photo) = msg.photo().and_then(|photos| photos.last()) {
        Input::Photo(&largest_photo.file.id.0)
    } else {
        debug!(user_id, "Ignoring unsupported message type");
        return Ok(());
    };

    let mode = dialogue.get().await?.unwrap_or_default();
    debug!(user_id, mode = ?mode, "Routing message");
    let routed = route(mode, input, is_admin);
    apply_routed(&bot, msg.chat.id, user_id, &dialogue, &ctx, lang, routed).await
}
