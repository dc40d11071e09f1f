//! Outbound messages to buyers and admins.
//!
//! The shop core only needs "send this text, with these buttons, to chat X".
//! [`Messenger`] is that primitive; the Telegram bot implements it and tests
//! use a recording fake.

use std::future::Future;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use thiserror::Error;
use tracing::warn;

use crate::config::AdminList;

/// What pressing a button does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// A text message with optional rows of inline buttons
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub buttons: Vec<Vec<Button>>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        self.buttons.push(row);
        self
    }
}

/// Failed outbound delivery
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
    #[error("invalid button url '{0}'")]
    InvalidUrl(String),
    #[error("delivery to {chat_id} failed: {reason}")]
    Rejected { chat_id: i64, reason: String },
}

/// Sends messages to chats identified by their Telegram id
pub trait Messenger: Send + Sync {
    fn send(
        &self,
        chat_id: i64,
        message: OutboundMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Convert button rows into a Telegram inline keyboard
pub fn inline_keyboard(rows: &[Vec<Button>]) -> Result<InlineKeyboardMarkup, TransportError> {
    let mut keyboard = Vec::with_capacity(rows.len());
    for row in rows {
        let mut buttons = Vec::with_capacity(row.len());
        for button in row {
            let button = match &button.action {
                ButtonAction::Callback(data) => {
                    InlineKeyboardButton::callback(button.label.clone(), data.clone())
                }
                ButtonAction::Url(url) => {
                    let parsed = reqwest::Url::parse(url)
                        .map_err(|_| TransportError::InvalidUrl(url.clone()))?;
                    InlineKeyboardButton::url(button.label.clone(), parsed)
                }
            };
            buttons.push(button);
        }
        keyboard.push(buttons);
    }
    Ok(InlineKeyboardMarkup::new(keyboard))
}

impl Messenger for Bot {
    async fn send(&self, chat_id: i64, message: OutboundMessage) -> Result<(), TransportError> {
        let request = self.send_message(ChatId(chat_id), message.text);
        if message.buttons.is_empty() {
            request.await?;
        } else {
            request
                .reply_markup(inline_keyboard(&message.buttons)?)
                .await?;
        }
        Ok(())
    }
}

/// Send `message` to every admin; failures are logged and skipped.
/// Returns how many admins received it.
pub async fn notify_admins<M: Messenger>(
    messenger: &M,
    admins: &AdminList,
    message: OutboundMessage,
) -> usize {
    let mut delivered = 0;
    for admin_id in admins.iter() {
        match messenger.send(admin_id, message.clone()).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!(admin_id, error = %e, "Failed to notify admin"),
        }
    }
    delivered
}

/// Send `message` to one chat, logging instead of failing
pub async fn notify_user<M: Messenger>(messenger: &M, chat_id: i64, message: OutboundMessage) -> bool {
    match messenger.send(chat_id, message).await {
        Ok(()) => true,
        Err(e) => {
            warn!(chat_id, error = %e, "Failed to notify user");
            false
        }
    }
}
