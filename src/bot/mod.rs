//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Handles commands, text and photo messages
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `ui_builder`: Creates keyboards and formats messages
//! - `dialogue_manager`: Carries out the effects chosen by the mode router

use std::sync::Arc;

use teloxide::prelude::*;

use crate::context::ShopContext;

pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

pub use callback_handler::callback_handler;
pub use message_handler::{download_photo, message_handler};

/// Shared state injected into every handler
pub type BotContext = Arc<ShopContext<Bot>>;
