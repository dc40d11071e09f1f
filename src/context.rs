//! Shared state handed to bot handlers and web routes.

use std::path::PathBuf;

use crate::config::{AdminList, AppConfig};
use crate::model::Language;
use crate::notify::Messenger;
use crate::orders::OrderWorkflow;
use crate::store::Store;

pub struct ShopContext<M> {
    pub store: Store,
    pub messenger: M,
    pub admins: AdminList,
    pub payment_link: String,
    pub images_dir: PathBuf,
    /// Language for admin-facing notifications
    pub admin_language: Language,
}

impl<M: Messenger> ShopContext<M> {
    pub fn new(store: Store, messenger: M, config: &AppConfig) -> Self {
        Self {
            store,
            messenger,
            admins: config.admins.clone(),
            payment_link: config.payment_link.clone(),
            images_dir: config.images_dir.clone(),
            admin_language: config.default_language,
        }
    }

    pub fn is_admin(&self, telegram_id: i64) -> bool {
        self.admins.contains(telegram_id)
    }

    pub fn orders(&self) -> OrderWorkflow<'_, Store, M> {
        OrderWorkflow::new(&self.store, &self.messenger, &self.admins, self.admin_language)
    }
}
