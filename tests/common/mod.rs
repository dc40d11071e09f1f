//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use tieshop::checkout::{validate_details, CheckoutDetails};
use tieshop::config::AdminList;
use tieshop::json_store::JsonStore;
use tieshop::model::NewTie;
use tieshop::notify::{Messenger, OutboundMessage, TransportError};

pub const ADMIN_ID: i64 = 900;
pub const BUYER_ID: i64 = 100;

/// Messenger that records every delivery and refuses chats marked as failing
#[derive(Clone, Default)]
pub struct RecordingMessenger {
    sent: Arc<Mutex<Vec<(i64, OutboundMessage)>>>,
    failing: Arc<HashSet<i64>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(chat_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            sent: Arc::default(),
            failing: Arc::new(chat_ids.into_iter().collect()),
        }
    }

    pub fn sent(&self) -> Vec<(i64, OutboundMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<OutboundMessage> {
        self.sent()
            .into_iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, message)| message)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Messenger for RecordingMessenger {
    async fn send(&self, chat_id: i64, message: OutboundMessage) -> Result<(), TransportError> {
        if self.failing.contains(&chat_id) {
            return Err(TransportError::Rejected {
                chat_id,
                reason: "bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().unwrap().push((chat_id, message));
        Ok(())
    }
}

/// A JSON store in a fresh temporary directory; keep the `TempDir` alive
pub async fn temp_store() -> (TempDir, JsonStore) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = JsonStore::open(dir.path().join("shop.json"))
        .await
        .expect("Failed to open JSON store");
    (dir, store)
}

pub fn admins() -> AdminList {
    AdminList::new([ADMIN_ID])
}

pub fn sample_tie(name: &str, price: i64) -> NewTie {
    NewTie::same_in_all_languages(name, "Navy", "Silk tie with a fine stripe", price, None)
}

pub fn sample_details() -> CheckoutDetails {
    validate_details("Айгерим", "Нурланова", "+7 701 234 56 78", "Алматы, ул. Абая 10")
        .expect("sample details are valid")
}
