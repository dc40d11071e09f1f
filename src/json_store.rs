//! # JSON File Store
//!
//! Fallback backend for deployments without Postgres. The whole database is
//! one JSON document holding the `users`, `ties` and `orders` collections
//! plus id counters. Every mutation is applied to a copy of the document
//! under a lock, written to a temporary file in the same directory and
//! renamed over the original. The copy replaces the in-memory document only
//! once it is on disk, so a failed write leaves both untouched.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::model::{Language, NewOrder, NewTie, Order, Tie, TieUpdate, User};
use crate::order_lifecycle::OrderStatus;
use crate::store::{PurgeSummary, ShopRepository, StatusChange, TransitionOutcome};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    users: BTreeMap<i64, User>,
    #[serde(default)]
    ties: BTreeMap<i64, Tie>,
    #[serde(default)]
    orders: BTreeMap<i64, Order>,
    #[serde(default = "first_id")]
    next_tie_id: i64,
    #[serde(default = "first_id")]
    next_order_id: i64,
}

fn first_id() -> i64 {
    1
}

impl Document {
    fn new() -> Self {
        Self {
            next_tie_id: first_id(),
            next_order_id: first_id(),
            ..Default::default()
        }
    }

    fn newest_first(orders: impl Iterator<Item = Order>) -> Vec<Order> {
        let mut orders: Vec<Order> = orders.collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
    }
}

struct Inner {
    path: PathBuf,
    doc: Document,
}

impl Inner {
    /// Apply `change` to a copy of the document and keep it once it is written
    async fn commit<T, F>(&mut self, change: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Document) -> T,
    {
        let mut next = self.doc.clone();
        let output = change(&mut next);
        write_document(&self.path, &next).await?;
        self.doc = next;
        Ok(output)
    }
}

/// Serialize `doc` and swap it in for the file at `path` on the blocking pool
async fn write_document(path: &Path, doc: &Document) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(doc)?;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
}

fn write_atomically(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    debug!(path = %path.display(), size = bytes.len(), "JSON store written");
    Ok(())
}

/// Repository backed by a single JSON file
#[derive(Clone)]
pub struct JsonStore {
    inner: Arc<Mutex<Inner>>,
}

impl JsonStore {
    /// Open the store at `path`, creating an empty document if it is missing
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Document::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::new(),
            Err(e) => return Err(e.into()),
        };
        info!(
            path = %path.display(),
            users = doc.users.len(),
            ties = doc.ties.len(),
            orders = doc.orders.len(),
            "JSON store opened"
        );
        write_document(&path, &doc).await?;
        let inner = Inner { path, doc };
        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
        })
    }
}

impl ShopRepository for JsonStore {
    async fn get_or_create_user(
        &self,
        telegram_id: i64,
        display_name: Option<&str>,
        language: Language,
    ) -> StoreResult<User> {
        let mut inner = self.inner.lock().await;
        inner
            .commit(|doc| {
                let user = doc.users.entry(telegram_id).or_insert_with(|| User {
                    telegram_id,
                    display_name: None,
                    language,
                    created_at: Utc::now(),
                });
                if let Some(name) = display_name {
                    user.display_name = Some(name.to_string());
                }
                user.clone()
            })
            .await
    }

    async fn get_user(&self, telegram_id: i64) -> StoreResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.doc.users.get(&telegram_id).cloned())
    }

    async fn set_user_language(
        &self,
        telegram_id: i64,
        language: Language,
    ) -> StoreResult<Option<User>> {
        let mut inner = self.inner.lock().await;
        if !inner.doc.users.contains_key(&telegram_id) {
            return Ok(None);
        }
        inner
            .commit(|doc| {
                doc.users.get_mut(&telegram_id).map(|user| {
                    user.language = language;
                    user.clone()
                })
            })
            .await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let inner = self.inner.lock().await;
        let mut users: Vec<User> = inner.doc.users.values().cloned().collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn create_tie(&self, tie: NewTie) -> StoreResult<Tie> {
        let mut inner = self.inner.lock().await;
        let created = inner
            .commit(|doc| {
                let id = doc.next_tie_id;
                let created = Tie {
                    id,
                    name_ru: tie.name_ru,
                    name_kz: tie.name_kz,
                    name_en: tie.name_en,
                    color_ru: tie.color_ru,
                    color_kz: tie.color_kz,
                    color_en: tie.color_en,
                    material_ru: tie.material_ru,
                    material_kz: tie.material_kz,
                    material_en: tie.material_en,
                    description_ru: tie.description_ru,
                    description_kz: tie.description_kz,
                    description_en: tie.description_en,
                    price: tie.price,
                    image_path: tie.image_path,
                    is_active: true,
                    created_at: Utc::now(),
                };
                doc.ties.insert(id, created.clone());
                doc.next_tie_id = id + 1;
                created
            })
            .await?;
        info!(tie_id = created.id, "Tie created");
        Ok(created)
    }

    async fn get_tie(&self, id: i64) -> StoreResult<Option<Tie>> {
        let inner = self.inner.lock().await;
        Ok(inner.doc.ties.get(&id).cloned())
    }

    async fn list_active_ties(&self) -> StoreResult<Vec<Tie>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .doc
            .ties
            .values()
            .filter(|tie| tie.is_active)
            .cloned()
            .collect())
    }

    async fn list_all_ties(&self) -> StoreResult<Vec<Tie>> {
        let inner = self.inner.lock().await;
        Ok(inner.doc.ties.values().cloned().collect())
    }

    async fn update_tie(&self, id: i64, update: &TieUpdate) -> StoreResult<Option<Tie>> {
        let mut inner = self.inner.lock().await;
        if !inner.doc.ties.contains_key(&id) {
            return Ok(None);
        }
        inner
            .commit(|doc| {
                doc.ties.get_mut(&id).map(|tie| {
                    update.apply_to(tie);
                    tie.clone()
                })
            })
            .await
    }

    async fn set_tie_active(&self, id: i64, active: bool) -> StoreResult<Option<Tie>> {
        let mut inner = self.inner.lock().await;
        if !inner.doc.ties.contains_key(&id) {
            return Ok(None);
        }
        inner
            .commit(|doc| {
                doc.ties.get_mut(&id).map(|tie| {
                    tie.is_active = active;
                    tie.clone()
                })
            })
            .await
    }

    async fn count_ties(&self) -> StoreResult<u64> {
        let inner = self.inner.lock().await;
        Ok(inner.doc.ties.len() as u64)
    }

    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        let mut inner = self.inner.lock().await;
        let created = inner
            .commit(|doc| {
                let id = doc.next_order_id;
                let created = Order {
                    id,
                    buyer_id: order.buyer_id,
                    tie_id: order.tie_id,
                    tie_name: order.tie_name,
                    price: order.price,
                    recipient_name: order.recipient_name,
                    recipient_surname: order.recipient_surname,
                    recipient_phone: order.recipient_phone,
                    delivery_address: order.delivery_address,
                    status: OrderStatus::PendingPayment,
                    delivery_days: None,
                    created_at: Utc::now(),
                };
                doc.orders.insert(id, created.clone());
                doc.next_order_id = id + 1;
                created
            })
            .await?;
        info!(order_id = created.id, buyer_id = created.buyer_id, "Order created");
        Ok(created)
    }

    async fn get_order(&self, id: i64) -> StoreResult<Option<Order>> {
        let inner = self.inner.lock().await;
        Ok(inner.doc.orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let inner = self.inner.lock().await;
        Ok(Document::newest_first(inner.doc.orders.values().cloned()))
    }

    async fn list_user_orders(&self, buyer_id: i64) -> StoreResult<Vec<Order>> {
        let inner = self.inner.lock().await;
        Ok(Document::newest_first(
            inner
                .doc
                .orders
                .values()
                .filter(|order| order.buyer_id == buyer_id)
                .cloned(),
        ))
    }

    async fn transition_order(&self, id: i64, change: StatusChange) -> StoreResult<TransitionOutcome> {
        let mut inner = self.inner.lock().await;
        match inner.doc.orders.get(&id) {
            None => return Ok(TransitionOutcome::NotFound),
            Some(order) if order.status != change.expected => {
                return Ok(TransitionOutcome::Conflict {
                    actual: order.status,
                });
            }
            Some(_) => {}
        }

        let updated = inner
            .commit(|doc| {
                doc.orders.get_mut(&id).map(|order| {
                    order.status = change.next;
                    if let Some(days) = change.delivery_days {
                        order.delivery_days = Some(days);
                    }
                    order.clone()
                })
            })
            .await?;
        Ok(updated.map_or(TransitionOutcome::NotFound, TransitionOutcome::Applied))
    }

    async fn purge_orders_and_users(&self) -> StoreResult<PurgeSummary> {
        let mut inner = self.inner.lock().await;
        inner
            .commit(|doc| {
                let summary = PurgeSummary {
                    orders: doc.orders.len() as u64,
                    users: doc.users.len() as u64,
                };
                doc.orders.clear();
                doc.users.clear();
                summary
            })
            .await
    }
}
