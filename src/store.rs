//! # Store Module
//!
//! The repository contract shared by the Postgres backend ([`PgStore`]) and
//! the JSON file backend ([`JsonStore`]). Both satisfy the same contract;
//! [`Store`] dispatches to whichever one the deployment configured.
//!
//! Every mutation touches a single record and is atomic at the backend
//! level. Order status changes go through [`ShopRepository::transition_order`],
//! a compare-and-set on the current status.

use std::future::Future;

use crate::db::PgStore;
use crate::error::StoreResult;
use crate::json_store::JsonStore;
use crate::model::{Language, NewOrder, NewTie, Order, Tie, TieUpdate, User};
use crate::order_lifecycle::OrderStatus;

/// A requested status change, applied only if the order is still in `expected`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub expected: OrderStatus,
    pub next: OrderStatus,
    /// Delivery estimate to record alongside the change, if any
    pub delivery_days: Option<i32>,
}

impl StatusChange {
    pub fn new(expected: OrderStatus, next: OrderStatus) -> Self {
        Self {
            expected,
            next,
            delivery_days: None,
        }
    }

    pub fn with_delivery_days(mut self, days: i32) -> Self {
        self.delivery_days = Some(days);
        self
    }
}

/// Result of a compare-and-set status change
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(Order),
    NotFound,
    /// Someone else moved the order first
    Conflict { actual: OrderStatus },
}

/// Rows removed by a destructive reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub orders: u64,
    pub users: u64,
}

/// Users, ties and orders persistence
pub trait ShopRepository: Send + Sync {
    /// Fetch a user, registering them on first contact
    fn get_or_create_user(
        &self,
        telegram_id: i64,
        display_name: Option<&str>,
        language: Language,
    ) -> impl Future<Output = StoreResult<User>> + Send;

    fn get_user(&self, telegram_id: i64) -> impl Future<Output = StoreResult<Option<User>>> + Send;

    /// Returns `None` when the user is unknown
    fn set_user_language(
        &self,
        telegram_id: i64,
        language: Language,
    ) -> impl Future<Output = StoreResult<Option<User>>> + Send;

    fn list_users(&self) -> impl Future<Output = StoreResult<Vec<User>>> + Send;

    fn create_tie(&self, tie: NewTie) -> impl Future<Output = StoreResult<Tie>> + Send;

    /// Look up a tie regardless of its active flag
    fn get_tie(&self, id: i64) -> impl Future<Output = StoreResult<Option<Tie>>> + Send;

    fn list_active_ties(&self) -> impl Future<Output = StoreResult<Vec<Tie>>> + Send;

    fn list_all_ties(&self) -> impl Future<Output = StoreResult<Vec<Tie>>> + Send;

    /// Apply the provided fields only; `None` when the tie does not exist
    fn update_tie(
        &self,
        id: i64,
        update: &TieUpdate,
    ) -> impl Future<Output = StoreResult<Option<Tie>>> + Send;

    fn set_tie_active(
        &self,
        id: i64,
        active: bool,
    ) -> impl Future<Output = StoreResult<Option<Tie>>> + Send;

    fn count_ties(&self) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Insert an order in `pending_payment`
    fn create_order(&self, order: NewOrder) -> impl Future<Output = StoreResult<Order>> + Send;

    fn get_order(&self, id: i64) -> impl Future<Output = StoreResult<Option<Order>>> + Send;

    /// All orders, newest first
    fn list_orders(&self) -> impl Future<Output = StoreResult<Vec<Order>>> + Send;

    /// A buyer's orders, newest first
    fn list_user_orders(&self, buyer_id: i64) -> impl Future<Output = StoreResult<Vec<Order>>> + Send;

    fn transition_order(
        &self,
        id: i64,
        change: StatusChange,
    ) -> impl Future<Output = StoreResult<TransitionOutcome>> + Send;

    /// Delete every order and user; the catalog is kept
    fn purge_orders_and_users(&self) -> impl Future<Output = StoreResult<PurgeSummary>> + Send;
}

/// The configured backend
#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    Json(JsonStore),
}

impl Store {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Postgres(_) => "postgres",
            Store::Json(_) => "json",
        }
    }
}

macro_rules! delegate {
    ($self:ident, $method:ident ( $($arg:expr),* )) => {
        match $self {
            Store::Postgres(store) => store.$method($($arg),*).await,
            Store::Json(store) => store.$method($($arg),*).await,
        }
    };
}

impl ShopRepository for Store {
    async fn get_or_create_user(
        &self,
        telegram_id: i64,
        display_name: Option<&str>,
        language: Language,
    ) -> StoreResult<User> {
        delegate!(self, get_or_create_user(telegram_id, display_name, language))
    }

    async fn get_user(&self, telegram_id: i64) -> StoreResult<Option<User>> {
        delegate!(self, get_user(telegram_id))
    }

    async fn set_user_language(
        &self,
        telegram_id: i64,
        language: Language,
    ) -> StoreResult<Option<User>> {
        delegate!(self, set_user_language(telegram_id, language))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        delegate!(self, list_users())
    }

    async fn create_tie(&self, tie: NewTie) -> StoreResult<Tie> {
        delegate!(self, create_tie(tie))
    }

    async fn get_tie(&self, id: i64) -> StoreResult<Option<Tie>> {
        delegate!(self, get_tie(id))
    }

    async fn list_active_ties(&self) -> StoreResult<Vec<Tie>> {
        delegate!(self, list_active_ties())
    }

    async fn list_all_ties(&self) -> StoreResult<Vec<Tie>> {
        delegate!(self, list_all_ties())
    }

    async fn update_tie(&self, id: i64, update: &TieUpdate) -> StoreResult<Option<Tie>> {
        delegate!(self, update_tie(id, update))
    }

    async fn set_tie_active(&self, id: i64, active: bool) -> StoreResult<Option<Tie>> {
        delegate!(self, set_tie_active(id, active))
    }

    async fn count_ties(&self) -> StoreResult<u64> {
        delegate!(self, count_ties())
    }

    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        delegate!(self, create_order(order))
    }

    async fn get_order(&self, id: i64) -> StoreResult<Option<Order>> {
        delegate!(self, get_order(id))
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        delegate!(self, list_orders())
    }

    async fn list_user_orders(&self, buyer_id: i64) -> StoreResult<Vec<Order>> {
        delegate!(self, list_user_orders(buyer_id))
    }

    async fn transition_order(&self, id: i64, change: StatusChange) -> StoreResult<TransitionOutcome> {
        delegate!(self, transition_order(id, change))
    }

    async fn purge_orders_and_users(&self) -> StoreResult<PurgeSummary> {
        delegate!(self, purge_orders_and_users())
    }
}
