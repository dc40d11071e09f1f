//! Admin console endpoints. Every handler takes an [`AdminGuard`].

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::auth::AdminGuard;
use super::{AppError, WebState};
use crate::broadcast::{broadcast_to, BroadcastReport};
use crate::catalog;
use crate::dialogue::BroadcastTarget;
use crate::error::{Field, ValidationError, ValidationIssue};
use crate::model::{NewTie, Order, Tie, TieUpdate};
use crate::notify::Messenger;
use crate::report::SalesReport;
use crate::store::ShopRepository;

#[derive(Debug, Deserialize)]
pub struct DeliveryRequest {
    /// Number of days, as a JSON number or string
    pub days: Value,
}

impl DeliveryRequest {
    fn raw_days(&self) -> String {
        match &self.days {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub text: String,
    /// Send to one user instead of everybody
    #[serde(default)]
    pub telegram_id: Option<i64>,
}

pub async fn list_orders<M: Messenger>(
    _admin: AdminGuard,
    State(state): State<WebState<M>>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.ctx.store.list_orders().await?))
}

pub async fn approve_order<M: Messenger>(
    AdminGuard(who): AdminGuard,
    State(state): State<WebState<M>>,
    Path(id): Path<i64>,
) -> Result<Json<Order>, AppError> {
    let order = state.ctx.orders().approve(id).await?;
    info!(order_id = id, admin = ?who, "Order approved from web");
    Ok(Json(order))
}

pub async fn reject_order<M: Messenger>(
    AdminGuard(who): AdminGuard,
    State(state): State<WebState<M>>,
    Path(id): Path<i64>,
) -> Result<Json<Order>, AppError> {
    let order = state.ctx.orders().reject(id).await?;
    info!(order_id = id, admin = ?who, "Order rejected from web");
    Ok(Json(order))
}

pub async fn set_delivery<M: Messenger>(
    _admin: AdminGuard,
    State(state): State<WebState<M>>,
    Path(id): Path<i64>,
    Json(request): Json<DeliveryRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .ctx
        .orders()
        .dispatch_from_input(id, &request.raw_days())
        .await?;
    Ok(Json(order))
}

pub async fn mark_delivered<M: Messenger>(
    _admin: AdminGuard,
    State(state): State<WebState<M>>,
    Path(id): Path<i64>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.ctx.orders().mark_delivered(id).await?))
}

pub async fn list_ties<M: Messenger>(
    _admin: AdminGuard,
    State(state): State<WebState<M>>,
) -> Result<Json<Vec<Tie>>, AppError> {
    Ok(Json(state.ctx.store.list_all_ties().await?))
}

pub async fn create_tie<M: Messenger>(
    _admin: AdminGuard,
    State(state): State<WebState<M>>,
    Json(tie): Json<NewTie>,
) -> Result<(StatusCode, Json<Tie>), AppError> {
    let tie = catalog::create_tie(&state.ctx.store, tie).await?;
    Ok((StatusCode::CREATED, Json(tie)))
}

pub async fn update_tie<M: Messenger>(
    _admin: AdminGuard,
    State(state): State<WebState<M>>,
    Path(id): Path<i64>,
    Json(update): Json<TieUpdate>,
) -> Result<Json<Tie>, AppError> {
    Ok(Json(catalog::update_tie(&state.ctx.store, id, &update).await?))
}

pub async fn delete_tie<M: Messenger>(
    _admin: AdminGuard,
    State(state): State<WebState<M>>,
    Path(id): Path<i64>,
) -> Result<Json<Tie>, AppError> {
    Ok(Json(catalog::soft_delete_tie(&state.ctx.store, id).await?))
}

pub async fn toggle_tie<M: Messenger>(
    _admin: AdminGuard,
    State(state): State<WebState<M>>,
    Path(id): Path<i64>,
) -> Result<Json<Tie>, AppError> {
    Ok(Json(catalog::toggle_tie(&state.ctx.store, id).await?))
}

pub async fn broadcast<M: Messenger>(
    _admin: AdminGuard,
    State(state): State<WebState<M>>,
    Json(request): Json<BroadcastRequest>,
) -> Result<Json<BroadcastReport>, AppError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(ValidationError::new(Field::Text, ValidationIssue::Empty).into());
    }
    let target = match request.telegram_id {
        Some(id) => BroadcastTarget::User(id),
        None => BroadcastTarget::All,
    };
    let report = broadcast_to(&state.ctx.store, &state.ctx.messenger, target, text).await?;
    Ok(Json(report))
}

pub async fn report<M: Messenger>(
    _admin: AdminGuard,
    State(state): State<WebState<M>>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.ctx.store.list_orders().await?;
    let users = state.ctx.store.list_users().await?;
    let report = SalesReport::build(&orders, &users);
    let disposition = format!("attachment; filename=\"{}\"", report.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.render_text(),
    ))
}
