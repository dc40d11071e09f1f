//! Public catalog and web checkout.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{AppError, WebState};
use crate::checkout::validate_details;
use crate::error::{Entity, ShopError};
use crate::model::{format_price, Language, Order, Tie};
use crate::notify::Messenger;
use crate::store::ShopRepository;

#[derive(Debug, Default, Deserialize)]
pub struct LangQuery {
    pub lang: Option<String>,
}

impl LangQuery {
    fn language(&self) -> Language {
        Language::detect(self.lang.as_deref())
    }
}

/// A tie as shown to buyers in one language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieView {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub material: String,
    pub description: String,
    pub price: i64,
    pub price_display: String,
    pub image_url: Option<String>,
}

impl TieView {
    pub fn new(tie: &Tie, lang: Language) -> Self {
        Self {
            id: tie.id,
            name: tie.name(lang).to_string(),
            color: tie.color(lang).to_string(),
            material: tie.material(lang).to_string(),
            description: tie.description(lang).to_string(),
            price: tie.price,
            price_display: format!("{} ₸", format_price(tie.price)),
            image_url: tie.image_path.as_ref().map(|name| format!("/images/{name}")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub telegram_id: i64,
    pub tie_id: i64,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct TelegramAuthRequest {
    pub telegram_id: i64,
}

pub async fn health<M: Messenger>(State(state): State<WebState<M>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "store": state.ctx.store.backend_name(),
    }))
}

pub async fn list_ties<M: Messenger>(
    State(state): State<WebState<M>>,
    Query(query): Query<LangQuery>,
) -> Result<Json<Vec<TieView>>, AppError> {
    let lang = query.language();
    let ties = state.ctx.store.list_active_ties().await?;
    Ok(Json(ties.iter().map(|tie| TieView::new(tie, lang)).collect()))
}

pub async fn get_tie<M: Messenger>(
    State(state): State<WebState<M>>,
    Path(id): Path<i64>,
    Query(query): Query<LangQuery>,
) -> Result<Json<TieView>, AppError> {
    let tie = state
        .ctx
        .store
        .get_tie(id)
        .await?
        .filter(|tie| tie.is_active)
        .ok_or_else(|| ShopError::not_found(Entity::Tie, id))?;
    Ok(Json(TieView::new(&tie, query.language())))
}

pub async fn create_order<M: Messenger>(
    State(state): State<WebState<M>>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let details = validate_details(
        &request.name,
        &request.surname,
        &request.phone,
        &request.address,
    )?;
    let order = state
        .ctx
        .orders()
        .place_order(request.telegram_id, request.tie_id, &details)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn user_orders<M: Messenger>(
    State(state): State<WebState<M>>,
    Path(telegram_id): Path<i64>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.ctx.store.list_user_orders(telegram_id).await?))
}

pub async fn auth_telegram<M: Messenger>(
    State(state): State<WebState<M>>,
    Json(request): Json<TelegramAuthRequest>,
) -> Json<Value> {
    Json(json!({
        "telegram_id": request.telegram_id,
        "is_admin": state.ctx.is_admin(request.telegram_id),
    }))
}
