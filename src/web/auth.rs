//! Admin authentication for the web console.
//!
//! A request is an admin request when it carries either
//! `Authorization: Bearer <ADMIN_PASSWORD>` or an `X-Telegram-Id` header naming
//! a configured admin.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use secrecy::ExposeSecret;
use tracing::warn;

use super::{AppError, WebState};
use crate::error::ShopError;
use crate::notify::Messenger;

pub const TELEGRAM_ID_HEADER: &str = "x-telegram-id";

/// How the caller proved admin rights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminIdentity {
    Password,
    Telegram(i64),
}

/// Extractor that rejects non-admin requests with 401
///
/// ```rust,ignore
/// async fn handler(AdminGuard(who): AdminGuard) -> impl IntoResponse { .. }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AdminGuard(pub AdminIdentity);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn telegram_id(parts: &Parts) -> Option<i64> {
    parts
        .headers
        .get(TELEGRAM_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

impl<M> FromRequestParts<WebState<M>> for AdminGuard
where
    M: Messenger,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &WebState<M>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(parts) {
            let expected = state.admin_password.expose_secret();
            if !expected.is_empty() && token == expected {
                return Ok(Self(AdminIdentity::Password));
            }
        }

        if let Some(id) = telegram_id(parts) {
            if state.ctx.is_admin(id) {
                return Ok(Self(AdminIdentity::Telegram(id)));
            }
        }

        warn!(path = %parts.uri.path(), "Rejected admin request");
        Err(AppError::Shop(ShopError::Unauthorized))
    }
}
