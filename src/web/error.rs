//! Mapping of shop errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::{ShopError, StoreError, ValidationError};

/// Error returned by every HTTP handler
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Shop(#[from] ShopError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Shop(ShopError::Store(err))
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Shop(ShopError::Validation(err))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        let AppError::Shop(err) = self;
        match err {
            ShopError::Validation(_) => StatusCode::BAD_REQUEST,
            ShopError::NotFound { .. } => StatusCode::NOT_FOUND,
            ShopError::Unauthorized => StatusCode::UNAUTHORIZED,
            ShopError::Conflict { .. } | ShopError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ShopError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Don't expose internal error details to clients
        let body = match &self {
            AppError::Shop(ShopError::Store(cause)) => {
                tracing::error!(error = %cause, "Request failed on storage");
                json!({ "error": "internal server error" })
            }
            AppError::Shop(ShopError::Validation(err)) => json!({
                "error": self.to_string(),
                "field": err.field.as_str(),
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Entity, Field, ValidationIssue};
    use crate::order_lifecycle::OrderStatus;

    #[test]
    fn test_app_error_status_codes() {
        fn status_of(err: impl Into<AppError>) -> StatusCode {
            err.into().into_response().status()
        }

        assert_eq!(
            status_of(ValidationError::new(Field::Phone, ValidationIssue::InvalidPhone)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ShopError::not_found(Entity::Tie, 3)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(ShopError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(ShopError::Conflict {
                order_id: 1,
                expected: OrderStatus::PendingAdminReview,
                actual: OrderStatus::Confirmed,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(StoreError::Corrupt("bad row".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
