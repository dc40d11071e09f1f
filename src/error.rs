//! # Error Types Module
//!
//! Error taxonomy shared by the bot, the web console and the store backends.
//! Validation and not-found errors never leave a record half written; store
//! errors carry the underlying cause for admin-facing logs.

use std::fmt;

use thiserror::Error;

use crate::order_lifecycle::OrderStatus;

/// Input field a validation error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Field {
    Name,
    Surname,
    Phone,
    Address,
    Price,
    DeliveryDays,
    TieName,
    Text,
}

impl Field {
    /// Stable identifier, also used to build the `field-*` localization key
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Surname => "surname",
            Field::Phone => "phone",
            Field::Address => "address",
            Field::Price => "price",
            Field::DeliveryDays => "delivery-days",
            Field::TieName => "tie-name",
            Field::Text => "text",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is wrong with a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ValidationIssue {
    Empty,
    TooShort { min: usize },
    InvalidCharacters,
    InvalidPhone,
    NotANumber,
    NotPositive,
}

impl ValidationIssue {
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationIssue::Empty => "validation-empty",
            ValidationIssue::TooShort { .. } => "validation-too-short",
            ValidationIssue::InvalidCharacters => "validation-invalid-characters",
            ValidationIssue::InvalidPhone => "validation-invalid-phone",
            ValidationIssue::NotANumber => "validation-not-a-number",
            ValidationIssue::NotPositive => "validation-not-positive",
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::Empty => write!(f, "value is empty"),
            ValidationIssue::TooShort { min } => write!(f, "must be at least {min} characters"),
            ValidationIssue::InvalidCharacters => write!(f, "only letters, spaces and hyphens are allowed"),
            ValidationIssue::InvalidPhone => write!(f, "expected a +7XXXXXXXXXX phone number"),
            ValidationIssue::NotANumber => write!(f, "expected a whole number"),
            ValidationIssue::NotPositive => write!(f, "must be greater than zero"),
        }
    }
}

/// Malformed user input for one field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {issue}")]
pub struct ValidationError {
    pub field: Field,
    pub issue: ValidationIssue,
}

impl ValidationError {
    pub fn new(field: Field, issue: ValidationIssue) -> Self {
        Self { field, issue }
    }
}

/// Entity kinds that can be looked up by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Tie,
    Order,
    User,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Tie => f.write_str("tie"),
            Entity::Order => f.write_str("order"),
            Entity::User => f.write_str("user"),
        }
    }
}

/// Storage backend failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("json store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Errors surfaced by shop operations
#[derive(Debug, Error)]
pub enum ShopError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} #{id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error("not authorized")]
    Unauthorized,

    #[error("order #{order_id} changed concurrently: expected {expected}, found {actual}")]
    Conflict {
        order_id: i64,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    #[error("order #{order_id} cannot {action} while {from}")]
    InvalidTransition {
        order_id: i64,
        from: OrderStatus,
        action: &'static str,
    },

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl ShopError {
    pub fn not_found(entity: Entity, id: i64) -> Self {
        ShopError::NotFound { entity, id }
    }

    /// Localization key describing this error to an end user
    pub fn message_key(&self) -> &'static str {
        match self {
            ShopError::Validation(err) => err.issue.message_key(),
            ShopError::NotFound { entity: Entity::Tie, .. } => "error-tie-not-found",
            ShopError::NotFound { entity: Entity::Order, .. } => "error-order-not-found",
            ShopError::NotFound { entity: Entity::User, .. } => "error-user-not-found",
            ShopError::Unauthorized => "error-unauthorized",
            ShopError::Conflict { .. } => "error-conflict",
            ShopError::InvalidTransition { .. } => "error-invalid-transition",
            ShopError::Store(_) => "error-internal",
        }
    }
}

pub type ShopResult<T> = Result<T, ShopError>;
pub type StoreResult<T> = Result<T, StoreError>;
