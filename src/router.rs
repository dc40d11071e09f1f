//! # Mode Router
//!
//! Decides what one incoming free-form message means for a chat. The chat
//! holds exactly one [`SessionMode`]; [`route`] maps that mode and the
//! message to the next mode and a single [`Effect`] for the bot layer to
//! carry out. The function is pure: no store access and no I/O.

use crate::catalog::parse_price;
use crate::checkout::{self, CheckoutDetails, StepOutcome};
use crate::dialogue::{BroadcastTarget, SessionMode, TieDraft, TieDraftStep};
use crate::error::{Field, ValidationError, ValidationIssue};
use crate::model::{TieField, TieUpdate};
use crate::order_lifecycle::parse_delivery_days;

/// Leaves whatever mode the chat is in
pub const CANCEL_COMMAND: &str = "/cancel";

/// Exact phrase an admin must type to wipe orders and users
pub const PURGE_CONFIRMATION: &str = "CONFIRM_CLEAR_ALL";

/// Payload of an incoming message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    Text(&'a str),
    /// Telegram file id of the largest photo size
    Photo(&'a str),
}

/// A fully collected new tie, ready to be stored once the photo is saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTieDraft {
    pub name: String,
    pub color: String,
    pub price: i64,
    pub description: String,
    pub photo_file_id: String,
}

/// Side effect the bot layer performs after routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ignore the message
    Discard,
    /// Ask the question identified by this localization key
    Prompt(&'static str),
    /// Report the problem and ask the same question again
    Invalid {
        error: ValidationError,
        prompt: &'static str,
    },
    /// Checkout details are complete; show the summary with Pay / Cancel
    ShowCheckoutSummary {
        tie_id: i64,
        details: CheckoutDetails,
    },
    /// The chat left its mode through `/cancel`
    Cancelled,
    UpdateTie {
        tie_id: i64,
        field: TieField,
        update: TieUpdate,
    },
    SaveTiePhoto {
        tie_id: i64,
        file_id: String,
    },
    CreateTie(CompletedTieDraft),
    SendBroadcast {
        target: BroadcastTarget,
        text: String,
    },
    Dispatch {
        order_id: i64,
        days: u32,
    },
    Purge,
    PurgeAborted,
}

/// Next mode plus the effect to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub next: SessionMode,
    pub effect: Effect,
}

impl Routed {
    fn new(next: SessionMode, effect: Effect) -> Self {
        Self { next, effect }
    }

    fn stay(mode: SessionMode, effect: Effect) -> Self {
        Self::new(mode, effect)
    }

    fn idle(effect: Effect) -> Self {
        Self::new(SessionMode::Idle, effect)
    }
}

/// Route one message for a chat in `mode`
pub fn route(mode: SessionMode, input: Input<'_>, is_admin: bool) -> Routed {
    if mode.requires_admin() && !is_admin {
        return Routed::idle(Effect::Discard);
    }

    if let Input::Text(text) = input {
        if text.trim() == CANCEL_COMMAND {
            return match mode {
                SessionMode::Idle => Routed::idle(Effect::Discard),
                _ => Routed::idle(Effect::Cancelled),
            };
        }
    }

    match mode {
        SessionMode::Idle => Routed::idle(Effect::Discard),
        SessionMode::Checkout {
            tie_id,
            step,
            draft,
        } => route_checkout(tie_id, step, draft, input),
        SessionMode::AddingTie { step, draft } => route_adding_tie(step, draft, input),
        SessionMode::EditingTie { tie_id, field } => route_editing_tie(tie_id, field, input),
        SessionMode::ComposingBroadcast { target } => match input {
            Input::Text(text) => match non_empty(Field::Text, text) {
                Ok(text) => Routed::idle(Effect::SendBroadcast { target, text }),
                Err(error) => Routed::stay(
                    mode,
                    Effect::Invalid {
                        error,
                        prompt: "admin-broadcast-ask-text",
                    },
                ),
            },
            Input::Photo(_) => Routed::stay(mode, Effect::Discard),
        },
        SessionMode::AwaitingDeliveryDays { order_id } => match input {
            Input::Text(text) => match parse_delivery_days(text) {
                Ok(days) => Routed::idle(Effect::Dispatch { order_id, days }),
                Err(error) => Routed::stay(
                    mode,
                    Effect::Invalid {
                        error,
                        prompt: "admin-ask-delivery-days",
                    },
                ),
            },
            Input::Photo(_) => Routed::stay(mode, Effect::Discard),
        },
        SessionMode::ConfirmingPurge => match input {
            Input::Text(text) if text.trim() == PURGE_CONFIRMATION => Routed::idle(Effect::Purge),
            _ => Routed::idle(Effect::PurgeAborted),
        },
    }
}

fn route_checkout(
    tie_id: i64,
    step: checkout::CheckoutStep,
    draft: checkout::CheckoutDraft,
    input: Input<'_>,
) -> Routed {
    let current = SessionMode::Checkout {
        tie_id,
        step,
        draft: draft.clone(),
    };
    let Input::Text(text) = input else {
        return Routed::stay(current, Effect::Discard);
    };
    if step == checkout::CheckoutStep::Confirm {
        return Routed::stay(current, Effect::Prompt("checkout-use-buttons"));
    }

    match checkout::advance(step, &draft, text) {
        StepOutcome::Next { step, draft } => Routed::new(
            SessionMode::Checkout {
                tie_id,
                step,
                draft,
            },
            Effect::Prompt(step.prompt_key()),
        ),
        StepOutcome::Complete { draft, details } => Routed::new(
            SessionMode::Checkout {
                tie_id,
                step: checkout::CheckoutStep::Confirm,
                draft,
            },
            Effect::ShowCheckoutSummary { tie_id, details },
        ),
        StepOutcome::Retry { error } => Routed::stay(
            current,
            Effect::Invalid {
                error,
                prompt: step.prompt_key(),
            },
        ),
    }
}

fn route_adding_tie(step: TieDraftStep, draft: TieDraft, input: Input<'_>) -> Routed {
    let current = SessionMode::AddingTie {
        step,
        draft: draft.clone(),
    };
    let retry = |error: ValidationError| {
        Routed::stay(
            current.clone(),
            Effect::Invalid {
                error,
                prompt: step.prompt_key(),
            },
        )
    };

    let advance_to = |next: TieDraftStep, draft: TieDraft| {
        Routed::new(
            SessionMode::AddingTie { step: next, draft },
            Effect::Prompt(next.prompt_key()),
        )
    };

    match (step, input) {
        (TieDraftStep::Photo, Input::Photo(file_id)) => {
            match (draft.name, draft.color, draft.price, draft.description) {
                (Some(name), Some(color), Some(price), Some(description)) => {
                    Routed::idle(Effect::CreateTie(CompletedTieDraft {
                        name,
                        color,
                        price,
                        description,
                        photo_file_id: file_id.to_string(),
                    }))
                }
                _ => advance_to(TieDraftStep::Name, TieDraft::default()),
            }
        }
        (TieDraftStep::Photo, Input::Text(_)) => {
            Routed::stay(current, Effect::Prompt(TieDraftStep::Photo.prompt_key()))
        }
        (_, Input::Photo(_)) => Routed::stay(current, Effect::Discard),
        (TieDraftStep::Name, Input::Text(text)) => match non_empty(Field::TieName, text) {
            Ok(name) => advance_to(
                TieDraftStep::Color,
                TieDraft {
                    name: Some(name),
                    ..draft
                },
            ),
            Err(error) => retry(error),
        },
        (TieDraftStep::Color, Input::Text(text)) => match non_empty(Field::Text, text) {
            Ok(color) => advance_to(
                TieDraftStep::Price,
                TieDraft {
                    color: Some(color),
                    ..draft
                },
            ),
            Err(error) => retry(error),
        },
        (TieDraftStep::Price, Input::Text(text)) => match parse_price(text) {
            Ok(price) => advance_to(
                TieDraftStep::Description,
                TieDraft {
                    price: Some(price),
                    ..draft
                },
            ),
            Err(error) => retry(error),
        },
        (TieDraftStep::Description, Input::Text(text)) => match non_empty(Field::Text, text) {
            Ok(description) => advance_to(
                TieDraftStep::Photo,
                TieDraft {
                    description: Some(description),
                    ..draft
                },
            ),
            Err(error) => retry(error),
        },
    }
}

fn route_editing_tie(tie_id: i64, field: TieField, input: Input<'_>) -> Routed {
    let current = SessionMode::EditingTie { tie_id, field };
    let prompt = "admin-edit-ask-value";

    match (field, input) {
        (TieField::Photo, Input::Photo(file_id)) => Routed::idle(Effect::SaveTiePhoto {
            tie_id,
            file_id: file_id.to_string(),
        }),
        (TieField::Photo, Input::Text(_)) => Routed::stay(current, Effect::Prompt("admin-edit-ask-photo")),
        (_, Input::Photo(_)) => Routed::stay(current, Effect::Discard),
        (field, Input::Text(text)) => match text_update(field, text) {
            Ok(update) => Routed::idle(Effect::UpdateTie {
                tie_id,
                field,
                update,
            }),
            Err(error) => Routed::stay(current, Effect::Invalid { error, prompt }),
        },
    }
}

/// Build the sparse update for a single text field; the value is written to
/// every language
fn text_update(field: TieField, text: &str) -> Result<TieUpdate, ValidationError> {
    let update = match field {
        TieField::Price => TieUpdate {
            price: Some(parse_price(text)?),
            ..Default::default()
        },
        TieField::Name => {
            let value = non_empty(Field::TieName, text)?;
            TieUpdate {
                name_ru: Some(value.clone()),
                name_kz: Some(value.clone()),
                name_en: Some(value),
                ..Default::default()
            }
        }
        TieField::Color => {
            let value = non_empty(Field::Text, text)?;
            TieUpdate {
                color_ru: Some(value.clone()),
                color_kz: Some(value.clone()),
                color_en: Some(value),
                ..Default::default()
            }
        }
        TieField::Material => {
            let value = non_empty(Field::Text, text)?;
            TieUpdate {
                material_ru: Some(value.clone()),
                material_kz: Some(value.clone()),
                material_en: Some(value),
                ..Default::default()
            }
        }
        TieField::Description => {
            let value = non_empty(Field::Text, text)?;
            TieUpdate {
                description_ru: Some(value.clone()),
                description_kz: Some(value.clone()),
                description_en: Some(value),
                ..Default::default()
            }
        }
        TieField::Photo => {
            return Err(ValidationError::new(Field::Text, ValidationIssue::Empty));
        }
    };
    Ok(update)
}

fn non_empty(field: Field, text: &str) -> Result<String, ValidationError> {
    let value = text.trim();
    if value.is_empty() {
        Err(ValidationError::new(field, ValidationIssue::Empty))
    } else {
        Ok(value.to_string())
    }
}
