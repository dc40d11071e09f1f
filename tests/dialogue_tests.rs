//! Conversation flows driven through the mode router

use tieshop::checkout::CheckoutStep;
use tieshop::dialogue::{BroadcastTarget, SessionMode, TieDraftStep};
use tieshop::error::{Field, ValidationIssue};
use tieshop::model::TieField;
use tieshop::router::{route, Effect, Input, Routed, PURGE_CONFIRMATION};

/// Feed text messages one by one, returning the final routing
fn run(mut mode: SessionMode, messages: &[&str], is_admin: bool) -> Routed {
    let mut last = None;
    for message in messages {
        let routed = route(mode, Input::Text(message), is_admin);
        mode = routed.next.clone();
        last = Some(routed);
    }
    last.expect("at least one message")
}

#[test]
fn test_checkout_conversation_reaches_summary() {
    let routed = run(
        SessionMode::checkout(7),
        &["Алия", "Серікова", "8 701 234 56 78", "Астана, пр. Мангилик Ел 55"],
        false,
    );

    match routed.effect {
        Effect::ShowCheckoutSummary { tie_id, details } => {
            assert_eq!(tie_id, 7);
            assert_eq!(details.phone, "+77012345678");
            assert_eq!(details.surname, "Серікова");
        }
        other => panic!("unexpected effect {other:?}"),
    }
    assert!(matches!(
        routed.next,
        SessionMode::Checkout {
            step: CheckoutStep::Confirm,
            ..
        }
    ));
}

#[test]
fn test_checkout_reprompts_on_bad_phone_without_losing_draft() {
    let mode = run(SessionMode::checkout(1), &["John", "Smith"], false).next;

    let routed = route(mode.clone(), Input::Text("12345"), false);
    match &routed.effect {
        Effect::Invalid { error, prompt } => {
            assert_eq!(error.field, Field::Phone);
            assert_eq!(error.issue, ValidationIssue::InvalidPhone);
            assert_eq!(*prompt, "checkout-ask-phone");
        }
        other => panic!("unexpected effect {other:?}"),
    }
    assert_eq!(routed.next, mode, "draft and step are kept");
}

#[test]
fn test_cancel_leaves_checkout() {
    let mode = run(SessionMode::checkout(1), &["John"], false).next;
    let routed = route(mode, Input::Text("/cancel"), false);
    assert_eq!(routed.next, SessionMode::Idle);
    assert_eq!(routed.effect, Effect::Cancelled);
}

#[test]
fn test_admin_adds_tie_step_by_step() {
    let mode = run(
        SessionMode::adding_tie(),
        &["Royal Blue", "Blue", "12 500", "Jacquard silk"],
        true,
    )
    .next;
    assert!(matches!(
        mode,
        SessionMode::AddingTie {
            step: TieDraftStep::Photo,
            ..
        }
    ));

    // Text at the photo step repeats the question
    let routed = route(mode.clone(), Input::Text("no photo"), true);
    assert_eq!(routed.effect, Effect::Prompt("admin-add-ask-photo"));

    let routed = route(mode, Input::Photo("file-abc"), true);
    assert_eq!(routed.next, SessionMode::Idle);
    match routed.effect {
        Effect::CreateTie(draft) => {
            assert_eq!(draft.name, "Royal Blue");
            assert_eq!(draft.price, 12500);
            assert_eq!(draft.photo_file_id, "file-abc");
        }
        other => panic!("unexpected effect {other:?}"),
    }
}

#[test]
fn test_admin_modes_are_dropped_for_non_admins() {
    for mode in [
        SessionMode::adding_tie(),
        SessionMode::ConfirmingPurge,
        SessionMode::AwaitingDeliveryDays { order_id: 1 },
        SessionMode::ComposingBroadcast {
            target: BroadcastTarget::All,
        },
        SessionMode::EditingTie {
            tie_id: 1,
            field: TieField::Price,
        },
    ] {
        let routed = route(mode, Input::Text(PURGE_CONFIRMATION), false);
        assert_eq!(routed.next, SessionMode::Idle);
        assert_eq!(routed.effect, Effect::Discard);
    }
}

#[test]
fn test_delivery_days_input() {
    let mode = SessionMode::AwaitingDeliveryDays { order_id: 5 };

    let routed = route(mode.clone(), Input::Text("через неделю"), true);
    assert_eq!(routed.next, mode);
    assert!(matches!(routed.effect, Effect::Invalid { .. }));

    let routed = route(mode, Input::Text("7"), true);
    assert_eq!(routed.next, SessionMode::Idle);
    assert_eq!(routed.effect, Effect::Dispatch { order_id: 5, days: 7 });
}

#[test]
fn test_purge_requires_exact_phrase() {
    let routed = route(SessionMode::ConfirmingPurge, Input::Text("confirm"), true);
    assert_eq!(routed.effect, Effect::PurgeAborted);

    let routed = route(SessionMode::ConfirmingPurge, Input::Text(PURGE_CONFIRMATION), true);
    assert_eq!(routed.effect, Effect::Purge);
}

#[test]
fn test_idle_discards_free_text_and_photos() {
    assert_eq!(
        route(SessionMode::Idle, Input::Text("hello"), true).effect,
        Effect::Discard
    );
    assert_eq!(
        route(SessionMode::Idle, Input::Photo("file"), false).effect,
        Effect::Discard
    );
}

#[test]
fn test_session_mode_serialization() {
    let mode = run(SessionMode::checkout(3), &["Ann"], false).next;
    let json = serde_json::to_string(&mode).unwrap();
    let restored: SessionMode = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, mode);
}
