//! End-to-end order workflow tests against the JSON store with a recording
//! messenger standing in for Telegram.

mod common;

use anyhow::Result;

use common::{admins, sample_details, sample_tie, temp_store, RecordingMessenger, ADMIN_ID, BUYER_ID};
use tieshop::catalog;
use tieshop::error::{Entity, Field, ShopError, ShopResult, ValidationIssue};
use tieshop::model::{Language, Order, TieUpdate};
use tieshop::notify::Messenger;
use tieshop::order_lifecycle::{OrderAction, OrderStatus};
use tieshop::orders::OrderWorkflow;
use tieshop::store::{ShopRepository, StatusChange, TransitionOutcome};

#[tokio::test]
async fn test_full_order_lifecycle() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let messenger = RecordingMessenger::new();
    let admins = admins();
    let workflow = OrderWorkflow::new(&store, &messenger, &admins, Language::En);

    let tie = catalog::create_tie(&store, sample_tie("Classic Navy", 15000)).await?;
    let order = workflow.place_order(BUYER_ID, tie.id, &sample_details()).await?;
    assert_eq!(order.status, OrderStatus::PendingPayment);
    assert_eq!(order.recipient_phone, "+77012345678");
    assert_eq!(messenger.sent_to(ADMIN_ID).len(), 1, "admins hear about new orders");

    let order = workflow.claim_payment(order.id, BUYER_ID).await?;
    assert_eq!(order.status, OrderStatus::PendingAdminReview);
    let claim = messenger.sent_to(ADMIN_ID).pop().unwrap();
    assert_eq!(claim.buttons.len(), 1, "approve / reject row attached");

    let order = workflow.approve(order.id).await?;
    assert_eq!(order.status, OrderStatus::Confirmed);

    let order = workflow.dispatch_from_input(order.id, " 3 ").await?;
    assert_eq!(order.status, OrderStatus::InDelivery);
    assert_eq!(order.delivery_days, Some(3));

    let order = workflow.mark_delivered(order.id).await?;
    assert_eq!(order.status, OrderStatus::Delivered);
    let delivered = messenger.sent_to(BUYER_ID).pop().unwrap();
    assert!(!delivered.buttons.is_empty(), "buyer gets a confirm-receipt button");

    let order = workflow.confirm_receipt(order.id, BUYER_ID).await?;
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.status.is_terminal());

    // approved, dispatched, delivered
    assert_eq!(messenger.sent_to(BUYER_ID).len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_price_snapshot_survives_catalog_edit() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let messenger = RecordingMessenger::new();
    let admins = admins();
    let workflow = OrderWorkflow::new(&store, &messenger, &admins, Language::En);

    let tie = catalog::create_tie(&store, sample_tie("Burgundy", 15000)).await?;
    let order = workflow.place_order(BUYER_ID, tie.id, &sample_details()).await?;

    let update = TieUpdate {
        name_ru: Some("Бордо Премиум".to_string()),
        price: Some(20000),
        ..Default::default()
    };
    let edited = catalog::update_tie(&store, tie.id, &update).await?;
    assert_eq!(edited.price, 20000);

    let stored = store.get_order(order.id).await?.unwrap();
    assert_eq!(stored.price, 15000);
    assert_eq!(stored.tie_name, "Burgundy");
    Ok(())
}

#[tokio::test]
async fn test_rejected_order_cannot_be_approved() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let messenger = RecordingMessenger::new();
    let admins = admins();
    let workflow = OrderWorkflow::new(&store, &messenger, &admins, Language::En);

    let tie = catalog::create_tie(&store, sample_tie("Grey", 9000)).await?;
    let order = workflow.place_order(BUYER_ID, tie.id, &sample_details()).await?;
    workflow.claim_payment(order.id, BUYER_ID).await?;
    workflow.reject(order.id).await?;

    let err = workflow.approve(order.id).await.unwrap_err();
    assert!(matches!(
        err,
        ShopError::InvalidTransition {
            from: OrderStatus::Rejected,
            ..
        }
    ));
    let stored = store.get_order(order.id).await?.unwrap();
    assert_eq!(stored.status, OrderStatus::Rejected);
    Ok(())
}

#[tokio::test]
async fn test_invalid_delivery_days_leave_status_unchanged() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let messenger = RecordingMessenger::new();
    let admins = admins();
    let workflow = OrderWorkflow::new(&store, &messenger, &admins, Language::En);

    let tie = catalog::create_tie(&store, sample_tie("Black", 12000)).await?;
    let order = workflow.place_order(BUYER_ID, tie.id, &sample_details()).await?;
    workflow.claim_payment(order.id, BUYER_ID).await?;
    workflow.approve(order.id).await?;

    for (input, issue) in [
        ("soon", ValidationIssue::NotANumber),
        ("0", ValidationIssue::NotPositive),
        ("-2", ValidationIssue::NotPositive),
        ("", ValidationIssue::Empty),
    ] {
        match workflow.dispatch_from_input(order.id, input).await {
            Err(ShopError::Validation(err)) => {
                assert_eq!(err.field, Field::DeliveryDays);
                assert_eq!(err.issue, issue, "input {input:?}");
            }
            other => panic!("expected validation error for {input:?}, got {other:?}"),
        }
    }

    let stored = store.get_order(order.id).await?.unwrap();
    assert_eq!(stored.status, OrderStatus::Confirmed);
    assert_eq!(stored.delivery_days, None);
    Ok(())
}

#[tokio::test]
async fn test_missing_order_is_not_found_and_malformed_input_is_validation() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let messenger = RecordingMessenger::new();
    let admins = admins();
    let workflow = OrderWorkflow::new(&store, &messenger, &admins, Language::En);

    let err = workflow.approve(999).await.unwrap_err();
    assert!(matches!(
        err,
        ShopError::NotFound {
            entity: Entity::Order,
            id: 999
        }
    ));
    assert_eq!(err.message_key(), "error-order-not-found");

    let err = workflow.dispatch_from_input(999, "abc").await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));

    let err = workflow.dispatch_from_input(999, "4").await.unwrap_err();
    assert!(matches!(err, ShopError::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn test_buyer_cannot_act_on_someone_elses_order() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let messenger = RecordingMessenger::new();
    let admins = admins();
    let workflow = OrderWorkflow::new(&store, &messenger, &admins, Language::En);

    let tie = catalog::create_tie(&store, sample_tie("Green", 8000)).await?;
    let order = workflow.place_order(BUYER_ID, tie.id, &sample_details()).await?;

    let err = workflow.claim_payment(order.id, BUYER_ID + 1).await.unwrap_err();
    assert!(matches!(err, ShopError::Unauthorized));
    let err = workflow.cancel(order.id, BUYER_ID + 1).await.unwrap_err();
    assert!(matches!(err, ShopError::Unauthorized));

    let order = workflow.cancel(order.id, BUYER_ID).await?;
    assert_eq!(order.status, OrderStatus::Cancelled);
    Ok(())
}

#[tokio::test]
async fn test_hidden_tie_cannot_be_ordered() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let messenger = RecordingMessenger::new();
    let admins = admins();
    let workflow = OrderWorkflow::new(&store, &messenger, &admins, Language::En);

    let tie = catalog::create_tie(&store, sample_tie("Retired", 5000)).await?;
    catalog::soft_delete_tie(&store, tie.id).await?;

    let err = workflow
        .place_order(BUYER_ID, tie.id, &sample_details())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ShopError::NotFound {
            entity: Entity::Tie,
            ..
        }
    ));
    assert!(store.list_orders().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_notification_does_not_block_the_order() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let messenger = RecordingMessenger::failing_for([ADMIN_ID]);
    let admins = admins();
    let workflow = OrderWorkflow::new(&store, &messenger, &admins, Language::En);

    let tie = catalog::create_tie(&store, sample_tie("Silver", 11000)).await?;
    let order = workflow.place_order(BUYER_ID, tie.id, &sample_details()).await?;
    let order = workflow.claim_payment(order.id, BUYER_ID).await?;

    assert_eq!(order.status, OrderStatus::PendingAdminReview);
    assert!(messenger.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_stale_transition_reports_conflict() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let messenger = RecordingMessenger::new();
    let admins = admins();
    let workflow = OrderWorkflow::new(&store, &messenger, &admins, Language::En);

    let tie = catalog::create_tie(&store, sample_tie("Teal", 10000)).await?;
    let order = workflow.place_order(BUYER_ID, tie.id, &sample_details()).await?;
    workflow.claim_payment(order.id, BUYER_ID).await?;

    // Two admins read the order in review; the first one approves
    let approve = StatusChange::new(OrderStatus::PendingAdminReview, OrderStatus::Confirmed);
    let reject = StatusChange::new(OrderStatus::PendingAdminReview, OrderStatus::Rejected);
    assert!(matches!(
        store.transition_order(order.id, approve).await?,
        TransitionOutcome::Applied(_)
    ));
    assert_eq!(
        store.transition_order(order.id, reject).await?,
        TransitionOutcome::Conflict {
            actual: OrderStatus::Confirmed
        }
    );
    assert_eq!(
        store.transition_order(4242, reject).await?,
        TransitionOutcome::NotFound
    );
    Ok(())
}

async fn perform<R: ShopRepository, M: Messenger>(
    workflow: &OrderWorkflow<'_, R, M>,
    order_id: i64,
    action: OrderAction,
) -> ShopResult<Order> {
    match action {
        OrderAction::ClaimPayment => workflow.claim_payment(order_id, BUYER_ID).await,
        OrderAction::Cancel => workflow.cancel(order_id, BUYER_ID).await,
        OrderAction::Approve => workflow.approve(order_id).await,
        OrderAction::Reject => workflow.reject(order_id).await,
        OrderAction::Dispatch { days } => workflow.dispatch(order_id, days).await,
        OrderAction::MarkDelivered => workflow.mark_delivered(order_id).await,
        OrderAction::ConfirmReceipt => workflow.confirm_receipt(order_id, BUYER_ID).await,
    }
}

#[tokio::test]
async fn test_every_status_and_action_against_the_store() -> Result<()> {
    use OrderStatus::*;

    let (_dir, store) = temp_store().await;
    let messenger = RecordingMessenger::new();
    let admins = admins();
    let workflow = OrderWorkflow::new(&store, &messenger, &admins, Language::En);
    let tie = catalog::create_tie(&store, sample_tie("Navy", 15000)).await?;

    let actions = [
        OrderAction::ClaimPayment,
        OrderAction::Cancel,
        OrderAction::Approve,
        OrderAction::Reject,
        OrderAction::Dispatch { days: 2 },
        OrderAction::MarkDelivered,
        OrderAction::ConfirmReceipt,
    ];

    for from in OrderStatus::ALL {
        for action in actions {
            let order = workflow.place_order(BUYER_ID, tie.id, &sample_details()).await?;
            if from != PendingPayment {
                let forced = store
                    .transition_order(order.id, StatusChange::new(PendingPayment, from))
                    .await?;
                assert!(matches!(forced, TransitionOutcome::Applied(_)));
            }

            let expected = match (from, action) {
                (PendingPayment, OrderAction::ClaimPayment) => Some(PendingAdminReview),
                (PendingPayment, OrderAction::Cancel) => Some(Cancelled),
                (PendingAdminReview, OrderAction::Approve) => Some(Confirmed),
                (PendingAdminReview, OrderAction::Reject) => Some(Rejected),
                (Confirmed, OrderAction::Dispatch { .. }) => Some(InDelivery),
                (InDelivery, OrderAction::MarkDelivered) => Some(Delivered),
                (Delivered, OrderAction::ConfirmReceipt) => Some(Completed),
                _ => None,
            };

            let result = perform(&workflow, order.id, action).await;
            let stored = store.get_order(order.id).await?.unwrap().status;
            match expected {
                Some(to) => {
                    assert_eq!(result?.status, to, "{from} + {}", action.name());
                    assert_eq!(stored, to);
                }
                None => {
                    assert!(
                        matches!(result, Err(ShopError::InvalidTransition { .. })),
                        "{from} + {} should be refused",
                        action.name()
                    );
                    assert_eq!(stored, from, "refused {} changed the order", action.name());
                }
            }
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_delivery_prompt_only_for_confirmed_orders() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let messenger = RecordingMessenger::new();
    let admins = admins();
    let workflow = OrderWorkflow::new(&store, &messenger, &admins, Language::En);
    let tie = catalog::create_tie(&store, sample_tie("Navy", 15000)).await?;

    let order = workflow.place_order(BUYER_ID, tie.id, &sample_details()).await?;
    let err = workflow.ready_for_dispatch(order.id).await.unwrap_err();
    assert!(matches!(
        err,
        ShopError::InvalidTransition {
            from: OrderStatus::PendingPayment,
            ..
        }
    ));

    workflow.claim_payment(order.id, BUYER_ID).await?;
    workflow.approve(order.id).await?;
    let ready = workflow.ready_for_dispatch(order.id).await?;
    assert_eq!(ready.status, OrderStatus::Confirmed);
    assert_eq!(
        store.get_order(order.id).await?.unwrap().status,
        OrderStatus::Confirmed
    );

    assert!(matches!(
        workflow.ready_for_dispatch(9999).await,
        Err(ShopError::NotFound { entity: Entity::Order, .. })
    ));
    Ok(())
}
