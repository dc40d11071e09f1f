//! # Order Workflow
//!
//! Places orders and moves them through the lifecycle on behalf of buyers
//! and admins. Every status change follows the same path:
//!
//! 1. look the order up (not found is reported, nothing changes)
//! 2. check that the caller may act on it
//! 3. check the transition table
//! 4. compare-and-set the status in the store
//! 5. notify the other party
//!
//! Notification failures are logged and never undo or block the change.

use tracing::{info, warn};

use crate::callbacks::CallbackData;
use crate::checkout::CheckoutDetails;
use crate::config::AdminList;
use crate::error::{Entity, Field, ShopError, ShopResult, ValidationError, ValidationIssue};
use crate::localization::{t_args_lang, t_lang};
use crate::model::{format_price, Language, NewOrder, Order};
use crate::notify::{notify_admins, notify_user, Button, Messenger, OutboundMessage};
use crate::order_lifecycle::{parse_delivery_days, Actor, OrderAction, TransitionError};
use crate::store::{ShopRepository, StatusChange, TransitionOutcome};

/// Who is asking for a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Admin,
    Buyer(i64),
}

impl Principal {
    /// Resolve a Telegram user to admin or buyer
    pub fn from_telegram(telegram_id: i64, admins: &AdminList) -> Self {
        if admins.contains(telegram_id) {
            Principal::Admin
        } else {
            Principal::Buyer(telegram_id)
        }
    }
}

pub struct OrderWorkflow<'a, R, M> {
    repo: &'a R,
    messenger: &'a M,
    admins: &'a AdminList,
    admin_language: Language,
}

impl<'a, R: ShopRepository, M: Messenger> OrderWorkflow<'a, R, M> {
    pub fn new(repo: &'a R, messenger: &'a M, admins: &'a AdminList, admin_language: Language) -> Self {
        Self {
            repo,
            messenger,
            admins,
            admin_language,
        }
    }

    /// Create a `pending_payment` order for an active tie, snapshotting its
    /// name and price
    pub async fn place_order(
        &self,
        buyer_id: i64,
        tie_id: i64,
        details: &CheckoutDetails,
    ) -> ShopResult<Order> {
        let tie = self
            .repo
            .get_tie(tie_id)
            .await?
            .filter(|tie| tie.is_active)
            .ok_or_else(|| ShopError::not_found(Entity::Tie, tie_id))?;
        self.repo
            .get_or_create_user(buyer_id, None, Language::default())
            .await?;

        let order = self
            .repo
            .create_order(NewOrder::snapshot(buyer_id, &tie, details))
            .await?;
        info!(order_id = order.id, buyer_id, tie_id, price = order.price, "Order placed");

        let lang = self.admin_language;
        let text = t_args_lang(
            "admin-new-order",
            &[
                ("id", &order.id.to_string()),
                ("tie", &order.tie_name),
                ("price", &format_price(order.price)),
                ("name", &order.recipient_full_name()),
                ("phone", &order.recipient_phone),
                ("address", &order.delivery_address),
                ("buyer", &buyer_id.to_string()),
            ],
            lang,
        );
        notify_admins(self.messenger, self.admins, OutboundMessage::text(text)).await;
        Ok(order)
    }

    /// Buyer reports the payment; admins get approve / reject buttons
    pub async fn claim_payment(&self, order_id: i64, buyer_id: i64) -> ShopResult<Order> {
        let order = self
            .transition(order_id, OrderAction::ClaimPayment, Principal::Buyer(buyer_id))
            .await?;

        let lang = self.admin_language;
        let text = t_args_lang(
            "admin-payment-claimed",
            &[
                ("id", &order.id.to_string()),
                ("tie", &order.tie_name),
                ("price", &format_price(order.price)),
                ("name", &order.recipient_full_name()),
                ("phone", &order.recipient_phone),
                ("address", &order.delivery_address),
            ],
            lang,
        );
        let message = OutboundMessage::text(text).with_row(vec![
            Button::callback(
                t_lang("admin-btn-approve", lang),
                CallbackData::Approve { order_id }.to_string(),
            ),
            Button::callback(
                t_lang("admin-btn-reject", lang),
                CallbackData::Reject { order_id }.to_string(),
            ),
        ]);
        notify_admins(self.messenger, self.admins, message).await;
        Ok(order)
    }

    pub async fn approve(&self, order_id: i64) -> ShopResult<Order> {
        let order = self
            .transition(order_id, OrderAction::Approve, Principal::Admin)
            .await?;
        self.notify_buyer(&order, "buyer-order-approved", &[], None).await;
        Ok(order)
    }

    pub async fn reject(&self, order_id: i64) -> ShopResult<Order> {
        let order = self
            .transition(order_id, OrderAction::Reject, Principal::Admin)
            .await?;
        self.notify_buyer(&order, "buyer-order-rejected", &[], None).await;
        Ok(order)
    }

    /// Parse an admin-typed delivery estimate, then dispatch. Malformed input
    /// fails before the order is read or changed.
    pub async fn dispatch_from_input(&self, order_id: i64, input: &str) -> ShopResult<Order> {
        let days = parse_delivery_days(input)?;
        self.dispatch(order_id, days).await
    }

    /// Check that the order is waiting for dispatch before asking the admin
    /// for a delivery estimate. Nothing is changed.
    pub async fn ready_for_dispatch(&self, order_id: i64) -> ShopResult<Order> {
        let order = self
            .repo
            .get_order(order_id)
            .await?
            .ok_or_else(|| ShopError::not_found(Entity::Order, order_id))?;
        let action = OrderAction::Dispatch { days: 1 };
        order
            .status
            .apply(action, Actor::Admin)
            .map_err(|_| ShopError::InvalidTransition {
                order_id,
                from: order.status,
                action: action.name(),
            })?;
        Ok(order)
    }

    pub async fn dispatch(&self, order_id: i64, days: u32) -> ShopResult<Order> {
        if days == 0 {
            return Err(ValidationError::new(Field::DeliveryDays, ValidationIssue::NotPositive).into());
        }
        let order = self
            .transition(order_id, OrderAction::Dispatch { days }, Principal::Admin)
            .await?;
        self.notify_buyer(
            &order,
            "buyer-order-dispatched",
            &[("days", &days.to_string())],
            None,
        )
        .await;
        Ok(order)
    }

    /// Mark as delivered; the buyer gets a button to confirm receipt
    pub async fn mark_delivered(&self, order_id: i64) -> ShopResult<Order> {
        let order = self
            .transition(order_id, OrderAction::MarkDelivered, Principal::Admin)
            .await?;
        self.notify_buyer(
            &order,
            "buyer-order-delivered",
            &[],
            Some((
                "btn-confirm-receipt",
                CallbackData::Received { order_id }.to_string(),
            )),
        )
        .await;
        Ok(order)
    }

    pub async fn confirm_receipt(&self, order_id: i64, buyer_id: i64) -> ShopResult<Order> {
        let order = self
            .transition(order_id, OrderAction::ConfirmReceipt, Principal::Buyer(buyer_id))
            .await?;
        self.notify_admins_about(&order, "admin-order-completed").await;
        Ok(order)
    }

    /// Buyer abandons an order that is still waiting for payment
    pub async fn cancel(&self, order_id: i64, buyer_id: i64) -> ShopResult<Order> {
        let order = self
            .transition(order_id, OrderAction::Cancel, Principal::Buyer(buyer_id))
            .await?;
        self.notify_admins_about(&order, "admin-order-cancelled").await;
        Ok(order)
    }

    async fn transition(
        &self,
        order_id: i64,
        action: OrderAction,
        principal: Principal,
    ) -> ShopResult<Order> {
        let order = self
            .repo
            .get_order(order_id)
            .await?
            .ok_or_else(|| ShopError::not_found(Entity::Order, order_id))?;

        let actor = match principal {
            Principal::Admin => Actor::Admin,
            Principal::Buyer(buyer_id) if buyer_id == order.buyer_id => Actor::Buyer,
            Principal::Buyer(buyer_id) => {
                warn!(order_id, buyer_id, "Buyer tried to act on someone else's order");
                return Err(ShopError::Unauthorized);
            }
        };

        let next = order.status.apply(action, actor).map_err(|e| match e {
            TransitionError::WrongActor { .. } => ShopError::Unauthorized,
            TransitionError::NotAllowed { from } => ShopError::InvalidTransition {
                order_id,
                from,
                action: action.name(),
            },
        })?;

        let mut change = StatusChange::new(order.status, next);
        if let OrderAction::Dispatch { days } = action {
            let days = i32::try_from(days).map_err(|_| {
                ValidationError::new(Field::DeliveryDays, ValidationIssue::NotANumber)
            })?;
            change = change.with_delivery_days(days);
        }

        match self.repo.transition_order(order_id, change).await? {
            TransitionOutcome::Applied(updated) => {
                info!(
                    order_id,
                    from = %order.status,
                    to = %updated.status,
                    action = action.name(),
                    "Order status changed"
                );
                Ok(updated)
            }
            TransitionOutcome::NotFound => Err(ShopError::not_found(Entity::Order, order_id)),
            TransitionOutcome::Conflict { actual } => {
                warn!(order_id, expected = %order.status, %actual, "Order status changed concurrently");
                Err(ShopError::Conflict {
                    order_id,
                    expected: order.status,
                    actual,
                })
            }
        }
    }

    async fn notify_buyer(
        &self,
        order: &Order,
        key: &str,
        extra_args: &[(&str, &str)],
        button: Option<(&str, String)>,
    ) {
        let lang = match self.repo.get_user(order.buyer_id).await {
            Ok(Some(user)) => user.language,
            Ok(None) => Language::default(),
            Err(e) => {
                warn!(buyer_id = order.buyer_id, error = %e, "Could not load buyer language");
                Language::default()
            }
        };

        let id = order.id.to_string();
        let mut args: Vec<(&str, &str)> = vec![("id", id.as_str()), ("tie", order.tie_name.as_str())];
        args.extend_from_slice(extra_args);

        let mut message = OutboundMessage::text(t_args_lang(key, &args, lang));
        if let Some((label_key, data)) = button {
            message = message.with_row(vec![Button::callback(t_lang(label_key, lang), data)]);
        }
        notify_user(self.messenger, order.buyer_id, message).await;
    }

    async fn notify_admins_about(&self, order: &Order, key: &str) {
        let text = t_args_lang(
            key,
            &[
                ("id", &order.id.to_string()),
                ("tie", &order.tie_name),
                ("name", &order.recipient_full_name()),
            ],
            self.admin_language,
        );
        notify_admins(self.messenger, self.admins, OutboundMessage::text(text)).await;
    }
}
