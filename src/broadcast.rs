//! Admin-composed announcements to buyers.

use serde::Serialize;
use tracing::{info, warn};

use crate::dialogue::BroadcastTarget;
use crate::error::{Entity, ShopError, ShopResult};
use crate::notify::{Messenger, OutboundMessage};
use crate::store::ShopRepository;

/// Per-recipient delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Send `text` to each recipient in turn. A failed delivery (for example a
/// buyer who blocked the bot) is counted and the loop moves on.
pub async fn broadcast<M: Messenger>(messenger: &M, recipients: &[i64], text: &str) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    for &chat_id in recipients {
        match messenger.send(chat_id, OutboundMessage::text(text)).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                warn!(chat_id, error = %e, "Broadcast delivery failed");
                report.failed += 1;
            }
        }
    }
    info!(
        delivered = report.delivered,
        failed = report.failed,
        "Broadcast finished"
    );
    report
}

/// Resolve `target` against known users and broadcast to them
pub async fn broadcast_to<R, M>(
    repo: &R,
    messenger: &M,
    target: BroadcastTarget,
    text: &str,
) -> ShopResult<BroadcastReport>
where
    R: ShopRepository,
    M: Messenger,
{
    let recipients: Vec<i64> = match target {
        BroadcastTarget::All => repo
            .list_users()
            .await?
            .into_iter()
            .map(|user| user.telegram_id)
            .collect(),
        BroadcastTarget::User(telegram_id) => {
            let user = repo
                .get_user(telegram_id)
                .await?
                .ok_or_else(|| ShopError::not_found(Entity::User, telegram_id))?;
            vec![user.telegram_id]
        }
    };
    Ok(broadcast(messenger, &recipients, text).await)
}
