mod common;

use anyhow::Result;

use common::{temp_store, RecordingMessenger};
use tieshop::broadcast::{broadcast, broadcast_to};
use tieshop::dialogue::BroadcastTarget;
use tieshop::error::ShopError;
use tieshop::model::Language;
use tieshop::store::ShopRepository;

#[tokio::test]
async fn test_broadcast_counts_failures_and_continues() {
    let messenger = RecordingMessenger::failing_for([3]);
    let recipients = [1, 2, 3, 4, 5];

    let report = broadcast(&messenger, &recipients, "New collection is in!").await;

    assert_eq!(report.delivered, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(report.total(), 5);
    let reached: Vec<i64> = messenger.sent().iter().map(|(id, _)| *id).collect();
    assert_eq!(reached, vec![1, 2, 4, 5]);
}

#[tokio::test]
async fn test_broadcast_to_all_known_users() -> Result<()> {
    let (_dir, store) = temp_store().await;
    for id in [10, 20, 30] {
        store.get_or_create_user(id, None, Language::Ru).await?;
    }
    let messenger = RecordingMessenger::new();

    let report = broadcast_to(&store, &messenger, BroadcastTarget::All, "Sale today").await?;

    assert_eq!(report.delivered, 3);
    assert!(messenger.sent().iter().all(|(_, m)| m.text == "Sale today"));
    Ok(())
}

#[tokio::test]
async fn test_broadcast_to_single_user() -> Result<()> {
    let (_dir, store) = temp_store().await;
    store.get_or_create_user(10, None, Language::Ru).await?;
    store.get_or_create_user(20, None, Language::Ru).await?;
    let messenger = RecordingMessenger::new();

    let report = broadcast_to(&store, &messenger, BroadcastTarget::User(20), "Hi").await?;
    assert_eq!(report.delivered, 1);
    assert_eq!(messenger.sent_to(20).len(), 1);
    assert!(messenger.sent_to(10).is_empty());

    let err = broadcast_to(&store, &messenger, BroadcastTarget::User(99), "Hi")
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::NotFound { id: 99, .. }));
    Ok(())
}
