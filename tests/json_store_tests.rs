mod common;

use anyhow::Result;

use common::{sample_details, sample_tie, temp_store, BUYER_ID};
use tieshop::json_store::JsonStore;
use tieshop::model::{Language, NewOrder, TieUpdate};
use tieshop::order_lifecycle::OrderStatus;
use tieshop::store::{ShopRepository, Store};

#[tokio::test]
async fn test_data_survives_reopen() -> Result<()> {
    let (dir, store) = temp_store().await;
    let tie = store.create_tie(sample_tie("Navy", 15000)).await?;
    store
        .get_or_create_user(BUYER_ID, Some("Aigerim"), Language::Kz)
        .await?;
    let order = store
        .create_order(NewOrder::snapshot(BUYER_ID, &tie, &sample_details()))
        .await?;
    drop(store);

    let reopened = JsonStore::open(dir.path().join("shop.json")).await?;
    let user = reopened.get_user(BUYER_ID).await?.unwrap();
    assert_eq!(user.language, Language::Kz);
    assert_eq!(user.display_name.as_deref(), Some("Aigerim"));
    assert_eq!(reopened.get_tie(tie.id).await?.unwrap().price, 15000);
    let stored = reopened.get_order(order.id).await?.unwrap();
    assert_eq!(stored.status, OrderStatus::PendingPayment);

    // Ids keep counting after a reopen
    let second = reopened.create_tie(sample_tie("Red", 9000)).await?;
    assert!(second.id > tie.id);
    Ok(())
}

#[tokio::test]
async fn test_blank_file_opens_as_empty_store() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("blank.json");
    std::fs::write(&path, "  \n")?;

    let store = JsonStore::open(&path).await?;
    assert_eq!(store.count_ties().await?, 0);
    assert!(store.list_users().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_file_is_an_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json")?;

    assert!(JsonStore::open(&path).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_sparse_update_and_visibility() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let tie = store.create_tie(sample_tie("Plain", 7000)).await?;
    assert!(tie.is_active);

    let update = TieUpdate {
        color_en: Some("Emerald".to_string()),
        ..Default::default()
    };
    let updated = store.update_tie(tie.id, &update).await?.unwrap();
    assert_eq!(updated.color_en, "Emerald");
    assert_eq!(updated.color_ru, tie.color_ru);
    assert_eq!(updated.price, 7000);
    assert!(store.update_tie(404, &update).await?.is_none());

    store.set_tie_active(tie.id, false).await?;
    assert!(store.list_active_ties().await?.is_empty());
    assert_eq!(store.list_all_ties().await?.len(), 1);
    assert!(!store.get_tie(tie.id).await?.unwrap().is_active);
    Ok(())
}

#[tokio::test]
async fn test_orders_are_listed_newest_first() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let tie = store.create_tie(sample_tie("Stripe", 10000)).await?;
    let first = store
        .create_order(NewOrder::snapshot(BUYER_ID, &tie, &sample_details()))
        .await?;
    let second = store
        .create_order(NewOrder::snapshot(BUYER_ID, &tie, &sample_details()))
        .await?;
    store
        .create_order(NewOrder::snapshot(BUYER_ID + 1, &tie, &sample_details()))
        .await?;

    let mine = store.list_user_orders(BUYER_ID).await?;
    assert_eq!(
        mine.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );
    assert_eq!(store.list_orders().await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_purge_keeps_catalog() -> Result<()> {
    let (_dir, store) = temp_store().await;
    let store = Store::Json(store);
    let tie = store.create_tie(sample_tie("Keep me", 10000)).await?;
    store.get_or_create_user(BUYER_ID, None, Language::Ru).await?;
    store
        .create_order(NewOrder::snapshot(BUYER_ID, &tie, &sample_details()))
        .await?;

    let summary = store.purge_orders_and_users().await?;
    assert_eq!(summary.orders, 1);
    assert_eq!(summary.users, 1);
    assert!(store.list_orders().await?.is_empty());
    assert!(store.list_users().await?.is_empty());
    assert_eq!(store.count_ties().await?, 1);
    assert_eq!(store.backend_name(), "json");
    Ok(())
}

#[tokio::test]
async fn test_language_change_for_unknown_user() -> Result<()> {
    let (_dir, store) = temp_store().await;
    assert!(store.set_user_language(1, Language::En).await?.is_none());

    store.get_or_create_user(1, None, Language::Ru).await?;
    let user = store.set_user_language(1, Language::En).await?.unwrap();
    assert_eq!(user.language, Language::En);

    // Registering again keeps the chosen language
    let again = store.get_or_create_user(1, None, Language::Ru).await?;
    assert_eq!(again.language, Language::En);
    Ok(())
}

#[tokio::test]
async fn test_failed_write_leaves_store_unchanged() -> Result<()> {
    let (dir, store) = temp_store().await;
    let tie = store.create_tie(sample_tie("Navy", 15000)).await?;
    store
        .get_or_create_user(BUYER_ID, Some("Aigerim"), Language::Ru)
        .await?;
    std::fs::remove_dir_all(dir.path())?;

    let update = TieUpdate {
        price: Some(99999),
        ..Default::default()
    };
    assert!(store.update_tie(tie.id, &update).await.is_err());
    assert_eq!(store.get_tie(tie.id).await?.unwrap().price, 15000);

    assert!(store.set_tie_active(tie.id, false).await.is_err());
    assert!(store.get_tie(tie.id).await?.unwrap().is_active);

    assert!(store.create_tie(sample_tie("Red", 9000)).await.is_err());
    assert_eq!(store.count_ties().await?, 1);

    assert!(store.set_user_language(BUYER_ID, Language::En).await.is_err());
    assert_eq!(store.get_user(BUYER_ID).await?.unwrap().language, Language::Ru);

    let order = NewOrder::snapshot(BUYER_ID, &tie, &sample_details());
    assert!(store.create_order(order).await.is_err());
    assert!(store.list_orders().await?.is_empty());

    assert!(store.purge_orders_and_users().await.is_err());
    assert_eq!(store.list_users().await?.len(), 1);

    // Once the directory is back only real changes reach the file
    std::fs::create_dir_all(dir.path())?;
    let second = store.create_tie(sample_tie("Red", 9000)).await?;
    assert_eq!(second.id, tie.id + 1);
    let reopened = JsonStore::open(dir.path().join("shop.json")).await?;
    assert_eq!(reopened.get_tie(tie.id).await?.unwrap().price, 15000);
    assert_eq!(reopened.count_ties().await?, 2);
    assert!(reopened.list_orders().await?.is_empty());
    Ok(())
}
