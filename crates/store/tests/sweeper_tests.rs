//! Integration tests for the expiry sweeper.

mod common;

use common::{TestStore, certification_path, reference_now, run_store_test_both};
use keystead_store::{spawn_expiry_sweeper, sweep_once};
use time::{Duration, OffsetDateTime};

#[tokio::test]
async fn test_sweep_once_counts_deleted_paths() {
    run_store_test_both(|stores| async move {
        let now = reference_now();
        for (tag, offset) in [("a", -2), ("b", -1), ("c", 1)] {
            let path = certification_path("subject", now + Duration::hours(offset), tag);
            stores.certificates.save(&path, "issuer").await.unwrap();
        }

        assert_eq!(sweep_once(&stores.certificates, now).await.unwrap(), 2);
        assert_eq!(sweep_once(&stores.certificates, now).await.unwrap(), 0);

        let remaining = stores
            .certificates
            .retrieve_all_at("subject", "issuer", now)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
    })
    .await;
}

#[tokio::test]
async fn test_sweep_once_on_empty_store() {
    run_store_test_both(|stores| async move {
        assert_eq!(
            sweep_once(&stores.certificates, reference_now()).await.unwrap(),
            0
        );
    })
    .await;
}

#[tokio::test]
async fn test_background_sweeper_deletes_expired_paths() {
    let test_store = TestStore::new().await.expect("Failed to create store");
    let stores = test_store.stores();
    let now = OffsetDateTime::now_utc();

    let expired = certification_path("subject", now - Duration::hours(1), "expired");
    let valid = certification_path("subject", now + Duration::days(1), "valid");
    stores.certificates.save(&expired, "issuer").await.unwrap();
    stores.certificates.save(&valid, "issuer").await.unwrap();

    let handle = spawn_expiry_sweeper(
        stores.certificates.clone(),
        std::time::Duration::from_millis(20),
    );
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    handle.abort();

    // Query as of a time before either path expired so a survivor would show.
    let remaining = stores
        .certificates
        .retrieve_all_at("subject", "issuer", now - Duration::hours(2))
        .await
        .unwrap();
    assert_eq!(remaining, vec![valid]);
}
