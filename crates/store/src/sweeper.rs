//! Periodic deletion of expired certification paths.

use crate::certificates::CertificateStore;
use crate::error::StoreResult;
use crate::repos::CertificateRepo;
use std::time::Duration;
use time::OffsetDateTime;

/// Run one sweep with a single `now` snapshot. Returns the number of paths deleted.
pub async fn sweep_once<R>(store: &CertificateStore<R>, now: OffsetDateTime) -> StoreResult<u64>
where
    R: CertificateRepo + ?Sized,
{
    store.delete_expired_at(now).await
}

/// Spawn a task deleting expired certification paths every `interval`.
///
/// Failures are logged and the next tick tries again.
pub fn spawn_expiry_sweeper<R>(
    store: CertificateStore<R>,
    interval: Duration,
) -> tokio::task::JoinHandle<()>
where
    R: CertificateRepo + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = sweep_once(&store, OffsetDateTime::now_utc()).await {
                tracing::error!(error = %e, "Expired certification path sweep failed");
            }
        }
    })
}
