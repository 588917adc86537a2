//! Certification path repository.

use crate::error::StoreResult;
use crate::models::{CertificateAuthorityRow, CertificationPathRow};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for certification paths.
///
/// A path is expired at `now` when its `expiry_date <= now`. Expired paths are
/// never returned.
#[async_trait]
pub trait CertificateRepo: Send + Sync {
    /// Insert a path and its certificate authorities (in order) atomically.
    async fn insert_certification_path(
        &self,
        path: &CertificationPathRow,
        authorities: &[Vec<u8>],
    ) -> StoreResult<()>;

    /// Get the unexpired path with the greatest expiry date for a subject and issuer.
    async fn get_latest_certification_path(
        &self,
        subject_id: &str,
        issuer_id: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<CertificationPathRow>>;

    /// List every unexpired path for a subject and issuer.
    async fn list_certification_paths(
        &self,
        subject_id: &str,
        issuer_id: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Vec<CertificationPathRow>>;

    /// Get the certificate authorities of a path, ordered by position.
    async fn get_certificate_authorities(
        &self,
        path_id: Uuid,
    ) -> StoreResult<Vec<CertificateAuthorityRow>>;

    /// Delete every path expired at `now`, across all subjects and issuers.
    /// Returns the number of paths deleted.
    async fn delete_expired_certification_paths(&self, now: OffsetDateTime) -> StoreResult<u64>;
}
