//! Certification path store.

use crate::error::StoreResult;
use crate::models::{CertificateAuthorityRow, CertificationPathRow};
use crate::repos::CertificateRepo;
use crate::timestamp;
use keystead_core::{Certificate, CertificationPath};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Persists certification paths per (subject, issuer) and selects unexpired ones.
///
/// A path expiring exactly at `now` counts as expired. The `*_at` variants take
/// the current time explicitly; the others read the clock once per call.
pub struct CertificateStore<R: ?Sized> {
    repo: Arc<R>,
}

impl<R: ?Sized> Clone for CertificateStore<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<R: CertificateRepo + ?Sized> CertificateStore<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Save a path issued by `issuer_id`. Always inserts; paths are never deduplicated.
    pub async fn save(&self, path: &CertificationPath, issuer_id: &str) -> StoreResult<()> {
        let row = CertificationPathRow {
            path_id: Uuid::new_v4(),
            subject_id: path.subject_id().to_string(),
            issuer_id: issuer_id.to_string(),
            leaf_der: path.leaf().der().to_vec(),
            expiry_date: timestamp::encode(path.expiry_date())?,
            created_at: OffsetDateTime::now_utc(),
        };
        self.repo
            .insert_certification_path(&row, path.certificate_authorities())
            .await?;

        tracing::debug!(
            path_id = %row.path_id,
            subject_id = %row.subject_id,
            issuer_id = issuer_id,
            expiry_date = %row.expiry_date,
            authorities = path.certificate_authorities().len(),
            "Certification path saved"
        );
        Ok(())
    }

    /// The unexpired path with the latest expiry date, if any.
    pub async fn retrieve_latest(
        &self,
        subject_id: &str,
        issuer_id: &str,
    ) -> StoreResult<Option<CertificationPath>> {
        self.retrieve_latest_at(subject_id, issuer_id, OffsetDateTime::now_utc())
            .await
    }

    pub async fn retrieve_latest_at(
        &self,
        subject_id: &str,
        issuer_id: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<CertificationPath>> {
        let Some(row) = self
            .repo
            .get_latest_certification_path(subject_id, issuer_id, now)
            .await?
        else {
            tracing::debug!(subject_id, issuer_id, "No valid certification path");
            return Ok(None);
        };
        let authorities = self.repo.get_certificate_authorities(row.path_id).await?;
        Ok(Some(path_from_rows(row, authorities)?))
    }

    /// Every unexpired path for the subject and issuer, in no particular order.
    pub async fn retrieve_all(
        &self,
        subject_id: &str,
        issuer_id: &str,
    ) -> StoreResult<Vec<CertificationPath>> {
        self.retrieve_all_at(subject_id, issuer_id, OffsetDateTime::now_utc())
            .await
    }

    pub async fn retrieve_all_at(
        &self,
        subject_id: &str,
        issuer_id: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Vec<CertificationPath>> {
        let rows = self
            .repo
            .list_certification_paths(subject_id, issuer_id, now)
            .await?;

        let mut paths = Vec::with_capacity(rows.len());
        for row in rows {
            let authorities = self.repo.get_certificate_authorities(row.path_id).await?;
            paths.push(path_from_rows(row, authorities)?);
        }
        Ok(paths)
    }

    /// Delete every expired path across all subjects and issuers.
    /// Returns the number of paths deleted.
    pub async fn delete_expired(&self) -> StoreResult<u64> {
        self.delete_expired_at(OffsetDateTime::now_utc()).await
    }

    /// Delete every path expired at `now`. The same `now` applies to the whole sweep.
    pub async fn delete_expired_at(&self, now: OffsetDateTime) -> StoreResult<u64> {
        let deleted = self.repo.delete_expired_certification_paths(now).await?;
        tracing::info!(deleted = deleted, now = %now, "Expired certification paths deleted");
        Ok(deleted)
    }
}

fn path_from_rows(
    row: CertificationPathRow,
    authorities: Vec<CertificateAuthorityRow>,
) -> StoreResult<CertificationPath> {
    let expiry_date = timestamp::decode(&row.expiry_date)?;
    let leaf = Certificate::new(row.leaf_der, row.subject_id, expiry_date);
    Ok(CertificationPath::new(
        leaf,
        authorities
            .into_iter()
            .map(|authority| authority.certificate_der)
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use time::macros::datetime;

    #[test]
    fn test_path_from_rows_keeps_authority_order() {
        let path_id = Uuid::new_v4();
        let expiry = datetime!(2030-01-01 0:00:00.25 UTC);
        let row = CertificationPathRow {
            path_id,
            subject_id: "subject".to_string(),
            issuer_id: "issuer".to_string(),
            leaf_der: vec![1],
            expiry_date: timestamp::encode(expiry).unwrap(),
            created_at: expiry,
        };
        let authorities = vec![
            CertificateAuthorityRow {
                path_id,
                position: 0,
                certificate_der: vec![2],
            },
            CertificateAuthorityRow {
                path_id,
                position: 1,
                certificate_der: vec![3],
            },
        ];

        let path = path_from_rows(row, authorities).unwrap();
        assert_eq!(path.subject_id(), "subject");
        assert_eq!(path.leaf().der(), &[1]);
        assert_eq!(path.certificate_authorities(), &[vec![2], vec![3]]);
        assert_eq!(path.expiry_date(), expiry);
    }

    #[test]
    fn test_path_from_rows_rejects_malformed_expiry() {
        let row = CertificationPathRow {
            path_id: Uuid::new_v4(),
            subject_id: "subject".to_string(),
            issuer_id: "issuer".to_string(),
            leaf_der: vec![1],
            expiry_date: "next tuesday".to_string(),
            created_at: OffsetDateTime::now_utc(),
        };

        assert!(matches!(
            path_from_rows(row, Vec::new()),
            Err(StoreError::InvalidTimestamp(_))
        ));
    }
}
