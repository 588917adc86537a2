//! Private key store.

use crate::error::{StoreResult, UnknownKeyError};
use crate::models::{IdentityPrivateKeyRow, SessionPrivateKeyRow};
use crate::repos::PrivateKeyRepo;
use keystead_core::{GeneratedKeyPair, KeyPairGenerator, PrivateKeyRecord, SessionKeyId};
use std::sync::Arc;
use time::OffsetDateTime;

impl From<IdentityPrivateKeyRow> for PrivateKeyRecord {
    fn from(row: IdentityPrivateKeyRow) -> Self {
        PrivateKeyRecord::Identity {
            node_id: row.node_id,
            key_der: row.der_serialization,
            certificate_der: row.certificate_der,
        }
    }
}

impl TryFrom<SessionPrivateKeyRow> for PrivateKeyRecord {
    type Error = keystead_core::Error;

    fn try_from(row: SessionPrivateKeyRow) -> Result<Self, Self::Error> {
        let key_id = SessionKeyId::from_hex(&row.key_id)?;
        Ok(match row.peer_id {
            Some(peer_id) => PrivateKeyRecord::BoundSession {
                key_id,
                node_id: row.node_id,
                peer_id,
                key_der: row.der_serialization,
            },
            None => PrivateKeyRecord::UnboundSession {
                key_id,
                node_id: row.node_id,
                key_der: row.der_serialization,
            },
        })
    }
}

/// Persists node identity keys and session private keys, enforcing ownership
/// and peer binding on retrieval.
pub struct PrivateKeyStore<R: ?Sized> {
    repo: Arc<R>,
}

impl<R: ?Sized> Clone for PrivateKeyStore<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<R: PrivateKeyRepo + ?Sized> PrivateKeyStore<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Generate an identity key pair with `generator` and store its private half
    /// under the derived node id.
    pub async fn generate_identity_key_pair(
        &self,
        generator: &dyn KeyPairGenerator,
    ) -> StoreResult<GeneratedKeyPair> {
        let key_pair = generator.generate_identity_key_pair()?;
        self.save_identity_key(
            &key_pair.node_id,
            &key_pair.private_key_der,
            key_pair.certificate_der.as_deref(),
        )
        .await?;
        Ok(key_pair)
    }

    /// Create or overwrite the identity key of `node_id`.
    pub async fn save_identity_key(
        &self,
        node_id: &str,
        key_der: &[u8],
        certificate_der: Option<&[u8]>,
    ) -> StoreResult<()> {
        let row = IdentityPrivateKeyRow {
            node_id: node_id.to_string(),
            der_serialization: key_der.to_vec(),
            certificate_der: certificate_der.map(<[u8]>::to_vec),
            creation_date: OffsetDateTime::now_utc(),
        };
        self.repo.upsert_identity_private_key(&row).await?;
        tracing::debug!(node_id, "Identity private key saved");
        Ok(())
    }

    /// The identity key of `node_id`, as a [`PrivateKeyRecord::Identity`].
    pub async fn retrieve_identity_key(
        &self,
        node_id: &str,
    ) -> StoreResult<Option<PrivateKeyRecord>> {
        let row = self.repo.get_identity_private_key(node_id).await?;
        Ok(row.map(PrivateKeyRecord::from))
    }

    /// Save a session key owned by `node_id`. With a `peer_id` the key is bound
    /// to that peer for good; without one it stays available to any peer.
    ///
    /// Saving an existing key id replaces the key material only: the owner and
    /// any existing binding are kept.
    pub async fn save_session_key(
        &self,
        key_der: &[u8],
        key_id: &SessionKeyId,
        node_id: &str,
        peer_id: Option<&str>,
    ) -> StoreResult<()> {
        let row = SessionPrivateKeyRow {
            key_id: key_id.to_hex(),
            node_id: node_id.to_string(),
            peer_id: peer_id.map(str::to_string),
            der_serialization: key_der.to_vec(),
            creation_date: OffsetDateTime::now_utc(),
        };
        self.repo.upsert_session_private_key(&row).await?;
        tracing::debug!(key_id = %key_id, node_id, peer_id = ?peer_id, "Session private key saved");
        Ok(())
    }

    /// Save any kind of private key record.
    pub async fn save(&self, record: &PrivateKeyRecord) -> StoreResult<()> {
        match record {
            PrivateKeyRecord::Identity {
                node_id,
                key_der,
                certificate_der,
            } => {
                self.save_identity_key(node_id, key_der, certificate_der.as_deref())
                    .await
            }
            PrivateKeyRecord::UnboundSession {
                key_id,
                node_id,
                key_der,
            } => self.save_session_key(key_der, key_id, node_id, None).await,
            PrivateKeyRecord::BoundSession {
                key_id,
                node_id,
                peer_id,
                key_der,
            } => {
                self.save_session_key(key_der, key_id, node_id, Some(peer_id))
                    .await
            }
        }
    }

    /// Look up a session key as a record, without ownership or binding checks.
    pub async fn retrieve_session_key_record(
        &self,
        key_id: &SessionKeyId,
    ) -> StoreResult<Option<PrivateKeyRecord>> {
        match self.repo.get_session_private_key(&key_id.to_hex()).await? {
            Some(row) => Ok(Some(PrivateKeyRecord::try_from(row)?)),
            None => Ok(None),
        }
    }

    /// Retrieve a session key owned by `node_id`, whatever its binding.
    pub async fn retrieve_unbound_session_key(
        &self,
        key_id: &SessionKeyId,
        node_id: &str,
    ) -> StoreResult<Vec<u8>> {
        let row = self.fetch_owned_session_key(key_id, node_id).await?;
        Ok(row.der_serialization)
    }

    /// Retrieve a session key owned by `node_id` for use with `peer_id`.
    ///
    /// Fails if the key is bound to a different peer. An unbound key is
    /// returned for any peer.
    pub async fn retrieve_session_key(
        &self,
        key_id: &SessionKeyId,
        node_id: &str,
        peer_id: &str,
    ) -> StoreResult<Vec<u8>> {
        let row = self.fetch_owned_session_key(key_id, node_id).await?;

        if let Some(bound_peer_id) = row.peer_id
            && bound_peer_id != peer_id
        {
            tracing::warn!(
                key_id = %key_id,
                expected_peer_id = peer_id,
                actual_peer_id = %bound_peer_id,
                "Session key is bound to another peer"
            );
            return Err(UnknownKeyError::BoundToAnotherPeer {
                key_id: key_id.to_hex(),
                expected_peer_id: peer_id.to_string(),
                actual_peer_id: bound_peer_id,
            }
            .into());
        }

        Ok(row.der_serialization)
    }

    /// Certificates attached to identity keys. Session keys are never included.
    pub async fn fetch_node_certificates(&self) -> StoreResult<Vec<Vec<u8>>> {
        self.repo.list_identity_certificates().await
    }

    async fn fetch_owned_session_key(
        &self,
        key_id: &SessionKeyId,
        node_id: &str,
    ) -> StoreResult<SessionPrivateKeyRow> {
        let key_id_hex = key_id.to_hex();
        let Some(row) = self.repo.get_session_private_key(&key_id_hex).await? else {
            return Err(UnknownKeyError::NotFound { key_id: key_id_hex }.into());
        };

        if row.node_id != node_id {
            tracing::warn!(
                key_id = %key_id,
                expected_node_id = node_id,
                actual_node_id = %row.node_id,
                "Session key is owned by a different node"
            );
            return Err(UnknownKeyError::OwnedByAnotherNode {
                key_id: key_id_hex,
                expected_node_id: node_id.to_string(),
                actual_node_id: row.node_id,
            }
            .into());
        }

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn session_row(peer_id: Option<&str>) -> SessionPrivateKeyRow {
        SessionPrivateKeyRow {
            key_id: "0a0b".to_string(),
            node_id: "node".to_string(),
            peer_id: peer_id.map(str::to_string),
            der_serialization: vec![7, 7],
            creation_date: datetime!(2030-01-01 0:00 UTC),
        }
    }

    #[test]
    fn test_session_row_without_peer_is_unbound() {
        let record = PrivateKeyRecord::try_from(session_row(None)).unwrap();
        assert_eq!(
            record,
            PrivateKeyRecord::UnboundSession {
                key_id: SessionKeyId::new(vec![0x0a, 0x0b]),
                node_id: "node".to_string(),
                key_der: vec![7, 7],
            }
        );
    }

    #[test]
    fn test_session_row_with_peer_is_bound() {
        let record = PrivateKeyRecord::try_from(session_row(Some("peer"))).unwrap();
        assert_eq!(record.peer_id(), Some("peer"));
        assert!(matches!(record, PrivateKeyRecord::BoundSession { .. }));
    }

    #[test]
    fn test_session_row_with_corrupt_key_id_is_rejected() {
        let mut row = session_row(None);
        row.key_id = "zz".to_string();
        assert!(PrivateKeyRecord::try_from(row).is_err());
    }

    #[test]
    fn test_identity_row_keeps_certificate() {
        let row = IdentityPrivateKeyRow {
            node_id: "node".to_string(),
            der_serialization: vec![1],
            certificate_der: Some(vec![2]),
            creation_date: datetime!(2030-01-01 0:00 UTC),
        };
        match PrivateKeyRecord::from(row) {
            PrivateKeyRecord::Identity {
                certificate_der, ..
            } => assert_eq!(certificate_der, Some(vec![2])),
            other => panic!("expected identity key, got {other:?}"),
        }
    }
}
