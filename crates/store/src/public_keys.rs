//! Peer public key store.

use crate::error::StoreResult;
use crate::models::{IdentityPublicKeyRow, SessionPublicKeyRow};
use crate::repos::PublicKeyRepo;
use crate::timestamp;
use keystead_core::{SessionKeyId, SessionPublicKey};
use std::sync::Arc;

/// Persists peers' identity public keys and their latest session public key.
///
/// Both are last-write-wins per peer id. A session key announcement replaces
/// the stored one even if its creation date is older.
pub struct PublicKeyStore<R: ?Sized> {
    repo: Arc<R>,
}

impl<R: ?Sized> Clone for PublicKeyStore<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<R: PublicKeyRepo + ?Sized> PublicKeyStore<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Create or overwrite the identity public key of `peer_id`.
    pub async fn save_identity_key(&self, peer_id: &str, public_key_der: &[u8]) -> StoreResult<()> {
        let row = IdentityPublicKeyRow {
            peer_id: peer_id.to_string(),
            der_serialization: public_key_der.to_vec(),
        };
        self.repo.upsert_identity_public_key(&row).await?;
        tracing::debug!(peer_id, "Peer identity public key saved");
        Ok(())
    }

    pub async fn retrieve_identity_key(&self, peer_id: &str) -> StoreResult<Option<Vec<u8>>> {
        let row = self.repo.get_identity_public_key(peer_id).await?;
        Ok(row.map(|row| row.der_serialization))
    }

    /// Replace the session public key of `peer_id` (id, key and creation date).
    pub async fn save_session_key(
        &self,
        session_key: &SessionPublicKey,
        peer_id: &str,
    ) -> StoreResult<()> {
        let row = SessionPublicKeyRow {
            peer_id: peer_id.to_string(),
            key_id: session_key.key_id.as_bytes().to_vec(),
            der_serialization: session_key.public_key_der.clone(),
            creation_date: timestamp::encode(session_key.creation_date)?,
        };
        self.repo.upsert_session_public_key(&row).await?;
        tracing::debug!(
            peer_id,
            key_id = %session_key.key_id,
            creation_date = %session_key.creation_date,
            "Peer session public key saved"
        );
        Ok(())
    }

    /// The last session public key saved for `peer_id`.
    pub async fn retrieve_last_session_key(
        &self,
        peer_id: &str,
    ) -> StoreResult<Option<SessionPublicKey>> {
        let Some(row) = self.repo.get_session_public_key(peer_id).await? else {
            return Ok(None);
        };
        Ok(Some(SessionPublicKey {
            key_id: SessionKeyId::new(row.key_id),
            public_key_der: row.der_serialization,
            creation_date: timestamp::decode(&row.creation_date)?,
        }))
    }
}
