//! Peer public key repository.

use crate::error::StoreResult;
use crate::models::{IdentityPublicKeyRow, SessionPublicKeyRow};
use async_trait::async_trait;

/// Repository for peers' identity and session public keys. One row per peer in each table.
#[async_trait]
pub trait PublicKeyRepo: Send + Sync {
    /// Create or overwrite a peer's identity public key.
    async fn upsert_identity_public_key(&self, key: &IdentityPublicKeyRow) -> StoreResult<()>;

    async fn get_identity_public_key(
        &self,
        peer_id: &str,
    ) -> StoreResult<Option<IdentityPublicKeyRow>>;

    /// Replace a peer's session public key unconditionally (last write wins).
    async fn upsert_session_public_key(&self, key: &SessionPublicKeyRow) -> StoreResult<()>;

    async fn get_session_public_key(
        &self,
        peer_id: &str,
    ) -> StoreResult<Option<SessionPublicKeyRow>>;
}
