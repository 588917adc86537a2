//! Private key repository.

use crate::error::StoreResult;
use crate::models::{IdentityPrivateKeyRow, SessionPrivateKeyRow};
use async_trait::async_trait;

/// Repository for node identity keys and session private keys.
#[async_trait]
pub trait PrivateKeyRepo: Send + Sync {
    /// Create or overwrite the identity key of a node.
    async fn upsert_identity_private_key(&self, key: &IdentityPrivateKeyRow) -> StoreResult<()>;

    /// Get the identity key of a node.
    async fn get_identity_private_key(
        &self,
        node_id: &str,
    ) -> StoreResult<Option<IdentityPrivateKeyRow>>;

    /// Certificates attached to identity keys. Session keys never carry one.
    async fn list_identity_certificates(&self) -> StoreResult<Vec<Vec<u8>>>;

    /// Create a session key, or replace the key material of an existing one.
    ///
    /// The owning node and an already-set peer binding are kept on conflict, so
    /// a bound key is never rebound.
    async fn upsert_session_private_key(&self, key: &SessionPrivateKeyRow) -> StoreResult<()>;

    /// Get a session key by the hex form of its id.
    async fn get_session_private_key(
        &self,
        key_id: &str,
    ) -> StoreResult<Option<SessionPrivateKeyRow>>;
}
