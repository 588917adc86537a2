//! Database models mapping to the store schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Certification paths
// =============================================================================

/// Certification path record. One row per saved path; never updated.
#[derive(Debug, Clone, FromRow)]
pub struct CertificationPathRow {
    pub path_id: Uuid,
    pub subject_id: String,
    pub issuer_id: String,
    pub leaf_der: Vec<u8>,
    /// Expiry of the leaf certificate, as fixed-width UTC text.
    pub expiry_date: String,
    pub created_at: OffsetDateTime,
}

/// Certificate authority in a certification path, ordered by position.
#[derive(Debug, Clone, FromRow)]
pub struct CertificateAuthorityRow {
    pub path_id: Uuid,
    pub position: i32,
    pub certificate_der: Vec<u8>,
}

// =============================================================================
// Private keys
// =============================================================================

/// Node identity private key, keyed by node id.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityPrivateKeyRow {
    pub node_id: String,
    pub der_serialization: Vec<u8>,
    pub certificate_der: Option<Vec<u8>>,
    pub creation_date: OffsetDateTime,
}

/// Session private key, keyed by the hex form of its key id.
/// A NULL `peer_id` means the key is not bound yet.
#[derive(Debug, Clone, FromRow)]
pub struct SessionPrivateKeyRow {
    pub key_id: String,
    pub node_id: String,
    pub peer_id: Option<String>,
    pub der_serialization: Vec<u8>,
    pub creation_date: OffsetDateTime,
}

// =============================================================================
// Peer public keys
// =============================================================================

/// Peer identity public key.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityPublicKeyRow {
    pub peer_id: String,
    pub der_serialization: Vec<u8>,
}

/// Last session public key announced by a peer.
#[derive(Debug, Clone, FromRow)]
pub struct SessionPublicKeyRow {
    pub peer_id: String,
    pub key_id: Vec<u8>,
    pub der_serialization: Vec<u8>,
    /// Fixed-width UTC text.
    pub creation_date: String,
}
