//! Private and public key records.

use std::fmt;
use time::OffsetDateTime;

/// Content-derived identifier of a session key.
///
/// Persisted as lowercase hex.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionKeyId(Vec<u8>);

impl SessionKeyId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse from the hex form used as the row key.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        hex::decode(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidKeyId(format!("{s:?}: {e}")))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SessionKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKeyId({})", self.to_hex())
    }
}

impl fmt::Display for SessionKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<&[u8]> for SessionKeyId {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// A stored private key.
///
/// Only identity keys may carry a certificate, and a bound session key always
/// names exactly one peer.
#[derive(Clone, PartialEq, Eq)]
pub enum PrivateKeyRecord {
    /// Long-lived key identifying the node itself.
    Identity {
        node_id: String,
        key_der: Vec<u8>,
        certificate_der: Option<Vec<u8>>,
    },
    /// Session key not yet tied to a peer (e.g. an initial handshake key).
    UnboundSession {
        key_id: SessionKeyId,
        node_id: String,
        key_der: Vec<u8>,
    },
    /// Session key usable with one peer only.
    BoundSession {
        key_id: SessionKeyId,
        node_id: String,
        peer_id: String,
        key_der: Vec<u8>,
    },
}

impl PrivateKeyRecord {
    /// Id of the node owning the key.
    pub fn node_id(&self) -> &str {
        match self {
            Self::Identity { node_id, .. }
            | Self::UnboundSession { node_id, .. }
            | Self::BoundSession { node_id, .. } => node_id,
        }
    }

    pub fn key_der(&self) -> &[u8] {
        match self {
            Self::Identity { key_der, .. }
            | Self::UnboundSession { key_der, .. }
            | Self::BoundSession { key_der, .. } => key_der,
        }
    }

    /// Peer the key is bound to, if any.
    pub fn peer_id(&self) -> Option<&str> {
        match self {
            Self::BoundSession { peer_id, .. } => Some(peer_id),
            _ => None,
        }
    }
}

// Key material stays out of logs.
impl fmt::Debug for PrivateKeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity {
                node_id,
                certificate_der,
                ..
            } => f
                .debug_struct("Identity")
                .field("node_id", node_id)
                .field("has_certificate", &certificate_der.is_some())
                .finish_non_exhaustive(),
            Self::UnboundSession {
                key_id, node_id, ..
            } => f
                .debug_struct("UnboundSession")
                .field("key_id", key_id)
                .field("node_id", node_id)
                .finish_non_exhaustive(),
            Self::BoundSession {
                key_id,
                node_id,
                peer_id,
                ..
            } => f
                .debug_struct("BoundSession")
                .field("key_id", key_id)
                .field("node_id", node_id)
                .field("peer_id", peer_id)
                .finish_non_exhaustive(),
        }
    }
}

/// The most recent session public key announced by a peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionPublicKey {
    pub key_id: SessionKeyId,
    pub public_key_der: Vec<u8>,
    pub creation_date: OffsetDateTime,
}

/// Output of a [`KeyPairGenerator`].
#[derive(Clone)]
pub struct GeneratedKeyPair {
    /// Id derived from the public key.
    pub node_id: String,
    pub private_key_der: Vec<u8>,
    pub public_key_der: Vec<u8>,
    pub certificate_der: Option<Vec<u8>>,
}

impl fmt::Debug for GeneratedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedKeyPair")
            .field("node_id", &self.node_id)
            .field("has_certificate", &self.certificate_der.is_some())
            .finish_non_exhaustive()
    }
}

/// Generates identity key pairs and derives their node ids.
///
/// Implemented by the crypto layer; the stores only persist what it returns.
pub trait KeyPairGenerator: Send + Sync {
    fn generate_identity_key_pair(&self) -> crate::Result<GeneratedKeyPair>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_id_hex_roundtrip() {
        let id = SessionKeyId::new(b"subsequent key id".to_vec());
        let hex = id.to_hex();
        assert_eq!(hex, "73756273657175656e74206b6579206964");
        assert_eq!(SessionKeyId::from_hex(&hex).unwrap(), id);
    }

    #[test]
    fn test_session_key_id_rejects_invalid_hex() {
        let err = SessionKeyId::from_hex("not-hex").unwrap_err();
        assert!(err.to_string().contains("invalid key id"));
    }

    #[test]
    fn test_only_bound_session_keys_have_a_peer() {
        let identity = PrivateKeyRecord::Identity {
            node_id: "node".to_string(),
            key_der: vec![1],
            certificate_der: None,
        };
        let unbound = PrivateKeyRecord::UnboundSession {
            key_id: SessionKeyId::new(vec![1]),
            node_id: "node".to_string(),
            key_der: vec![2],
        };
        let bound = PrivateKeyRecord::BoundSession {
            key_id: SessionKeyId::new(vec![2]),
            node_id: "node".to_string(),
            peer_id: "peer".to_string(),
            key_der: vec![3],
        };

        assert_eq!(identity.peer_id(), None);
        assert_eq!(unbound.peer_id(), None);
        assert_eq!(bound.peer_id(), Some("peer"));
        assert_eq!(bound.node_id(), "node");
    }

    #[test]
    fn test_debug_omits_key_material() {
        let record = PrivateKeyRecord::BoundSession {
            key_id: SessionKeyId::new(vec![0xab]),
            node_id: "node".to_string(),
            peer_id: "peer".to_string(),
            key_der: vec![0xde, 0xad],
        };
        let debug = format!("{record:?}");
        assert!(debug.contains("SessionKeyId(ab)"));
        assert!(!debug.contains("222"));
        assert!(!debug.contains("key_der"));
    }
}
