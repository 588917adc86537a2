//! Certificates and certification paths.
//!
//! Certificates are opaque DER blobs. Parsing happens outside this crate; the
//! caller hands over the identifiers and the expiry date it extracted so the
//! store never has to inspect the encoding.

use time::OffsetDateTime;

/// A serialized certificate plus the metadata the store keys it by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    subject_id: String,
    expiry_date: OffsetDateTime,
}

impl Certificate {
    pub fn new(der: Vec<u8>, subject_id: impl Into<String>, expiry_date: OffsetDateTime) -> Self {
        Self {
            der,
            subject_id: subject_id.into(),
            expiry_date,
        }
    }

    /// DER serialization.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Content-derived id of the subject (the node the certificate was issued to).
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn expiry_date(&self) -> OffsetDateTime {
        self.expiry_date
    }
}

/// A leaf certificate and the certificate authorities needed to validate it,
/// ordered from the leaf's issuer up to the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificationPath {
    leaf: Certificate,
    certificate_authorities: Vec<Vec<u8>>,
}

impl CertificationPath {
    pub fn new(leaf: Certificate, certificate_authorities: Vec<Vec<u8>>) -> Self {
        Self {
            leaf,
            certificate_authorities,
        }
    }

    pub fn leaf(&self) -> &Certificate {
        &self.leaf
    }

    /// DER serializations of the certificate authorities, closest issuer first.
    pub fn certificate_authorities(&self) -> &[Vec<u8>] {
        &self.certificate_authorities
    }

    pub fn subject_id(&self) -> &str {
        self.leaf.subject_id()
    }

    /// The path expires with its leaf.
    pub fn expiry_date(&self) -> OffsetDateTime {
        self.leaf.expiry_date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_path_takes_identity_and_expiry_from_leaf() {
        let expiry = datetime!(2030-01-01 0:00 UTC);
        let leaf = Certificate::new(vec![1, 2, 3], "node-a", expiry);
        let path = CertificationPath::new(leaf, vec![vec![9], vec![8]]);

        assert_eq!(path.subject_id(), "node-a");
        assert_eq!(path.expiry_date(), expiry);
        assert_eq!(path.certificate_authorities().len(), 2);
    }
}
