//! Test fixtures.

use keystead_core::{Certificate, CertificationPath, GeneratedKeyPair, KeyPairGenerator};
use time::OffsetDateTime;
use time::macros::datetime;

/// Fixed reference time. Expiry dates in tests are offsets from it.
#[allow(dead_code)]
pub fn reference_now() -> OffsetDateTime {
    datetime!(2030-06-01 12:00:00 UTC)
}

/// Build a certification path whose DER blobs are tagged with `tag`.
#[allow(dead_code)]
pub fn certification_path(
    subject_id: &str,
    expiry_date: OffsetDateTime,
    tag: &str,
) -> CertificationPath {
    let leaf = Certificate::new(format!("leaf-{tag}").into_bytes(), subject_id, expiry_date);
    CertificationPath::new(
        leaf,
        vec![
            format!("intermediate-{tag}").into_bytes(),
            format!("root-{tag}").into_bytes(),
        ],
    )
}

/// Leaf DER blobs of the given paths, sorted for order-insensitive comparison.
#[allow(dead_code)]
pub fn sorted_leaves(paths: &[CertificationPath]) -> Vec<Vec<u8>> {
    let mut leaves: Vec<Vec<u8>> = paths.iter().map(|p| p.leaf().der().to_vec()).collect();
    leaves.sort();
    leaves
}

/// Key pair generator returning a fixed key pair.
#[allow(dead_code)]
pub struct FixedKeyPairGenerator {
    pub node_id: String,
    pub certificate_der: Option<Vec<u8>>,
}

impl KeyPairGenerator for FixedKeyPairGenerator {
    fn generate_identity_key_pair(&self) -> keystead_core::Result<GeneratedKeyPair> {
        Ok(GeneratedKeyPair {
            node_id: self.node_id.clone(),
            private_key_der: format!("private-{}", self.node_id).into_bytes(),
            public_key_der: format!("public-{}", self.node_id).into_bytes(),
            certificate_der: self.certificate_der.clone(),
        })
    }
}

/// Key pair generator that always fails.
#[allow(dead_code)]
pub struct FailingKeyPairGenerator;

impl KeyPairGenerator for FailingKeyPairGenerator {
    fn generate_identity_key_pair(&self) -> keystead_core::Result<GeneratedKeyPair> {
        Err(keystead_core::Error::KeyGeneration("no entropy".to_string()))
    }
}
