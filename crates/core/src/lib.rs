//! Core domain types for the keystead trust material store.
//!
//! This crate defines the data model shared by the store backends and the CLI:
//! - Certificates and certification paths
//! - Private key records (identity, unbound session, bound session)
//! - Peer public keys and session key identifiers
//! - Configuration for store backends and the expiry sweeper

pub mod certificate;
pub mod config;
pub mod error;
pub mod keys;

pub use certificate::{Certificate, CertificationPath};
pub use error::{Error, Result};
pub use keys::{
    GeneratedKeyPair, KeyPairGenerator, PrivateKeyRecord, SessionKeyId, SessionPublicKey,
};
