//! Repository traits for store operations.

pub mod certificates;
pub mod private_keys;
pub mod public_keys;

pub use certificates::CertificateRepo;
pub use private_keys::PrivateKeyRepo;
pub use public_keys::PublicKeyRepo;
