//! Persistence layer for cryptographic trust material.
//!
//! This crate provides:
//! - Certification path storage with expiry-aware selection and sweeping
//! - Node identity and session private keys with ownership and peer binding checks
//! - Peers' identity and latest session public keys
//!
//! The stores are generic over the repository traits in [`repos`]; SQLite and
//! PostgreSQL backends are included.

pub mod certificates;
pub mod error;
pub mod models;
pub mod postgres;
pub mod private_keys;
pub mod public_keys;
pub mod repos;
pub mod store;
pub mod sweeper;
mod timestamp;

pub use certificates::CertificateStore;
pub use error::{StoreError, StoreResult, UnknownKeyError};
pub use postgres::PostgresStore;
pub use private_keys::PrivateKeyStore;
pub use public_keys::PublicKeyStore;
pub use store::{KeyStoreBackend, SqliteStore};
pub use sweeper::{spawn_expiry_sweeper, sweep_once};

use keystead_core::config::StoreConfig;
use std::sync::Arc;

/// The three stores sharing one backend.
#[derive(Clone)]
pub struct KeyStores {
    pub backend: Arc<dyn KeyStoreBackend>,
    pub certificates: CertificateStore<dyn KeyStoreBackend>,
    pub private_keys: PrivateKeyStore<dyn KeyStoreBackend>,
    pub public_keys: PublicKeyStore<dyn KeyStoreBackend>,
}

impl KeyStores {
    pub fn new(backend: Arc<dyn KeyStoreBackend>) -> Self {
        Self {
            certificates: CertificateStore::new(backend.clone()),
            private_keys: PrivateKeyStore::new(backend.clone()),
            public_keys: PublicKeyStore::new(backend.clone()),
            backend,
        }
    }
}

/// Create a store backend from configuration. The schema is applied on connect.
pub async fn from_config(config: &StoreConfig) -> StoreResult<Arc<dyn KeyStoreBackend>> {
    config.validate().map_err(StoreError::Config)?;

    match config {
        StoreConfig::Sqlite {
            path,
            query_timeout_secs,
        } => {
            let store = SqliteStore::new(path, *query_timeout_secs).await?;
            Ok(Arc::new(store) as Arc<dyn KeyStoreBackend>)
        }
        StoreConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
            statement_timeout_ms,
        } => {
            let store = if let Some(url) = url {
                // URL takes precedence over individual fields
                tracing::info!("Connecting to PostgreSQL using connection URL");
                PostgresStore::from_url(url, *max_connections, *statement_timeout_ms).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                    *max_connections,
                    *statement_timeout_ms,
                )
                .await?
            } else {
                return Err(StoreError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn KeyStoreBackend>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_sqlite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("keys").join("keystead.db");
        let config = StoreConfig::Sqlite {
            path: db_path.clone(),
            query_timeout_secs: None,
        };

        let backend = from_config(&config).await.unwrap();
        backend.health_check().await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_from_config_rejects_incomplete_postgres() {
        let config = StoreConfig::Postgres {
            url: None,
            host: Some("localhost".to_string()),
            port: None,
            username: None,
            password: None,
            database: None,
            ssl_mode: None,
            max_connections: 1,
            statement_timeout_ms: None,
        };

        match from_config(&config).await {
            Err(StoreError::Config(msg)) => assert!(msg.contains("'database'")),
            Err(other) => panic!("expected config error, got {other}"),
            Ok(_) => panic!("expected config error"),
        }
    }
}
