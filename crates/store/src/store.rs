//! Store backend trait and the SQLite implementation.

use crate::error::StoreResult;
use crate::repos::{CertificateRepo, PrivateKeyRepo, PublicKeyRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined backend trait: the relational collaborator behind the stores.
#[async_trait]
pub trait KeyStoreBackend: CertificateRepo + PrivateKeyRepo + PublicKeyRepo + Send + Sync {
    /// Create tables and indexes if they do not exist.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> StoreResult<()>;
}

/// SQLite-based store backend.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) a SQLite database and apply the schema.
    pub async fn new(
        path: impl AsRef<Path>,
        query_timeout_secs: Option<u64>,
    ) -> StoreResult<Self> {
        let path = path.as_ref();
        let query_timeout_secs = query_timeout_secs.unwrap_or(600);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Certificate authority rows are removed through ON DELETE CASCADE.
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // "database is locked" failures when saves race.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        // SQLite cannot cancel a running statement, so the timeout is advisory.
        tracing::debug!(
            path = %path.display(),
            query_timeout_secs = query_timeout_secs,
            "SQLite key store opened"
        );

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl KeyStoreBackend for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use crate::timestamp;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl CertificateRepo for SqliteStore {
        async fn insert_certification_path(
            &self,
            path: &CertificationPathRow,
            authorities: &[Vec<u8>],
        ) -> StoreResult<()> {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                r#"
                INSERT INTO certification_paths (
                    path_id, subject_id, issuer_id, leaf_der, expiry_date, created_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(path.path_id)
            .bind(&path.subject_id)
            .bind(&path.issuer_id)
            .bind(&path.leaf_der)
            .bind(&path.expiry_date)
            .bind(path.created_at)
            .execute(&mut *tx)
            .await?;

            for (position, der) in authorities.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO certification_path_authorities (path_id, position, certificate_der) VALUES (?, ?, ?)",
                )
                .bind(path.path_id)
                .bind(position as i32)
                .bind(der)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(())
        }

        async fn get_latest_certification_path(
            &self,
            subject_id: &str,
            issuer_id: &str,
            now: OffsetDateTime,
        ) -> StoreResult<Option<CertificationPathRow>> {
            let row = sqlx::query_as::<_, CertificationPathRow>(
                r#"
                SELECT * FROM certification_paths
                WHERE subject_id = ? AND issuer_id = ? AND expiry_date > ?
                ORDER BY expiry_date DESC
                LIMIT 1
                "#,
            )
            .bind(subject_id)
            .bind(issuer_id)
            .bind(timestamp::encode(now)?)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn list_certification_paths(
            &self,
            subject_id: &str,
            issuer_id: &str,
            now: OffsetDateTime,
        ) -> StoreResult<Vec<CertificationPathRow>> {
            let rows = sqlx::query_as::<_, CertificationPathRow>(
                "SELECT * FROM certification_paths WHERE subject_id = ? AND issuer_id = ? AND expiry_date > ?",
            )
            .bind(subject_id)
            .bind(issuer_id)
            .bind(timestamp::encode(now)?)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn get_certificate_authorities(
            &self,
            path_id: Uuid,
        ) -> StoreResult<Vec<CertificateAuthorityRow>> {
            let rows = sqlx::query_as::<_, CertificateAuthorityRow>(
                "SELECT * FROM certification_path_authorities WHERE path_id = ? ORDER BY position",
            )
            .bind(path_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn delete_expired_certification_paths(
            &self,
            now: OffsetDateTime,
        ) -> StoreResult<u64> {
            let result = sqlx::query("DELETE FROM certification_paths WHERE expiry_date <= ?")
                .bind(timestamp::encode(now)?)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected())
        }
    }

    #[async_trait]
    impl PrivateKeyRepo for SqliteStore {
        async fn upsert_identity_private_key(
            &self,
            key: &IdentityPrivateKeyRow,
        ) -> StoreResult<()> {
            sqlx::query(
                r#"
                INSERT INTO identity_private_keys (
                    node_id, der_serialization, certificate_der, creation_date
                ) VALUES (?, ?, ?, ?)
                ON CONFLICT(node_id) DO UPDATE SET
                    der_serialization = excluded.der_serialization,
                    certificate_der = excluded.certificate_der
                "#,
            )
            .bind(&key.node_id)
            .bind(&key.der_serialization)
            .bind(&key.certificate_der)
            .bind(key.creation_date)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_identity_private_key(
            &self,
            node_id: &str,
        ) -> StoreResult<Option<IdentityPrivateKeyRow>> {
            let row = sqlx::query_as::<_, IdentityPrivateKeyRow>(
                "SELECT * FROM identity_private_keys WHERE node_id = ?",
            )
            .bind(node_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn list_identity_certificates(&self) -> StoreResult<Vec<Vec<u8>>> {
            let rows: Vec<(Vec<u8>,)> = sqlx::query_as(
                "SELECT certificate_der FROM identity_private_keys WHERE certificate_der IS NOT NULL ORDER BY creation_date",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows.into_iter().map(|(der,)| der).collect())
        }

        async fn upsert_session_private_key(&self, key: &SessionPrivateKeyRow) -> StoreResult<()> {
            sqlx::query(
                r#"
                INSERT INTO session_private_keys (
                    key_id, node_id, peer_id, der_serialization, creation_date
                ) VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(key_id) DO UPDATE SET
                    der_serialization = excluded.der_serialization,
                    peer_id = COALESCE(session_private_keys.peer_id, excluded.peer_id)
                "#,
            )
            .bind(&key.key_id)
            .bind(&key.node_id)
            .bind(&key.peer_id)
            .bind(&key.der_serialization)
            .bind(key.creation_date)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_session_private_key(
            &self,
            key_id: &str,
        ) -> StoreResult<Option<SessionPrivateKeyRow>> {
            let row = sqlx::query_as::<_, SessionPrivateKeyRow>(
                "SELECT * FROM session_private_keys WHERE key_id = ?",
            )
            .bind(key_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }
    }

    #[async_trait]
    impl PublicKeyRepo for SqliteStore {
        async fn upsert_identity_public_key(&self, key: &IdentityPublicKeyRow) -> StoreResult<()> {
            sqlx::query(
                r#"
                INSERT INTO identity_public_keys (peer_id, der_serialization)
                VALUES (?, ?)
                ON CONFLICT(peer_id) DO UPDATE SET
                    der_serialization = excluded.der_serialization
                "#,
            )
            .bind(&key.peer_id)
            .bind(&key.der_serialization)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_identity_public_key(
            &self,
            peer_id: &str,
        ) -> StoreResult<Option<IdentityPublicKeyRow>> {
            let row = sqlx::query_as::<_, IdentityPublicKeyRow>(
                "SELECT * FROM identity_public_keys WHERE peer_id = ?",
            )
            .bind(peer_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn upsert_session_public_key(&self, key: &SessionPublicKeyRow) -> StoreResult<()> {
            sqlx::query(
                r#"
                INSERT INTO session_public_keys (peer_id, key_id, der_serialization, creation_date)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(peer_id) DO UPDATE SET
                    key_id = excluded.key_id,
                    der_serialization = excluded.der_serialization,
                    creation_date = excluded.creation_date
                "#,
            )
            .bind(&key.peer_id)
            .bind(&key.key_id)
            .bind(&key.der_serialization)
            .bind(&key.creation_date)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_session_public_key(
            &self,
            peer_id: &str,
        ) -> StoreResult<Option<SessionPublicKeyRow>> {
            let row = sqlx::query_as::<_, SessionPublicKeyRow>(
                "SELECT * FROM session_public_keys WHERE peer_id = ?",
            )
            .bind(peer_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Certification paths (leaf certificate per row)
CREATE TABLE IF NOT EXISTS certification_paths (
    path_id BLOB PRIMARY KEY,
    subject_id TEXT NOT NULL,
    issuer_id TEXT NOT NULL,
    leaf_der BLOB NOT NULL,
    -- Fixed-width UTC text with nanoseconds, so byte order is time order
    expiry_date TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_certification_paths_scope ON certification_paths(subject_id, issuer_id, expiry_date);
CREATE INDEX IF NOT EXISTS idx_certification_paths_expiry ON certification_paths(expiry_date);

-- Certificate authorities of each path, closest issuer first
CREATE TABLE IF NOT EXISTS certification_path_authorities (
    path_id BLOB NOT NULL,
    position INTEGER NOT NULL,
    certificate_der BLOB NOT NULL,
    PRIMARY KEY (path_id, position),
    FOREIGN KEY (path_id) REFERENCES certification_paths(path_id) ON DELETE CASCADE
);

-- Node identity private keys
CREATE TABLE IF NOT EXISTS identity_private_keys (
    node_id TEXT PRIMARY KEY,
    der_serialization BLOB NOT NULL,
    certificate_der BLOB,
    creation_date TEXT NOT NULL
);

-- Session private keys (peer_id NULL while unbound)
CREATE TABLE IF NOT EXISTS session_private_keys (
    key_id TEXT PRIMARY KEY,
    node_id TEXT NOT NULL,
    peer_id TEXT,
    der_serialization BLOB NOT NULL,
    creation_date TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_session_private_keys_node ON session_private_keys(node_id);
CREATE INDEX IF NOT EXISTS idx_session_private_keys_peer ON session_private_keys(peer_id);

-- Peer identity public keys
CREATE TABLE IF NOT EXISTS identity_public_keys (
    peer_id TEXT PRIMARY KEY,
    der_serialization BLOB NOT NULL
);

-- Last session public key announced by each peer
CREATE TABLE IF NOT EXISTS session_public_keys (
    peer_id TEXT PRIMARY KEY,
    key_id BLOB NOT NULL,
    der_serialization BLOB NOT NULL,
    creation_date TEXT NOT NULL
);
"#;
