//! PostgreSQL-based store backend.

use crate::error::StoreResult;
use crate::models::*;
use crate::repos::{CertificateRepo, PrivateKeyRepo, PublicKeyRepo};
use crate::store::KeyStoreBackend;
use crate::timestamp;
use async_trait::async_trait;
use keystead_core::config::PgSslMode;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// PostgreSQL-based store backend.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> StoreResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters,
    /// so the password can come from a separate secret.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> StoreResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> StoreResult<Self> {
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{}ms", timeout_ms))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }
}

#[async_trait]
impl KeyStoreBackend for PostgresStore {
    async fn migrate(&self) -> StoreResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single prepared statement.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CertificateRepo for PostgresStore {
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
            ) VALUES ($1, $2, $3, $4, $5, $6)
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
                "INSERT INTO certification_path_authorities (path_id, position, certificate_der) VALUES ($1, $2, $3)",
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
            WHERE subject_id = $1 AND issuer_id = $2 AND expiry_date > $3
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
            "SELECT * FROM certification_paths WHERE subject_id = $1 AND issuer_id = $2 AND expiry_date > $3",
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
            "SELECT * FROM certification_path_authorities WHERE path_id = $1 ORDER BY position",
        )
        .bind(path_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_expired_certification_paths(&self, now: OffsetDateTime) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM certification_paths WHERE expiry_date <= $1")
            .bind(timestamp::encode(now)?)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PrivateKeyRepo for PostgresStore {
    async fn upsert_identity_private_key(&self, key: &IdentityPrivateKeyRow) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO identity_private_keys (
                node_id, der_serialization, certificate_der, creation_date
            ) VALUES ($1, $2, $3, $4)
            ON CONFLICT(node_id) DO UPDATE SET
                der_serialization = EXCLUDED.der_serialization,
                certificate_der = EXCLUDED.certificate_der
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
            "SELECT * FROM identity_private_keys WHERE node_id = $1",
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
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(key_id) DO UPDATE SET
                der_serialization = EXCLUDED.der_serialization,
                peer_id = COALESCE(session_private_keys.peer_id, EXCLUDED.peer_id)
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
            "SELECT * FROM session_private_keys WHERE key_id = $1",
        )
        .bind(key_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl PublicKeyRepo for PostgresStore {
    async fn upsert_identity_public_key(&self, key: &IdentityPublicKeyRow) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO identity_public_keys (peer_id, der_serialization)
            VALUES ($1, $2)
            ON CONFLICT(peer_id) DO UPDATE SET
                der_serialization = EXCLUDED.der_serialization
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
            "SELECT * FROM identity_public_keys WHERE peer_id = $1",
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
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(peer_id) DO UPDATE SET
                key_id = EXCLUDED.key_id,
                der_serialization = EXCLUDED.der_serialization,
                creation_date = EXCLUDED.creation_date
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
            "SELECT * FROM session_public_keys WHERE peer_id = $1",
        )
        .bind(peer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
