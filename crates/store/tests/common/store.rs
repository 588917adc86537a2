//! Key store test utilities.

use keystead_store::{KeyStoreBackend, KeyStores, PostgresStore, SqliteStore, StoreResult};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tempfile::TempDir;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

/// A SQLite-backed test store that removes its database on drop.
#[allow(dead_code)]
pub struct TestStore {
    pub backend: Arc<dyn KeyStoreBackend>,
    pub(crate) sqlite_store: Arc<SqliteStore>,
    _temp_dir: TempDir,
}

impl TestStore {
    pub async fn new() -> StoreResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let store = Arc::new(SqliteStore::new(&db_path, None).await?);

        Ok(Self {
            backend: store.clone(),
            sqlite_store: store,
            _temp_dir: temp_dir,
        })
    }

    pub fn stores(&self) -> KeyStores {
        KeyStores::new(self.backend.clone())
    }

    /// Get the SQLite connection pool for raw queries.
    #[allow(dead_code)]
    pub fn pool(&self) -> &Pool<Sqlite> {
        self.sqlite_store.pool()
    }
}

/// PostgreSQL test store running in a testcontainer.
#[allow(dead_code)]
pub struct PostgresTestStore {
    pub backend: Arc<dyn KeyStoreBackend>,
    _container: ContainerAsync<Postgres>,
}

impl PostgresTestStore {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .map_err(|e| format!("Failed to start PostgreSQL container: {e}"))?;

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");

        // Default credentials from testcontainers-modules postgres
        let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
        let store = PostgresStore::from_url(&url, 5, None).await?;

        Ok(Self {
            backend: Arc::new(store),
            _container: container,
        })
    }

    pub fn stores(&self) -> KeyStores {
        KeyStores::new(self.backend.clone())
    }
}

/// Run a test against both SQLite and PostgreSQL backends.
///
/// PostgreSQL needs Docker; set `SKIP_POSTGRES_TESTS` to skip it.
#[allow(dead_code)]
pub async fn run_store_test_both<F, Fut>(test_fn: F)
where
    F: Fn(KeyStores) -> Fut + Clone,
    Fut: std::future::Future<Output = ()>,
{
    let sqlite = TestStore::new()
        .await
        .expect("Failed to create SQLite test store");
    test_fn.clone()(sqlite.stores()).await;

    if std::env::var("SKIP_POSTGRES_TESTS").is_err() {
        match PostgresTestStore::new().await {
            Ok(postgres) => {
                test_fn(postgres.stores()).await;
            }
            Err(err) => {
                eprintln!("Skipping PostgreSQL store tests: {err}");
            }
        }
    }
}
