//! Disposable `PostgreSQL` databases for integration tests.
//!
//! Every [`TestDatabase`] is created under a fresh name, migrated, and removed
//! again by [`TestDatabase::drop_database`], so tests never share rows.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::migrations::Migrator;

/// Server the test databases are created on.
///
/// The account needs the `CREATEDB` privilege.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl TestDbConfig {
    /// Read `TEST_DB_HOST`, `TEST_DB_PORT`, `TEST_DB_USER` and `TEST_DB_PASSWORD`.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        Self {
            host: var("TEST_DB_HOST", "localhost"),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: var("TEST_DB_USER", "ballotbox_test"),
            password: var("TEST_DB_PASSWORD", "ballotbox_test"),
        }
    }

    /// URL of `database` on the test server.
    #[must_use]
    pub fn url(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, database
        )
    }

    /// URL of the maintenance database used to create and drop test databases.
    #[must_use]
    pub fn admin_url(&self) -> String {
        self.url("postgres")
    }
}

/// A migrated database that exists for the duration of one test.
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
    name: String,
    config: TestDbConfig,
}

impl TestDatabase {
    /// Create and migrate a database with a unique name.
    pub async fn create() -> Result<Self, DbErr> {
        Self::create_with(TestDbConfig::from_env()).await
    }

    /// Create and migrate a database with a unique name on `config`'s server.
    pub async fn create_with(config: TestDbConfig) -> Result<Self, DbErr> {
        let name = format!("ballotbox_test_{}", uuid::Uuid::new_v4().simple());

        let admin = Database::connect(config.admin_url()).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!(r#"CREATE DATABASE "{name}""#),
            ))
            .await?;
        admin.close().await?;

        let conn = Database::connect(config.url(&name)).await?;
        Migrator::up(&conn, None).await?;
        info!(database = %name, "Test database ready");

        Ok(Self {
            conn: Arc::new(conn),
            name,
            config,
        })
    }

    /// Borrow the connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Shared handle for repositories and spawned tasks.
    #[must_use]
    pub fn shared(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Name the database was created under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drop the database.
    ///
    /// Pools still held through [`Self::shared`] are disconnected first.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        let Self { conn, name, config } = self;
        drop(conn);

        let admin = Database::connect(config.admin_url()).await?;
        admin
            .execute(Statement::from_sql_and_values(
                DatabaseBackend::Postgres,
                "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
                 WHERE datname = $1 AND pid <> pg_backend_pid()",
                [name.clone().into()],
            ))
            .await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!(r#"DROP DATABASE IF EXISTS "{name}""#),
            ))
            .await?;
        admin.close().await?;

        info!(database = %name, "Test database dropped");
        Ok(())
    }
}
