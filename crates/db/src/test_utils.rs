//! Throwaway `PostgreSQL` databases for integration tests.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use tracing::info;

/// Server holding the test databases, from `TEST_DB_*` variables.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Role allowed to create databases.
    pub username: String,
    /// Password of that role.
    pub password: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };
        Self {
            host: var("TEST_DB_HOST", "localhost"),
            port: var("TEST_DB_PORT", "5433").parse().unwrap_or(5433),
            username: var("TEST_DB_USER", "pollhub_test"),
            password: var("TEST_DB_PASSWORD", "pollhub_test"),
        }
    }
}

impl TestDbConfig {
    /// URL of `database` on the test server.
    #[must_use]
    pub fn url(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{database}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// A migrated database that exists for one test.
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
    config: TestDbConfig,
    name: String,
}

impl TestDatabase {
    /// Create a uniquely named database and run all migrations on it.
    pub async fn create_unique() -> Result<Self, DbErr> {
        let config = TestDbConfig::default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("pollhub_test_{}", &suffix[..8]);

        let admin = Database::connect(&config.url("postgres")).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("CREATE DATABASE \"{name}\""),
            ))
            .await?;
        admin.close().await?;

        let conn = Database::connect(&config.url(&name)).await?;
        {
            use sea_orm_migration::MigratorTrait;
            crate::migrations::Migrator::up(&conn, None).await?;
        }

        info!(database = %name, "Created test database");
        Ok(Self {
            conn: Arc::new(conn),
            config,
            name,
        })
    }

    /// Shared handle for building repositories.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// URL of this database, for opening extra connections.
    #[must_use]
    pub fn url(&self) -> String {
        self.config.url(&self.name)
    }

    /// Drop the database. Outstanding handles are disconnected by the server.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        if let Some(conn) = Arc::into_inner(self.conn) {
            conn.close().await?;
        }

        let admin = Database::connect(&self.config.url("postgres")).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.name),
            ))
            .await?;
        admin.close().await?;

        info!(database = %self.name, "Dropped test database");
        Ok(())
    }
}
