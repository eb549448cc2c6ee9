//! Database layer for pollhub.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use pollhub_common::{AppError, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use std::time::Duration;
use tracing::log::LevelFilter;

/// Initialize database connection.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Run pending migrations.
///
/// Must complete before the server accepts requests.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Whether an insert lost against a unique constraint.
///
/// Covers both an `ON CONFLICT DO NOTHING` insert that wrote no row and a
/// unique violation reported by the driver.
#[must_use]
pub fn is_unique_conflict(err: &DbErr) -> bool {
    matches!(err, DbErr::RecordNotInserted)
        || matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Convert a database error into the application error.
#[must_use]
pub fn db_error(err: DbErr) -> AppError {
    AppError::Database(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_not_inserted_is_conflict() {
        assert!(is_unique_conflict(&DbErr::RecordNotInserted));
    }

    #[test]
    fn test_other_errors_are_not_conflicts() {
        assert!(!is_unique_conflict(&DbErr::Custom("boom".to_string())));
        assert!(!is_unique_conflict(&DbErr::RecordNotFound("x".to_string())));
    }
}
