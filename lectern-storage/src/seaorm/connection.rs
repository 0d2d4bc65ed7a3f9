use lectern_config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection as SeaConnection, DbErr};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::migrations::Migrator;

/// Database connection wrapper
#[derive(Clone)]
pub struct DatabaseConnection {
    connection: SeaConnection,
}

/// Database-related errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    DbError(#[from] DbErr),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DatabaseConnection {
    /// Create a new database connection with configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self, DatabaseError> {
        info!("Connecting to database: {}", config.url);

        Self::ensure_sqlite_directory(&config.url)?;

        // A pool over `:memory:` would hand every connection its own database
        let max_connections = if config.url.contains(":memory:") {
            1
        } else {
            config.max_connections
        };

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(config.connection_timeout)
            .acquire_timeout(config.connection_timeout)
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(true)
            .sqlx_logging_level(log::LevelFilter::Debug);

        let connection = Database::connect(opts).await?;

        debug!("Database connection established with {} max connections", max_connections);

        Ok(Self { connection })
    }

    /// Create the parent directory of a file-based SQLite database
    fn ensure_sqlite_directory(database_url: &str) -> Result<(), DatabaseError> {
        if !database_url.starts_with("sqlite:") || database_url.contains(":memory:") {
            return Ok(());
        }

        let without_scheme = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .ok_or_else(|| DatabaseError::ConfigError(format!("Invalid SQLite URL format: {}", database_url)))?;
        let file_path = without_scheme.split('?').next().unwrap_or(without_scheme);

        if file_path.is_empty() {
            return Err(DatabaseError::ConfigError(format!(
                "Invalid SQLite URL format: {}",
                database_url
            )));
        }

        let path = std::path::Path::new(file_path);
        if let Some(parent_dir) = path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                info!("Creating database directory: {:?}", parent_dir);
                std::fs::create_dir_all(parent_dir).map_err(|e| {
                    DatabaseError::ConfigError(format!("Failed to create database directory {:?}: {}", parent_dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Get the underlying Sea-ORM connection
    pub fn get_connection(&self) -> &SeaConnection {
        &self.connection
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        use sea_orm_migration::MigratorTrait;

        info!("Running database migrations");

        Migrator::up(&self.connection, None)
            .await
            .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Check database connectivity
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        self.connection.ping().await.map_err(DatabaseError::DbError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_config(dir: &tempfile::TempDir) -> DatabaseConfig {
        DatabaseConfig {
            url: format!("sqlite://{}/nested/lectern.db?mode=rwc", dir.path().display()),
            max_connections: 2,
            connection_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    #[tokio::test]
    async fn test_connect_and_migrate_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = DatabaseConnection::new(file_config(&dir)).await.unwrap();

        db.ping().await.unwrap();
        db.migrate().await.unwrap();
        // Migrations are idempotent
        db.migrate().await.unwrap();

        assert!(dir.path().join("nested").exists());
    }

    #[test]
    fn test_rejects_empty_sqlite_path() {
        assert!(DatabaseConnection::ensure_sqlite_directory("sqlite://").is_err());
        assert!(DatabaseConnection::ensure_sqlite_directory("sqlite::memory:").is_ok());
        assert!(DatabaseConnection::ensure_sqlite_directory("postgres://localhost/lectern").is_ok());
    }
}
