//! SQLite Database
//!
//! Embedded database for persistent storage using rusqlite with r2d2
//! connection pooling. All session namespaces share one `sessions` table
//! keyed by (namespace, id).

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::models::settings::EngineConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::database_path;

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database service for managing SQLite operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a database from an existing connection pool
    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create an in-memory database for testing.
    ///
    /// Pool size is pinned to 1 because each in-memory SQLite connection
    /// gets its own private database.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Create a new database at the default location (~/.audit-workbench/sessions.db)
    pub fn new() -> AppResult<Self> {
        Self::open(database_path()?)
    }

    /// Create a database at the configured location.
    ///
    /// Honors the `database_path` override when set; otherwise falls back
    /// to the default location.
    pub fn from_config(config: &EngineConfig) -> AppResult<Self> {
        match &config.database_path {
            Some(path) => Self::open(path),
            None => Self::new(),
        }
    }

    /// Create a new database at an explicit path
    pub fn open(db_path: impl AsRef<std::path::Path>) -> AppResult<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> AppResult<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                namespace TEXT NOT NULL,
                id TEXT NOT NULL,
                name TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY (namespace, id)
            )",
            [],
        )?;

        // History views read most-recently-updated first
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_namespace_updated
             ON sessions(namespace, last_updated DESC)",
            [],
        )?;

        Ok(())
    }

    /// Get access to the connection pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Check that the database accepts queries
    pub fn is_healthy(&self) -> bool {
        self.pool
            .get()
            .ok()
            .and_then(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).ok())
            .is_some()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_database_creates_schema() {
        let db = Database::new_in_memory().unwrap();
        let conn = db.pool().get().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='sessions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_schema_init_is_idempotent() {
        let db = Database::new_in_memory().unwrap();
        db.init_schema().unwrap();
        assert!(db.is_healthy());
    }

    #[test]
    fn test_from_config_honors_path_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("override.db");
        let config = EngineConfig {
            database_path: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };

        let db = Database::from_config(&config).unwrap();
        assert!(path.exists());
        assert!(db.is_healthy());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.db");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert!(db.is_healthy());
    }
}
