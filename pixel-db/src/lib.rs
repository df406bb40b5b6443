//! Database layer for Pixel-Perfect
//!
//! Persists migration sessions and their conversation turns so that a
//! multi-turn run can be resumed later by session id.

pub mod error;
pub mod models;
pub mod repos;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use error::{Error, Result};
pub use models::{Session, Turn};
pub use repos::{SessionsRepo, TurnsRepo};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sessions (
        session_id TEXT PRIMARY KEY NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sessions_updated_at
     ON sessions(updated_at)",
    "CREATE TABLE IF NOT EXISTS session_turns (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        sequence INTEGER NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        FOREIGN KEY (session_id) REFERENCES sessions(session_id),
        UNIQUE(session_id, sequence)
    )",
    "CREATE INDEX IF NOT EXISTS idx_session_turns_session
     ON session_turns(session_id, sequence)",
];

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (creating if needed) the database at a file path
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Io(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        tracing::debug!(path = %db_path.display(), "Session database ready");
        Ok(db)
    }

    /// Get the default database path (~/.cache/pixel-perfect/sessions.db)
    pub fn default_path() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| Error::Io("Could not determine cache directory".to_string()))?;
        Ok(cache_dir.join("pixel-perfect").join("sessions.db"))
    }

    /// Open the database at the default path
    pub async fn open_default() -> Result<Self> {
        Self::new(Self::default_path()?).await
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Migration(e.to_string()))?;
        }
        Ok(())
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the sessions repository
    pub fn sessions(&self) -> SessionsRepo {
        SessionsRepo::new(self.pool.clone())
    }

    /// Get the turns repository
    pub fn turns(&self) -> TurnsRepo {
        TurnsRepo::new(self.pool.clone())
    }

    /// Close the pool, waiting for connections to finish
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("sessions.db");

        let _db = Database::new(&db_path).await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_schema_tables_exist() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();

        for table in ["sessions", "session_turns"] {
            let result: (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            )
            .bind(table)
            .fetch_one(db.pool())
            .await
            .unwrap();
            assert_eq!(result.0, 1, "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.db");

        let db = Database::new(&path).await.unwrap();
        db.sessions().create("abc").await.unwrap();
        db.close().await;

        let db = Database::new(&path).await.unwrap();
        assert!(db.sessions().find("abc").await.unwrap().is_some());
    }
}
