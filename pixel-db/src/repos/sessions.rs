//! Repository for session records

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::models::{decode_timestamp, encode_timestamp, Session};
use crate::{Error, Result};

/// Repository for managing session records
#[derive(Clone)]
pub struct SessionsRepo {
    pool: SqlitePool,
}

impl SessionsRepo {
    /// Create a new repository instance
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a session; an existing session with the same id is left untouched
    pub async fn create(&self, session_id: &str) -> Result<Session> {
        let now = encode_timestamp(&Utc::now());
        sqlx::query(
            "INSERT OR IGNORE INTO sessions (session_id, created_at, updated_at)
             VALUES (?1, ?2, ?2)",
        )
        .bind(session_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get(session_id).await
    }

    /// Find a session by id
    pub async fn find(&self, session_id: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT session_id, created_at, updated_at FROM sessions WHERE session_id = ?1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    /// Get a session by id, failing if it does not exist
    pub async fn get(&self, session_id: &str) -> Result<Session> {
        self.find(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Session {} not found", session_id)))
    }

    /// Return the session, creating it first if needed
    ///
    /// The flag is true when the session was created by this call.
    pub async fn ensure(&self, session_id: &str) -> Result<(Session, bool)> {
        if let Some(session) = self.find(session_id).await? {
            return Ok((session, false));
        }
        let session = self.create(session_id).await?;
        tracing::info!(session_id, "Created new session");
        Ok((session, true))
    }

    /// List the most recently updated sessions, newest first
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Session>> {
        let rows = sqlx::query(
            "SELECT session_id, created_at, updated_at FROM sessions
             ORDER BY updated_at DESC, rowid DESC
             LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row).collect()
    }
}

fn map_row(row: &SqliteRow) -> Result<Session> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(Session {
        session_id: row.try_get("session_id")?,
        created_at: decode_timestamp("created_at", &created_at)?,
        updated_at: decode_timestamp("updated_at", &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use tempfile::TempDir;

    async fn setup_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();
        (temp_dir, db)
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (_dir, db) = setup_db().await;
        let repo = db.sessions();

        let created = repo.create("session-1").await.unwrap();
        assert_eq!(created.session_id, "session-1");
        assert_eq!(created.created_at, created.updated_at);

        let found = repo.find("session-1").await.unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_find_missing() {
        let (_dir, db) = setup_db().await;
        assert!(db.sessions().find("nope").await.unwrap().is_none());
        assert!(db.sessions().get("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let (_dir, db) = setup_db().await;
        let repo = db.sessions();

        let first = repo.create("dup").await.unwrap();
        let second = repo.create("dup").await.unwrap();
        assert_eq!(first.created_at, second.created_at);
    }

    #[tokio::test]
    async fn test_ensure_reports_creation() {
        let (_dir, db) = setup_db().await;
        let repo = db.sessions();

        let (_, created) = repo.ensure("s").await.unwrap();
        assert!(created);
        let (_, created) = repo.ensure("s").await.unwrap();
        assert!(!created);
    }

    #[tokio::test]
    async fn test_list_recent_orders_by_last_update() {
        let (_dir, db) = setup_db().await;
        let repo = db.sessions();

        repo.create("first").await.unwrap();
        repo.create("second").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        db.turns().append("first", "user", "hello").await.unwrap();

        let sessions = repo.list_recent(10).await.unwrap();
        let ids: Vec<_> = sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_list_recent_respects_limit() {
        let (_dir, db) = setup_db().await;
        let repo = db.sessions();

        for i in 0..12 {
            repo.create(&format!("s{}", i)).await.unwrap();
        }

        let sessions = repo.list_recent(10).await.unwrap();
        assert_eq!(sessions.len(), 10);
        assert_eq!(sessions[0].session_id, "s11");
    }
}
