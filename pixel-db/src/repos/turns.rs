//! Repository for conversation turns

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::models::{decode_timestamp, encode_timestamp, Turn};
use crate::{Error, Result};

/// Repository for appending and reading session turns
#[derive(Clone)]
pub struct TurnsRepo {
    pool: SqlitePool,
}

impl TurnsRepo {
    /// Create a new repository instance
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a turn to an existing session and bump its update time
    pub async fn append(&self, session_id: &str, role: &str, content: &str) -> Result<Turn> {
        let now = Utc::now();
        let encoded = encode_timestamp(&now);

        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE sessions SET updated_at = ?1 WHERE session_id = ?2")
            .bind(&encoded)
            .bind(session_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if touched == 0 {
            tx.rollback().await?;
            return Err(Error::NotFound(format!("Session {} not found", session_id)));
        }

        let sequence: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence) + 1, 0) FROM session_turns WHERE session_id = ?1",
        )
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO session_turns (session_id, sequence, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(session_id)
        .bind(sequence)
        .bind(role)
        .bind(content)
        .bind(&encoded)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(session_id, sequence, role, "Appended session turn");

        Ok(Turn {
            session_id: session_id.to_string(),
            sequence,
            role: role.to_string(),
            content: content.to_string(),
            timestamp: now,
        })
    }

    /// The last `limit` turns of a session, oldest first
    pub async fn recent(&self, session_id: &str, limit: i64) -> Result<Vec<Turn>> {
        let rows = sqlx::query(
            "SELECT session_id, sequence, role, content, timestamp FROM session_turns
             WHERE session_id = ?1
             ORDER BY sequence DESC
             LIMIT ?2",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut turns = rows.iter().map(map_row).collect::<Result<Vec<_>>>()?;
        turns.reverse();
        Ok(turns)
    }

    /// All turns of a session in order
    pub async fn all(&self, session_id: &str) -> Result<Vec<Turn>> {
        let rows = sqlx::query(
            "SELECT session_id, sequence, role, content, timestamp FROM session_turns
             WHERE session_id = ?1
             ORDER BY sequence ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row).collect()
    }

    /// Count turns for a session
    pub async fn count(&self, session_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM session_turns WHERE session_id = ?1")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

fn map_row(row: &SqliteRow) -> Result<Turn> {
    let timestamp: String = row.try_get("timestamp")?;
    Ok(Turn {
        session_id: row.try_get("session_id")?,
        sequence: row.try_get("sequence")?,
        role: row.try_get("role")?,
        content: row.try_get("content")?,
        timestamp: decode_timestamp("timestamp", &timestamp)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::{Database, Error};
    use tempfile::TempDir;

    async fn setup_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();
        db.sessions().create("run").await.unwrap();
        (temp_dir, db)
    }

    #[tokio::test]
    async fn test_append_assigns_sequence() {
        let (_dir, db) = setup_db().await;
        let turns = db.turns();

        let a = turns.append("run", "user", "migrate please").await.unwrap();
        let b = turns.append("run", "analyzer", "found 3 files").await.unwrap();

        assert_eq!(a.sequence, 0);
        assert_eq!(b.sequence, 1);
        assert_eq!(turns.count("run").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_append_to_unknown_session_fails() {
        let (_dir, db) = setup_db().await;
        let err = db.turns().append("ghost", "user", "hi").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_append_updates_session_timestamp() {
        let (_dir, db) = setup_db().await;
        let before = db.sessions().get("run").await.unwrap();

        let turn = db.turns().append("run", "user", "x").await.unwrap();
        let after = db.sessions().get("run").await.unwrap();

        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.created_at, before.created_at);
        assert!(turn.timestamp >= before.updated_at);
    }

    #[tokio::test]
    async fn test_recent_returns_window_oldest_first() {
        let (_dir, db) = setup_db().await;
        let turns = db.turns();

        for i in 0..15 {
            turns.append("run", "user", &format!("turn {}", i)).await.unwrap();
        }

        let recent = turns.recent("run", 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "turn 5");
        assert_eq!(recent[9].content, "turn 14");
    }

    #[tokio::test]
    async fn test_all_is_ordered() {
        let (_dir, db) = setup_db().await;
        let turns = db.turns();

        turns.append("run", "user", "one").await.unwrap();
        turns.append("run", "architect", "two").await.unwrap();

        let all = turns.all("run").await.unwrap();
        let contents: Vec<_> = all.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
        assert_eq!(all[1].role, "architect");
    }

    #[tokio::test]
    async fn test_recent_for_empty_session() {
        let (_dir, db) = setup_db().await;
        assert!(db.turns().recent("run", 10).await.unwrap().is_empty());
    }
}
