//! Session transcripts
//!
//! A transcript records every turn of a migration run and replays the most
//! recent ones into later prompts. The database-backed transcript lets a run
//! be resumed by session id.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::ChatMessage;
use crate::{Error, Result};

/// Turn role for the prompts the team sends on the user's behalf
pub const USER_ROLE: &str = "user";

/// One recorded turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRecord {
    pub role: String,
    pub content: String,
}

impl TurnRecord {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Where a session's turns are kept
#[async_trait]
pub trait Transcript: Send + Sync + fmt::Debug {
    fn session_id(&self) -> &str;

    /// Append a turn
    async fn record(&self, role: &str, content: &str) -> Result<()>;

    /// The last `limit` turns, oldest first
    async fn recent(&self, limit: usize) -> Result<Vec<TurnRecord>>;
}

/// Replay turns as chat history
///
/// Team member turns become assistant messages tagged with the role. Leading
/// assistant messages are dropped so the history always opens with a user
/// message.
pub fn to_messages(turns: &[TurnRecord]) -> Vec<ChatMessage> {
    turns
        .iter()
        .skip_while(|t| t.role != USER_ROLE)
        .map(|t| {
            if t.role == USER_ROLE {
                ChatMessage::user(t.content.clone())
            } else {
                ChatMessage::assistant(format!("[{}] {}", t.role, t.content))
            }
        })
        .collect()
}

/// In-process transcript, lost on exit
#[derive(Debug)]
pub struct MemoryTranscript {
    session_id: String,
    turns: Mutex<Vec<TurnRecord>>,
}

impl MemoryTranscript {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            turns: Mutex::new(Vec::new()),
        }
    }

    /// All turns so far
    pub fn turns(&self) -> Vec<TurnRecord> {
        self.turns.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transcript for MemoryTranscript {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn record(&self, role: &str, content: &str) -> Result<()> {
        self.turns
            .lock()
            .map_err(|_| Error::Session("transcript lock poisoned".to_string()))?
            .push(TurnRecord::new(role, content));
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<TurnRecord>> {
        let turns = self
            .turns
            .lock()
            .map_err(|_| Error::Session("transcript lock poisoned".to_string()))?;
        let start = turns.len().saturating_sub(limit);
        Ok(turns[start..].to_vec())
    }
}

#[cfg(feature = "database")]
pub use db::DbTranscript;

#[cfg(feature = "database")]
mod db {
    use super::*;
    use pixel_db::Database;
    use tracing::info;

    /// Transcript stored in the session database
    #[derive(Debug, Clone)]
    pub struct DbTranscript {
        db: Database,
        session_id: String,
        resumed: bool,
    }

    impl DbTranscript {
        /// Open the session, creating it if the id is new
        pub async fn open(db: Database, session_id: &str) -> Result<Self> {
            let (_, created) = db.sessions().ensure(session_id).await?;
            let resumed = !created;
            if resumed {
                let turns = db.turns().count(session_id).await?;
                info!(session_id, turns, "Resuming session");
            } else {
                info!(session_id, "Started new session");
            }
            Ok(Self {
                db,
                session_id: session_id.to_string(),
                resumed,
            })
        }

        /// Whether the session existed before this run
        pub fn is_resumed(&self) -> bool {
            self.resumed
        }
    }

    #[async_trait]
    impl Transcript for DbTranscript {
        fn session_id(&self) -> &str {
            &self.session_id
        }

        async fn record(&self, role: &str, content: &str) -> Result<()> {
            self.db
                .turns()
                .append(&self.session_id, role, content)
                .await?;
            Ok(())
        }

        async fn recent(&self, limit: usize) -> Result<Vec<TurnRecord>> {
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let turns = self.db.turns().recent(&self.session_id, limit).await?;
            Ok(turns
                .into_iter()
                .map(|t| TurnRecord::new(t.role, t.content))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatRole;

    #[tokio::test]
    async fn test_memory_window() {
        let transcript = MemoryTranscript::new("s1");
        for i in 0..5 {
            transcript.record(USER_ROLE, &format!("turn {}", i)).await.unwrap();
        }

        let recent = transcript.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "turn 3");
        assert_eq!(recent[1].content, "turn 4");
        assert_eq!(transcript.recent(50).await.unwrap().len(), 5);
    }

    #[test]
    fn test_to_messages_starts_with_user() {
        let turns = vec![
            TurnRecord::new("architect", "{}"),
            TurnRecord::new(USER_ROLE, "Convert a.tsx"),
            TurnRecord::new("developer", "<template/>"),
        ];
        let messages = to_messages(&turns);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[1].content, "[developer] <template/>");
    }

    #[cfg(feature = "database")]
    #[tokio::test]
    async fn test_db_transcript_resume() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = pixel_db::Database::new(dir.path().join("s.db")).await.unwrap();

        let first = DbTranscript::open(db.clone(), "abc").await.unwrap();
        assert!(!first.is_resumed());
        first.record(USER_ROLE, "analyze").await.unwrap();
        first.record("analyzer", "App Router").await.unwrap();

        let second = DbTranscript::open(db, "abc").await.unwrap();
        assert!(second.is_resumed());
        let recent = second.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1], TurnRecord::new("analyzer", "App Router"));
    }
}
