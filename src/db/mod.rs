use crate::history::{
    format_timestamp, parse_timestamp, HistoryBackend, HistoryReadError, HistoryWriteError,
    PostRecord,
};
use rusqlite::{Connection, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS post_history (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        content TEXT NOT NULL,
        hash TEXT NOT NULL,
        created_at DATETIME NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_post_history_hash ON post_history (hash);
";

/// SQLite-backed post history. Each rewrite runs in a single transaction.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: String,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_string(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn execute_init(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(SCHEMA)?;
        debug!("Database: post_history schema ready at {}", self.path);
        Ok(())
    }

    pub fn count_posts(&self) -> Result<usize> {
        let conn = self.lock();
        conn.query_row("SELECT COUNT(*) FROM post_history", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
    }
}

impl HistoryBackend for Database {
    fn read_all(&self) -> std::result::Result<Vec<PostRecord>, HistoryReadError> {
        self.execute_init()?;

        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT content, hash, created_at FROM post_history ORDER BY seq")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (content, hash, created_at) = row?;
            let timestamp =
                parse_timestamp(&created_at).ok_or_else(|| HistoryReadError::Parse {
                    path: self.path.clone(),
                    reason: format!("invalid created_at '{created_at}'"),
                })?;
            records.push(PostRecord {
                content,
                hash,
                timestamp,
            });
        }

        debug!("Database: read {} posts", records.len());
        Ok(records)
    }

    fn replace_all(&self, records: &[PostRecord]) -> std::result::Result<(), HistoryWriteError> {
        self.execute_init()?;

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM post_history", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO post_history (content, hash, created_at) VALUES (?1, ?2, ?3)",
            )?;
            for record in records {
                insert.execute((
                    &record.content,
                    &record.hash,
                    format_timestamp(&record.timestamp),
                ))?;
            }
        }
        tx.commit()?;

        debug!("Database: persisted {} posts", records.len());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.clone()
    }
}
