//! SQLite Store
//!
//! Request log and user accounts in one database file. rusqlite is
//! blocking, so every call runs on the blocking pool behind a mutex and is
//! bounded by a timeout.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use super::{NewRequestLog, RequestLogRecord, RequestStore, UserRecord, UserStore};
use crate::error::PersistenceError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS request_logs (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        endpoint    TEXT NOT NULL,
        input_value TEXT NOT NULL,
        result      TEXT NOT NULL,
        timestamp   TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_request_logs_timestamp ON request_logs(timestamp);

    CREATE TABLE IF NOT EXISTS users (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at    TEXT NOT NULL
    );
";

/// SQLite-backed request log and user table.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    /// Upper bound for one statement, queueing on the mutex included
    timeout: Duration,
}

impl SqliteStore {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        // FULL: a committed row survives power loss, not just a crash.
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.busy_timeout(timeout)?;

        info!("Request log database opened at {}", path.display());
        Self::with_connection(conn, timeout)
    }

    /// Private in-memory database, for tests and dry runs.
    pub fn open_in_memory(timeout: Duration) -> Result<Self, PersistenceError> {
        Self::with_connection(Connection::open_in_memory()?, timeout)
    }

    fn with_connection(conn: Connection, timeout: Duration) -> Result<Self, PersistenceError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        })
    }

    /// Runs `op` on the blocking pool with the connection locked.
    async fn run<T, F>(&self, op: F) -> Result<T, PersistenceError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, PersistenceError> + Send + 'static,
    {
        let conn = self.conn.clone();
        let task = tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| PersistenceError::Poisoned)?;
            op(&guard)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PersistenceError::Task(e.to_string())),
            Err(_) => Err(PersistenceError::Timeout(self.timeout)),
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| PersistenceError::Corrupt(format!("bad timestamp '{}': {}", raw, e)))
}

#[async_trait]
impl RequestStore for SqliteStore {
    async fn insert(&self, log: NewRequestLog) -> Result<RequestLogRecord, PersistenceError> {
        self.run(move |conn| {
            let timestamp = Utc::now();
            conn.execute(
                "INSERT INTO request_logs (endpoint, input_value, result, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![log.endpoint, log.input, log.result, timestamp.to_rfc3339()],
            )?;
            let id = conn.last_insert_rowid();
            debug!(id, endpoint = %log.endpoint, "request log persisted");

            Ok(RequestLogRecord {
                id,
                endpoint: log.endpoint,
                input: log.input,
                result: log.result,
                timestamp,
            })
        })
        .await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<RequestLogRecord>, PersistenceError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, endpoint, input_value, result, timestamp
                 FROM request_logs ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (id, endpoint, input, result, timestamp) = row?;
                records.push(RequestLogRecord {
                    id,
                    endpoint,
                    input,
                    result,
                    timestamp: parse_timestamp(&timestamp)?,
                });
            }
            Ok(records)
        })
        .await
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, PersistenceError> {
        let username = username.to_string();
        let password_hash = password_hash.to_string();
        self.run(move |conn| {
            let created_at = Utc::now();
            let inserted = conn.execute(
                "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
                params![username, password_hash, created_at.to_rfc3339()],
            );
            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    return Err(PersistenceError::DuplicateUser(username));
                }
                Err(e) => return Err(e.into()),
            }
            let id = conn.last_insert_rowid();
            info!(id, %username, "user created");

            Ok(UserRecord {
                id,
                username,
                password_hash,
                created_at,
            })
        })
        .await
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, PersistenceError> {
        let username = username.to_string();
        self.run(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
                    params![username],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()?;

            let Some((id, username, password_hash, created_at)) = row else {
                return Ok(None);
            };
            Ok(Some(UserRecord {
                id,
                username,
                password_hash,
                created_at: parse_timestamp(&created_at)?,
            }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_log(endpoint: &str, input: &str, result: &str) -> NewRequestLog {
        NewRequestLog {
            endpoint: endpoint.to_string(),
            input: input.to_string(),
            result: result.to_string(),
        }
    }

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamp() {
        let store = store();
        let before = Utc::now();

        let record = store.insert(new_log("pow", "2,8", "256")).await.unwrap();

        assert_eq!(record.id, 1);
        assert_eq!(record.endpoint, "pow");
        assert_eq!(record.input, "2,8");
        assert_eq!(record.result, "256");
        assert!(record.timestamp >= before);
    }

    #[tokio::test]
    async fn test_recent_returns_newest_first() {
        let store = store();
        store.insert(new_log("fib", "7", "13")).await.unwrap();
        store.insert(new_log("factorial", "6", "720")).await.unwrap();
        store.insert(new_log("pow", "2,8", "256")).await.unwrap();

        let records = store.recent(2).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].endpoint, "pow");
        assert_eq!(records[1].endpoint, "factorial");
    }

    #[tokio::test]
    async fn test_large_results_are_stored_verbatim() {
        let store = store();
        let big = "9".repeat(5000);

        store.insert(new_log("pow", "10,5000", &big)).await.unwrap();

        let records = store.recent(1).await.unwrap();
        assert_eq!(records[0].result, big);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("instance").join("requests.db");

        {
            let store = SqliteStore::open(&path, Duration::from_secs(5)).unwrap();
            store.insert(new_log("fib", "0", "0")).await.unwrap();
        }

        let reopened = SqliteStore::open(&path, Duration::from_secs(5)).unwrap();
        let records = reopened.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].input, "0");
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = store();

        let created = store.create_user("testuser", "$argon2id$hash").await.unwrap();
        let found = store.find_user("testuser").await.unwrap().unwrap();

        assert_eq!(found, created);
        assert_eq!(found.password_hash, "$argon2id$hash");
        assert!(store.find_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = store();
        store.create_user("testuser", "h1").await.unwrap();

        let result = store.create_user("testuser", "h2").await;

        assert!(matches!(result, Err(PersistenceError::DuplicateUser(name)) if name == "testuser"));
        assert_eq!(
            store.find_user("testuser").await.unwrap().unwrap().password_hash,
            "h1"
        );
    }
}
