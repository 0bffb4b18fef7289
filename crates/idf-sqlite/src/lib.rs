//! SQLite adapter (rusqlite).
//!
//! Implements every `idf-core` storage port on a single connection. All access
//! goes through one mutex on a blocking thread, so row writes are serialized
//! and never stall the async executor.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use idf_core::{
    domain::{JobId, UserId},
    errors::Error,
    model::{AdminRecord, BotStats, BroadcastJob, ChatRecord, JobStatus, UserProfile},
    ports::{AdminRegistry, Directory, JobLedger, RecipientStore},
    Result,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  user_id INTEGER PRIMARY KEY,
  username TEXT,
  first_name TEXT,
  last_name TEXT,
  lang_code TEXT,
  last_seen INTEGER
);

CREATE TABLE IF NOT EXISTS chats (
  chat_id INTEGER PRIMARY KEY,
  title TEXT,
  type TEXT,
  last_seen INTEGER
);

CREATE TABLE IF NOT EXISTS admins (
  user_id INTEGER PRIMARY KEY,
  added_by INTEGER,
  ts INTEGER
);

CREATE TABLE IF NOT EXISTS broadcasts (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  ts INTEGER,
  from_user INTEGER,
  text TEXT,
  sent_count INTEGER,
  status TEXT NOT NULL DEFAULT 'completed'
);
"#;

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

fn storage_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_err)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn).map_err(storage_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // Run sqlite work off the async executor, one caller at a time.
    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&guard).map_err(storage_err)
        })
        .await
        .map_err(|e| Error::Storage(format!("sqlite task join failed: {e}")))?
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;
    // Databases created before job status tracking: their jobs all ran to the end.
    add_column_if_missing(
        conn,
        "broadcasts",
        "status TEXT NOT NULL DEFAULT 'completed'",
    )?;
    Ok(())
}

fn add_column_if_missing(conn: &Connection, table: &str, coldef: &str) -> rusqlite::Result<()> {
    let sql = format!("ALTER TABLE {table} ADD COLUMN {coldef}");
    match conn.execute(&sql, []) {
        Ok(_) => {
            debug!(table, coldef, "added column");
            Ok(())
        }
        Err(e) if e.to_string().contains("duplicate column name") => Ok(()),
        Err(e) => Err(e),
    }
}

fn opt_text(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

fn read_user(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: UserId(row.get(0)?),
        username: opt_text(row.get(1)?),
        first_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        last_name: opt_text(row.get(3)?),
        language_code: opt_text(row.get(4)?),
        last_seen: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
    })
}

fn read_job(row: &Row<'_>) -> rusqlite::Result<BroadcastJob> {
    let status: String = row.get(5)?;
    Ok(BroadcastJob {
        id: JobId(row.get(0)?),
        created_at: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
        initiator: UserId(row.get::<_, Option<i64>>(2)?.unwrap_or(0)),
        payload: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        delivered: row.get::<_, Option<i64>>(4)?.unwrap_or(0).max(0) as u64,
        status: JobStatus::parse(&status).unwrap_or(JobStatus::Completed),
    })
}

const USER_COLUMNS: &str = "user_id, username, first_name, last_name, lang_code, last_seen";
const JOB_COLUMNS: &str = "id, ts, from_user, text, sent_count, status";

#[async_trait]
impl RecipientStore for SqliteStore {
    async fn list_all(&self) -> Result<Vec<UserId>> {
        self.call(|conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM users")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, i64>(0))?
                .map(|r| r.map(UserId))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }
}

#[async_trait]
impl JobLedger for SqliteStore {
    async fn create(&self, initiator: UserId, payload: &str, created_at: i64) -> Result<JobId> {
        let payload = payload.to_string();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO broadcasts (ts, from_user, text, sent_count, status) \
                 VALUES (?1, ?2, ?3, 0, 'pending')",
                params![created_at, initiator.0, payload],
            )?;
            Ok(JobId(conn.last_insert_rowid()))
        })
        .await
    }

    async fn finalize(&self, job: JobId, delivered: u64) -> Result<()> {
        let changed = self
            .call(move |conn| {
                conn.execute(
                    "UPDATE broadcasts SET sent_count = ?1, status = 'completed' WHERE id = ?2",
                    params![delivered as i64, job.0],
                )
            })
            .await?;
        if changed == 0 {
            return Err(Error::Storage(format!("broadcast job {job} does not exist")));
        }
        Ok(())
    }

    async fn get(&self, job: JobId) -> Result<Option<BroadcastJob>> {
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM broadcasts WHERE id = ?1"),
                params![job.0],
                read_job,
            )
            .optional()
        })
        .await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<BroadcastJob>> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM broadcasts ORDER BY id DESC LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map(params![limit as i64], read_job)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }
}

#[async_trait]
impl Directory for SqliteStore {
    async fn upsert_user(&self, user: UserProfile) -> Result<()> {
        self.call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO users \
                 (user_id, username, first_name, last_name, lang_code, last_seen) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id.0,
                    user.username.unwrap_or_default(),
                    user.first_name,
                    user.last_name.unwrap_or_default(),
                    user.language_code.unwrap_or_default(),
                    user.last_seen,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn upsert_chat(&self, chat: ChatRecord) -> Result<()> {
        self.call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO chats (chat_id, title, type, last_seen) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![chat.id.0, chat.title, chat.kind.as_str(), chat.last_seen],
            )?;
            Ok(())
        })
        .await
    }

    async fn recent_users(&self, limit: usize) -> Result<Vec<UserProfile>> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY last_seen DESC LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map(params![limit as i64], read_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn all_users(&self) -> Result<Vec<UserProfile>> {
        self.call(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users"))?;
            let rows = stmt
                .query_map([], read_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn stats(&self) -> Result<BotStats> {
        self.call(|conn| {
            let count = |table: &str| -> rusqlite::Result<u64> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get::<_, i64>(0)
                })
                .map(|n| n.max(0) as u64)
            };
            Ok(BotStats {
                users: count("users")?,
                chats: count("chats")?,
                broadcasts: count("broadcasts")?,
            })
        })
        .await
    }
}

#[async_trait]
impl AdminRegistry for SqliteStore {
    async fn add_admin(&self, user: UserId, added_by: UserId, added_at: i64) -> Result<()> {
        self.call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO admins (user_id, added_by, ts) VALUES (?1, ?2, ?3)",
                params![user.0, added_by.0, added_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove_admin(&self, user: UserId) -> Result<()> {
        self.call(move |conn| {
            conn.execute("DELETE FROM admins WHERE user_id = ?1", params![user.0])?;
            Ok(())
        })
        .await
    }

    async fn list_admins(&self) -> Result<Vec<AdminRecord>> {
        self.call(|conn| {
            let mut stmt = conn.prepare("SELECT user_id, added_by, ts FROM admins")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(AdminRecord {
                        user_id: UserId(row.get(0)?),
                        added_by: UserId(row.get::<_, Option<i64>>(1)?.unwrap_or(0)),
                        added_at: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn is_admin(&self, user: UserId) -> Result<bool> {
        self.call(move |conn| {
            conn.query_row(
                "SELECT 1 FROM admins WHERE user_id = ?1",
                params![user.0],
                |_| Ok(()),
            )
            .optional()
            .map(|row| row.is_some())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use idf_core::{domain::ChatId, model::ChatKind};

    fn user(id: i64, first: &str, last_seen: i64) -> UserProfile {
        UserProfile {
            id: UserId(id),
            username: Some(format!("u{id}")),
            first_name: first.to_string(),
            last_name: None,
            language_code: Some("en".to_string()),
            last_seen,
        }
    }

    #[tokio::test]
    async fn job_lifecycle_pending_to_completed() {
        let store = SqliteStore::open_in_memory().unwrap();

        let job = store.create(UserId(42), "Hello all", 1_000).await.unwrap();
        let rec = store.get(job).await.unwrap().unwrap();
        assert_eq!(rec.status, JobStatus::Pending);
        assert_eq!(rec.delivered, 0);
        assert_eq!(rec.initiator, UserId(42));
        assert_eq!(rec.payload, "Hello all");
        assert_eq!(rec.created_at, 1_000);

        store.finalize(job, 2).await.unwrap();
        let rec = store.get(job).await.unwrap().unwrap();
        assert_eq!(rec.status, JobStatus::Completed);
        assert_eq!(rec.delivered, 2);
    }

    #[tokio::test]
    async fn job_ids_are_monotonic_and_recent_is_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = store.create(UserId(1), "a", 1).await.unwrap();
        let b = store.create(UserId(1), "b", 2).await.unwrap();
        assert!(b > a);

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.iter().map(|j| j.id).collect::<Vec<_>>(), vec![b, a]);
        assert_eq!(store.recent(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn finalize_unknown_job_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.finalize(JobId(99), 1).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(store.get(JobId(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_refreshes_instead_of_duplicating() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_user(user(1, "Ada", 10)).await.unwrap();
        store.upsert_user(user(2, "Bob", 20)).await.unwrap();
        store.upsert_user(user(1, "Ada L.", 30)).await.unwrap();

        let mut ids = store.list_all().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec![UserId(1), UserId(2)]);

        let recent = store.recent_users(10).await.unwrap();
        assert_eq!(recent[0].id, UserId(1));
        assert_eq!(recent[0].first_name, "Ada L.");
        assert_eq!(recent[0].username.as_deref(), Some("u1"));
        assert_eq!(store.recent_users(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_optional_fields_read_back_as_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_user(UserProfile {
                id: UserId(5),
                username: None,
                first_name: "Eve".to_string(),
                last_name: None,
                language_code: None,
                last_seen: 1,
            })
            .await
            .unwrap();

        let all = store.all_users().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].username, None);
        assert_eq!(all[0].language_code, None);
    }

    #[tokio::test]
    async fn stats_count_every_table() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_user(user(1, "Ada", 1)).await.unwrap();
        store
            .upsert_chat(ChatRecord {
                id: ChatId(-100),
                title: "Ponies".to_string(),
                kind: ChatKind::Supergroup,
                last_seen: 1,
            })
            .await
            .unwrap();
        store.create(UserId(1), "hi", 1).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(
            stats,
            BotStats {
                users: 1,
                chats: 1,
                broadcasts: 1
            }
        );
    }

    #[tokio::test]
    async fn admin_registry_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_admin(UserId(5), UserId(1), 100).await.unwrap();
        assert!(store.is_admin(UserId(5)).await.unwrap());
        assert!(!store.is_admin(UserId(6)).await.unwrap());

        let admins = store.list_admins().await.unwrap();
        assert_eq!(
            admins,
            vec![AdminRecord {
                user_id: UserId(5),
                added_by: UserId(1),
                added_at: 100
            }]
        );

        store.remove_admin(UserId(5)).await.unwrap();
        assert!(!store.is_admin(UserId(5)).await.unwrap());
    }

    #[test]
    fn legacy_broadcasts_table_gains_status_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE broadcasts (
               id INTEGER PRIMARY KEY AUTOINCREMENT,
               ts INTEGER, from_user INTEGER, text TEXT, sent_count INTEGER
             );
             INSERT INTO broadcasts (ts, from_user, text, sent_count) VALUES (1, 42, 'old', 3);",
        )
        .unwrap();

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let job = conn
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM broadcasts WHERE id = 1"),
                [],
                read_job,
            )
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.delivered, 3);
    }

    #[tokio::test]
    async fn file_database_persists_across_reopen() {
        let path = std::env::temp_dir().join(format!("idf-store-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let job = {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert_user(user(1, "Ada", 1)).await.unwrap();
            store.create(UserId(1), "persist me", 1).await.unwrap()
        };

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.list_all().await.unwrap(), vec![UserId(1)]);
        assert_eq!(store.get(job).await.unwrap().unwrap().payload, "persist me");

        drop(store);
        let _ = std::fs::remove_file(&path);
    }
}
