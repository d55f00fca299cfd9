//! Session Store
//!
//! Durable CRUD for an ordered collection of session records under one
//! storage namespace. One store instance serves one session kind; the
//! scoping and execution managers each own their own namespace.
//!
//! `upsert` is a true atomic primitive on (namespace, id) rather than a
//! load-all/save-all round trip, so interleaved writers (an explicit save
//! racing an auto-save) can no longer drop each other's records.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::models::{ExecutionSession, ScopingSession};
use crate::storage::database::{Database, DbPool};
use crate::utils::error::{AppError, AppResult};

/// Namespace for persisted scoping sessions
pub const SCOPING_NAMESPACE: &str = "audit-scope-sessions";

/// Namespace for persisted execution sessions
pub const EXECUTION_NAMESPACE: &str = "audit-execution-sessions";

/// A record the store can persist: identity plus ordering timestamp
pub trait SessionRecord: Clone + Send + Serialize + DeserializeOwned + 'static {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn last_updated(&self) -> DateTime<Utc>;
}

impl SessionRecord for ScopingSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}

impl SessionRecord for ExecutionSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}

/// SQLite-backed store for one namespace of session records
pub struct SessionStore<S> {
    pool: DbPool,
    namespace: String,
    _marker: PhantomData<fn() -> S>,
}

impl<S: SessionRecord> SessionStore<S> {
    /// Create a store bound to a namespace
    pub fn new(db: &Database, namespace: impl Into<String>) -> Self {
        Self {
            pool: db.pool().clone(),
            namespace: namespace.into(),
            _marker: PhantomData,
        }
    }

    /// The namespace this store reads and writes
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Load every session in the namespace, most-recently-updated first.
    ///
    /// Never fails: a missing table, an unreadable database, or a corrupt
    /// payload degrades to "no sessions" (corrupt rows are skipped with a
    /// warning). History UIs rely on the descending order without
    /// re-sorting.
    pub async fn load_all(&self) -> Vec<S> {
        let pool = self.pool.clone();
        let namespace = self.namespace.clone();

        let rows = tokio::task::spawn_blocking(move || -> AppResult<Vec<String>> {
            let conn = pool
                .get()
                .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))?;

            let mut stmt = conn.prepare(
                "SELECT payload FROM sessions
                 WHERE namespace = ?1
                 ORDER BY last_updated DESC",
            )?;
            let payloads = stmt
                .query_map(params![namespace], |row| row.get::<_, String>(0))?
                .filter_map(|r| r.ok())
                .collect();
            Ok(payloads)
        })
        .await
        .map_err(|e| AppError::internal(format!("Task join error: {}", e)))
        .and_then(|r| r);

        let payloads = match rows {
            Ok(payloads) => payloads,
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "session load failed, returning empty list");
                return Vec::new();
            }
        };

        payloads
            .iter()
            .filter_map(|payload| match serde_json::from_str::<S>(payload) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(namespace = %self.namespace, error = %e, "skipping corrupt session record");
                    None
                }
            })
            .collect()
    }

    /// Replace the namespace's whole collection in one transaction.
    ///
    /// Write failures are surfaced to the caller; a user who believes a
    /// save succeeded must not be wrong silently.
    pub async fn save_all(&self, sessions: &[S]) -> AppResult<()> {
        let pool = self.pool.clone();
        let namespace = self.namespace.clone();
        let rows: Vec<(String, String, String, String)> = sessions
            .iter()
            .map(|s| {
                Ok((
                    s.id().to_string(),
                    s.name().to_string(),
                    s.last_updated().to_rfc3339(),
                    serde_json::to_string(s)?,
                ))
            })
            .collect::<AppResult<_>>()?;

        tokio::task::spawn_blocking(move || -> AppResult<()> {
            let mut conn = pool
                .get()
                .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))?;

            let tx = conn.transaction()?;
            tx.execute("DELETE FROM sessions WHERE namespace = ?1", params![namespace])?;
            for (id, name, last_updated, payload) in rows {
                tx.execute(
                    "INSERT INTO sessions (namespace, id, name, last_updated, payload)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![namespace, id, name, last_updated, payload],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::internal(format!("Task join error: {}", e)))?
    }

    /// Insert or replace one session by id, atomically
    pub async fn upsert(&self, session: &S) -> AppResult<()> {
        let pool = self.pool.clone();
        let namespace = self.namespace.clone();
        let id = session.id().to_string();
        let name = session.name().to_string();
        let last_updated = session.last_updated().to_rfc3339();
        let payload = serde_json::to_string(session)?;

        tokio::task::spawn_blocking(move || -> AppResult<()> {
            let conn = pool
                .get()
                .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))?;

            conn.execute(
                "INSERT OR REPLACE INTO sessions (namespace, id, name, last_updated, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![namespace, id, name, last_updated, payload],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::internal(format!("Task join error: {}", e)))?
    }

    /// Remove one session by id and return the remaining sessions.
    ///
    /// Deleting an id that is not present leaves the collection unchanged.
    pub async fn delete(&self, id: &str) -> AppResult<Vec<S>> {
        let pool = self.pool.clone();
        let namespace = self.namespace.clone();
        let id = id.to_string();

        tokio::task::spawn_blocking(move || -> AppResult<()> {
            let conn = pool
                .get()
                .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))?;

            conn.execute(
                "DELETE FROM sessions WHERE namespace = ?1 AND id = ?2",
                params![namespace, id],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::internal(format!("Task join error: {}", e)))??;

        Ok(self.load_all().await)
    }
}

impl<S> std::fmt::Debug for SessionStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scoping_session(id: &str, name: &str, updated_hour: u32) -> ScopingSession {
        let ts = Utc.with_ymd_and_hms(2026, 5, 1, updated_hour, 0, 0).unwrap();
        let mut s = ScopingSession::empty(id, ts);
        s.name = name.to_string();
        s.scope_text = format!("scope for {}", name);
        s
    }

    fn test_store() -> (Database, SessionStore<ScopingSession>) {
        let db = Database::new_in_memory().unwrap();
        let store = SessionStore::new(&db, SCOPING_NAMESPACE);
        (db, store)
    }

    #[tokio::test]
    async fn test_load_all_empty_namespace() {
        let (_db, store) = test_store();
        assert!(store.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_all_roundtrip_sorted_descending() {
        let (_db, store) = test_store();

        let sessions = vec![
            scoping_session("s1", "oldest", 8),
            scoping_session("s2", "newest", 14),
            scoping_session("s3", "middle", 11),
        ];
        store.save_all(&sessions).await.unwrap();

        let loaded = store.load_all().await;
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].id, "s2");
        assert_eq!(loaded[1].id, "s3");
        assert_eq!(loaded[2].id, "s1");

        // Timestamp fields come back as equivalent time values
        assert_eq!(loaded[2].last_updated, sessions[0].last_updated);
        assert_eq!(loaded[2].created_at, sessions[0].created_at);
        assert_eq!(loaded[2].scope_text, "scope for oldest");
    }

    #[tokio::test]
    async fn test_save_all_replaces_collection() {
        let (_db, store) = test_store();

        store
            .save_all(&[scoping_session("s1", "a", 9), scoping_session("s2", "b", 10)])
            .await
            .unwrap();
        store.save_all(&[scoping_session("s3", "c", 11)]).await.unwrap();

        let loaded = store.load_all().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "s3");
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_replaces() {
        let (_db, store) = test_store();

        let mut session = scoping_session("s1", "first name", 9);
        store.upsert(&session).await.unwrap();

        session.name = "second name".into();
        session.last_updated = Utc.with_ymd_and_hms(2026, 5, 1, 15, 0, 0).unwrap();
        store.upsert(&session).await.unwrap();

        let loaded = store.load_all().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "second name");
    }

    #[tokio::test]
    async fn test_interleaved_upserts_both_survive() {
        // The formerly racy interleaving: a manual save and an auto-save
        // issued without awaiting each other. With an atomic per-id upsert
        // neither write can drop the other.
        let (_db, store) = test_store();

        let manual = scoping_session("manual", "named by user", 9);
        let auto = scoping_session("auto", "Auto-saved: Quarterly Audit", 10);

        let (a, b) = tokio::join!(store.upsert(&manual), store.upsert(&auto));
        a.unwrap();
        b.unwrap();

        let loaded = store.load_all().await;
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one() {
        let (_db, store) = test_store();

        store
            .save_all(&[
                scoping_session("s1", "a", 9),
                scoping_session("s2", "b", 10),
                scoping_session("s3", "c", 11),
            ])
            .await
            .unwrap();

        let remaining = store.delete("s2").await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|s| s.id != "s2"));

        let unchanged = store.delete("nonexistent").await.unwrap();
        assert_eq!(unchanged.len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_payload_skipped_on_load() {
        let (db, store) = test_store();

        store.upsert(&scoping_session("good", "a", 9)).await.unwrap();
        {
            let conn = db.pool().get().unwrap();
            conn.execute(
                "INSERT INTO sessions (namespace, id, name, last_updated, payload)
                 VALUES (?1, 'bad', 'corrupt', '2026-05-01T12:00:00+00:00', '{not json')",
                params![SCOPING_NAMESPACE],
            )
            .unwrap();
        }

        let loaded = store.load_all().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "good");
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let db = Database::new_in_memory().unwrap();
        let scoping: SessionStore<ScopingSession> = SessionStore::new(&db, SCOPING_NAMESPACE);
        let other: SessionStore<ScopingSession> = SessionStore::new(&db, EXECUTION_NAMESPACE);

        scoping.upsert(&scoping_session("s1", "a", 9)).await.unwrap();

        assert_eq!(scoping.load_all().await.len(), 1);
        assert!(other.load_all().await.is_empty());
    }
}
