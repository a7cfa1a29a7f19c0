//! libSQL backend — async `EmailStore` implementation.
//!
//! Stores records in a single `emails` table with TEXT uuids and RFC 3339
//! timestamps. Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{EmailRecord, EmailStats, NewEmail};
use crate::store::traits::EmailStore;

/// libSQL email store.
///
/// A single connection is reused for all operations. `libsql::Connection`
/// is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Email store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS emails (
                    id TEXT PRIMARY KEY,
                    owner_id TEXT NOT NULL,
                    recipient TEXT NOT NULL,
                    subject TEXT NOT NULL,
                    body TEXT NOT NULL,
                    spam_score REAL NOT NULL DEFAULT 0,
                    delivered INTEGER NOT NULL DEFAULT 0,
                    sent_at TEXT,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_emails_owner ON emails(owner_id);
                CREATE INDEX IF NOT EXISTS idx_emails_created ON emails(created_at);",
            )
            .await
            .map_err(|e| StoreError::Query(format!("Migration failed: {e}")))?;

        debug!("Email store migrations complete");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a libsql Row to an EmailRecord.
///
/// Column order: 0:id, 1:owner_id, 2:recipient, 3:subject, 4:body,
/// 5:spam_score, 6:delivered, 7:sent_at, 8:created_at
fn row_to_record(row: &libsql::Row) -> Result<EmailRecord, StoreError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| StoreError::Serialization(format!("id column: {e}")))?;
    let owner_id: String = row
        .get(1)
        .map_err(|e| StoreError::Serialization(format!("owner_id column: {e}")))?;
    let recipient: String = row
        .get(2)
        .map_err(|e| StoreError::Serialization(format!("recipient column: {e}")))?;
    let subject: String = row
        .get(3)
        .map_err(|e| StoreError::Serialization(format!("subject column: {e}")))?;
    let body: String = row
        .get(4)
        .map_err(|e| StoreError::Serialization(format!("body column: {e}")))?;
    let spam_score: f64 = row
        .get(5)
        .map_err(|e| StoreError::Serialization(format!("spam_score column: {e}")))?;
    let delivered: i64 = row
        .get(6)
        .map_err(|e| StoreError::Serialization(format!("delivered column: {e}")))?;
    let sent_at: Option<String> = row.get(7).ok();
    let created_str: String = row
        .get(8)
        .map_err(|e| StoreError::Serialization(format!("created_at column: {e}")))?;

    Ok(EmailRecord {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| StoreError::Serialization(format!("invalid uuid {id_str}: {e}")))?,
        owner_id,
        recipient,
        subject,
        body,
        spam_score,
        delivered: delivered != 0,
        sent_at: sent_at.as_deref().map(parse_datetime),
        created_at: parse_datetime(&created_str),
    })
}

// ── EmailStore impl ─────────────────────────────────────────────────

#[async_trait]
impl EmailStore for LibSqlStore {
    async fn create_email(&self, new: &NewEmail) -> Result<EmailRecord, StoreError> {
        let record = EmailRecord {
            id: Uuid::new_v4(),
            owner_id: new.owner_id.clone(),
            recipient: new.recipient.clone(),
            subject: new.subject.clone(),
            body: new.body.clone(),
            spam_score: 0.0,
            delivered: false,
            sent_at: None,
            created_at: Utc::now(),
        };

        self.conn
            .execute(
                "INSERT INTO emails (id, owner_id, recipient, subject, body, spam_score, delivered, sent_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, NULL, ?6)",
                params![
                    record.id.to_string(),
                    record.owner_id.clone(),
                    record.recipient.clone(),
                    record.subject.clone(),
                    record.body.clone(),
                    record.created_at.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("insert email: {e}")))?;

        debug!(id = %record.id, owner = %record.owner_id, "Email record created");
        Ok(record)
    }

    async fn get_email(&self, id: Uuid) -> Result<Option<EmailRecord>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, owner_id, recipient, subject, body, spam_score, delivered, sent_at, created_at
                 FROM emails WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get email: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("get email row: {e}")))?
        {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_emails(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<EmailRecord>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, owner_id, recipient, subject, body, spam_score, delivered, sent_at, created_at
                 FROM emails WHERE owner_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3",
                params![owner_id, limit as i64, offset as i64],
            )
            .await
            .map_err(|e| StoreError::Query(format!("list emails: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("list emails row: {e}")))?
        {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    async fn update_spam_score(&self, id: Uuid, score: f64) -> Result<(), StoreError> {
        let affected = self
            .conn
            .execute(
                "UPDATE emails SET spam_score = ?1 WHERE id = ?2",
                params![score, id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("update spam score: {e}")))?;

        if affected == 0 {
            return Err(StoreError::NotFound { id });
        }
        debug!(id = %id, score, "Spam score persisted");
        Ok(())
    }

    async fn update_delivery_status(
        &self,
        id: Uuid,
        delivered: bool,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let affected = self
            .conn
            .execute(
                "UPDATE emails SET delivered = ?1, sent_at = ?2 WHERE id = ?3",
                params![
                    delivered as i64,
                    sent_at.map(|t| t.to_rfc3339()),
                    id.to_string()
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("update delivery status: {e}")))?;

        if affected == 0 {
            return Err(StoreError::NotFound { id });
        }
        debug!(id = %id, delivered, "Delivery status persisted");
        Ok(())
    }

    async fn email_stats(&self, owner_id: &str) -> Result<EmailStats, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN delivered = 1 THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN spam_score > 0.5 THEN 1 ELSE 0 END), 0),
                        COALESCE(AVG(spam_score), 0.0)
                 FROM emails WHERE owner_id = ?1",
                params![owner_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("email stats: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("email stats row: {e}")))?
            .ok_or_else(|| StoreError::Query("email stats returned no row".into()))?;

        let total: i64 = row
            .get(0)
            .map_err(|e| StoreError::Serialization(format!("stats total: {e}")))?;
        let delivered: i64 = row
            .get(1)
            .map_err(|e| StoreError::Serialization(format!("stats delivered: {e}")))?;
        let spam_count: i64 = row
            .get(2)
            .map_err(|e| StoreError::Serialization(format!("stats spam_count: {e}")))?;
        let avg_spam_score: f64 = row
            .get(3)
            .map_err(|e| StoreError::Serialization(format!("stats avg: {e}")))?;

        Ok(EmailStats {
            total: total as u64,
            delivered: delivered as u64,
            spam_count: spam_count as u64,
            avg_spam_score,
        })
    }
}
