//! libSQL backend for saved messages.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::generation::types::{GenerationRequest, GenerationResult};

use super::migrations;
use super::model::{MessageFilter, MessageMetadata, PersistedMessageId, SavedMessage};
use super::traits::{MessageStore, ResultPersister};

/// libSQL message store.
///
/// Holds a single connection reused for all operations.
pub struct LibSqlMessageStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlMessageStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| {
                PersistenceError::Connection(format!("Failed to open libSQL database: {e}"))
            })?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Message store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, PersistenceError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                PersistenceError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, PersistenceError> {
        let conn = db.connect().map_err(|e| {
            PersistenceError::Connection(format!("Failed to create connection: {e}"))
        })?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

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

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Blank filter values match everything.
fn filter_value(s: Option<&String>) -> libsql::Value {
    opt_text(s.map(|s| s.trim()).filter(|s| !s.is_empty()))
}

const MESSAGE_COLUMNS: &str = "id, user_id, content, recipient_name, recipient_id, relationship, \
     intent, tone, intensity, insights, message_category, message_format, message_intention, \
     request, created_at";

fn row_to_message(row: &libsql::Row) -> Result<SavedMessage, PersistenceError> {
    let field = |name: &str, e: libsql::Error| {
        PersistenceError::Query(format!("saved_messages.{name}: {e}"))
    };

    let id: String = row.get(0).map_err(|e| field("id", e))?;
    let insights_json: String = row.get(9).map_err(|e| field("insights", e))?;
    let request_json: Option<String> = row.get(13).map_err(|e| field("request", e))?;
    let created_str: String = row.get(14).map_err(|e| field("created_at", e))?;
    let intensity: i64 = row.get(8).map_err(|e| field("intensity", e))?;

    let insights: Vec<String> = serde_json::from_str(&insights_json).unwrap_or_else(|e| {
        warn!(id = %id, error = %e, "Unreadable insights column, treating as empty");
        Vec::new()
    });

    let request = request_json.and_then(|json| {
        serde_json::from_str::<GenerationRequest>(&json)
            .map_err(|e| warn!(id = %id, error = %e, "Unreadable request column"))
            .ok()
    });

    Ok(SavedMessage {
        user_id: row.get(1).map_err(|e| field("user_id", e))?,
        content: row.get(2).map_err(|e| field("content", e))?,
        recipient_name: row.get(3).map_err(|e| field("recipient_name", e))?,
        recipient_id: row.get(4).map_err(|e| field("recipient_id", e))?,
        relationship: row.get(5).map_err(|e| field("relationship", e))?,
        intent: row.get(6).map_err(|e| field("intent", e))?,
        tone: row.get(7).map_err(|e| field("tone", e))?,
        intensity: intensity.clamp(0, u8::MAX as i64) as u8,
        insights,
        message_category: row.get(10).map_err(|e| field("message_category", e))?,
        message_format: row.get(11).map_err(|e| field("message_format", e))?,
        message_intention: row.get(12).map_err(|e| field("message_intention", e))?,
        request,
        created_at: parse_datetime(&created_str),
        id: PersistedMessageId(id),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl ResultPersister for LibSqlMessageStore {
    async fn save(
        &self,
        user_id: &str,
        result: &GenerationResult,
        metadata: &MessageMetadata,
    ) -> Result<PersistedMessageId, PersistenceError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let insights = serde_json::to_string(&result.insights)
            .map_err(|e| PersistenceError::Serialization(format!("insights: {e}")))?;
        let request = serde_json::to_string(&metadata.request)
            .map_err(|e| PersistenceError::Serialization(format!("request: {e}")))?;

        self.conn()
            .execute(
                "INSERT INTO saved_messages (id, user_id, content, recipient_name, recipient_id,
                    relationship, intent, tone, intensity, insights, message_category,
                    message_format, message_intention, request, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    id.clone(),
                    user_id,
                    result.content.as_str(),
                    metadata.recipient_name.as_str(),
                    opt_text(metadata.recipient_id.as_deref()),
                    metadata.relationship.as_str(),
                    metadata.intent.as_str(),
                    metadata.tone.as_str(),
                    metadata.intensity as i64,
                    insights,
                    metadata.message_category.as_str(),
                    metadata.message_format.as_str(),
                    metadata.message_intention.as_str(),
                    request,
                    now,
                ],
            )
            .await
            .map_err(|e| PersistenceError::Query(format!("save_message: {e}")))?;

        debug!(id = %id, user_id = user_id, "Message saved");
        Ok(PersistedMessageId(id))
    }
}

#[async_trait]
impl MessageStore for LibSqlMessageStore {
    async fn get_message(
        &self,
        user_id: &str,
        id: &PersistedMessageId,
    ) -> Result<Option<SavedMessage>, PersistenceError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {MESSAGE_COLUMNS} FROM saved_messages WHERE id = ?1 AND user_id = ?2"),
                params![id.0.as_str(), user_id],
            )
            .await
            .map_err(|e| PersistenceError::Query(format!("get_message: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_message(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(PersistenceError::Query(format!("get_message: {e}"))),
        }
    }

    async fn list_messages(
        &self,
        user_id: &str,
        filter: &MessageFilter,
    ) -> Result<Vec<SavedMessage>, PersistenceError> {
        let limit = sql_limit(filter.limit);
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM saved_messages
                     WHERE user_id = ?1
                       AND (?2 IS NULL OR message_category = ?2)
                       AND (?3 IS NULL OR message_format = ?3)
                       AND (?4 IS NULL OR lower(message_intention) = lower(?4))
                     ORDER BY created_at DESC
                     LIMIT ?5"
                ),
                params![
                    user_id,
                    filter_value(filter.category.as_ref()),
                    filter_value(filter.format.as_ref()),
                    filter_value(filter.intention.as_ref()),
                    limit,
                ],
            )
            .await
            .map_err(|e| PersistenceError::Query(format!("list_messages: {e}")))?;

        let mut messages = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| PersistenceError::Query(format!("list_messages: {e}")))?
        {
            match row_to_message(&row) {
                Ok(msg) => messages.push(msg),
                Err(e) => warn!("Skipping saved message row: {e}"),
            }
        }
        Ok(messages)
    }
}

/// LIMIT value for an optional row cap. SQLite treats a negative LIMIT as
/// unbounded, so large caps saturate instead of wrapping.
fn sql_limit(limit: Option<usize>) -> i64 {
    match limit {
        Some(limit) => i64::try_from(limit).unwrap_or(i64::MAX),
        None => -1,
    }
}
