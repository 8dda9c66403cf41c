//! Version-tracked database migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones in order.

use libsql::Connection;

use crate::error::PersistenceError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: r#"
        CREATE TABLE IF NOT EXISTS saved_messages (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            content TEXT NOT NULL,
            recipient_name TEXT NOT NULL,
            recipient_id TEXT,
            relationship TEXT NOT NULL,
            intent TEXT NOT NULL,
            tone TEXT NOT NULL,
            intensity INTEGER NOT NULL,
            insights TEXT NOT NULL DEFAULT '[]',
            message_category TEXT NOT NULL DEFAULT 'other',
            message_format TEXT NOT NULL DEFAULT 'text',
            message_intention TEXT NOT NULL DEFAULT '',
            request TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_saved_messages_user
            ON saved_messages(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_saved_messages_category
            ON saved_messages(user_id, message_category);
        CREATE INDEX IF NOT EXISTS idx_saved_messages_format
            ON saved_messages(user_id, message_format);
    "#,
}];

/// Run all pending migrations against the given connection.
///
/// Creates the `_migrations` table if it doesn't exist.
pub async fn run_migrations(conn: &Connection) -> Result<(), PersistenceError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| PersistenceError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                PersistenceError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            seed_version(conn, migration.version, migration.name).await?;
        }
    }

    tracing::info!(
        version = get_current_version(conn).await?,
        "Database migrations complete"
    );
    Ok(())
}

/// Get the highest applied migration version, or 0 if none.
async fn get_current_version(conn: &Connection) -> Result<i64, PersistenceError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| {
            PersistenceError::Migration(format!("Failed to query migration version: {e}"))
        })?;

    let row = rows.next().await.map_err(|e| {
        PersistenceError::Migration(format!("Failed to read migration version: {e}"))
    })?;

    match row {
        Some(row) => row.get::<i64>(0).map_err(|e| {
            PersistenceError::Migration(format!("Failed to parse migration version: {e}"))
        }),
        None => Ok(0),
    }
}

/// Insert a version record into `_migrations`.
async fn seed_version(conn: &Connection, version: i64, name: &str) -> Result<(), PersistenceError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| {
        PersistenceError::Migration(format!("Failed to record migration V{version}: {e}"))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_conn() -> Connection {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap();
        db.connect().unwrap()
    }

    async fn column_names(conn: &Connection, table: &str) -> Vec<String> {
        let mut rows = conn
            .query(&format!("PRAGMA table_info({table})"), ())
            .await
            .unwrap();
        let mut names = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            names.push(row.get::<String>(1).unwrap());
        }
        names
    }

    #[tokio::test]
    async fn migrations_create_message_table() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        let columns = column_names(&conn, "saved_messages").await;
        for expected in [
            "id",
            "user_id",
            "content",
            "recipient_name",
            "recipient_id",
            "relationship",
            "intent",
            "tone",
            "intensity",
            "insights",
            "created_at",
            "message_category",
            "message_format",
            "message_intention",
            "request",
        ] {
            assert!(
                columns.iter().any(|c| c == expected),
                "column '{expected}' should exist"
            );
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        run_migrations(&conn).await.unwrap();

        let version = get_current_version(&conn).await.unwrap();
        assert_eq!(version, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn rerun_keeps_existing_rows() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        conn.execute(
            "INSERT INTO saved_messages (id, user_id, content, recipient_name, relationship,
                intent, tone, intensity, created_at)
             VALUES ('m1', 'u1', 'hi', 'Sam', 'sister', 'gratitude', 'warm', 3, '2026-01-01T00:00:00Z')",
            (),
        )
        .await
        .unwrap();

        run_migrations(&conn).await.unwrap();

        let mut rows = conn
            .query(
                "SELECT message_category, message_format, request FROM saved_messages WHERE id = 'm1'",
                (),
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "other");
        assert_eq!(row.get::<String>(1).unwrap(), "text");
        assert!(row.get::<Option<String>>(2).unwrap().is_none());
    }

    #[tokio::test]
    async fn version_tracking() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        let mut rows = conn
            .query("SELECT version, name FROM _migrations ORDER BY version", ())
            .await
            .unwrap();
        for migration in MIGRATIONS {
            let row = rows.next().await.unwrap().unwrap();
            assert_eq!(row.get::<i64>(0).unwrap(), migration.version);
            assert_eq!(row.get::<String>(1).unwrap(), migration.name);
        }
        assert!(rows.next().await.unwrap().is_none());
    }
}
