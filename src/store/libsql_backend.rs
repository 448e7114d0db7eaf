//! libSQL backend implementing the async `Database` trait.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(backend.conn()).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(backend.conn()).await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT value FROM settings WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value_str: String = row.get(0).unwrap_or_else(|_| "null".to_string());
                let value: serde_json::Value =
                    serde_json::from_str(&value_str).unwrap_or(serde_json::Value::Null);
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_setting: {e}"))),
        }
    }

    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let value_str = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO settings (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![user_id, key, value_str, now],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;

        Ok(())
    }

    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute(
                "DELETE FROM settings WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_setting: {e}")))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn settings_crud() {
        let db = test_db().await;
        let value = serde_json::json!({"step": 4, "mode": "guided"});

        db.set_setting("local", "onboarding_progress", &value)
            .await
            .unwrap();

        let fetched = db
            .get_setting("local", "onboarding_progress")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched["step"], 4);
        assert_eq!(fetched["mode"], "guided");

        // Upsert
        let updated = serde_json::json!({"step": 5, "mode": "guided"});
        db.set_setting("local", "onboarding_progress", &updated)
            .await
            .unwrap();
        let fetched2 = db
            .get_setting("local", "onboarding_progress")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched2["step"], 5);

        let deleted = db.delete_setting("local", "onboarding_progress").await.unwrap();
        assert!(deleted);
        let gone = db.get_setting("local", "onboarding_progress").await.unwrap();
        assert!(gone.is_none());

        // Delete non-existent
        let again = db.delete_setting("local", "onboarding_progress").await.unwrap();
        assert!(!again);
    }

    #[tokio::test]
    async fn settings_user_isolation() {
        let db = test_db().await;

        db.set_setting("user1", "key", &serde_json::json!("val1"))
            .await
            .unwrap();
        db.set_setting("user2", "key", &serde_json::json!("val2"))
            .await
            .unwrap();

        let v1 = db.get_setting("user1", "key").await.unwrap().unwrap();
        let v2 = db.get_setting("user2", "key").await.unwrap().unwrap();
        assert_eq!(v1, "val1");
        assert_eq!(v2, "val2");
    }

    #[tokio::test]
    async fn corrupt_value_reads_as_null() {
        let db = test_db().await;
        db.conn()
            .execute(
                "INSERT INTO settings (user_id, key, value, updated_at) VALUES ('local', 'k', '{not json', 'now')",
                (),
            )
            .await
            .unwrap();

        let value = db.get_setting("local", "k").await.unwrap();
        assert_eq!(value, Some(serde_json::Value::Null));
    }

    #[tokio::test]
    async fn local_file_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("lifeos.db");

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.set_setting("local", "user_name", &serde_json::json!("Ada"))
                .await
                .unwrap();
        }

        let reopened = LibSqlBackend::new_local(&path).await.unwrap();
        let name = reopened.get_setting("local", "user_name").await.unwrap();
        assert_eq!(name, Some(serde_json::json!("Ada")));
    }
}
