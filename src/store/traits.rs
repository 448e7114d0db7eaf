//! `Database` trait: the typed get/set/delete port behind every piece of
//! local onboarding state.

use async_trait::async_trait;

use crate::error::DatabaseError;

/// Backend-agnostic key/value settings store, scoped per user.
///
/// Values are JSON. A stored value that cannot be decoded comes back as
/// `Some(Value::Null)` so callers can treat it as malformed and clear it.
#[async_trait]
pub trait Database: Send + Sync {
    /// Read a setting.
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or overwrite a setting.
    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Delete a setting. Returns whether a row was removed.
    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError>;
}
