//! CompletionPipeline: finalize the record, make it durable locally, then
//! forward it to the hosted backend on a best-effort basis.
//!
//! Ordering is fixed: local write, then remote attempt, then the caller's
//! completion callback. Only the local write can fail the pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::OnboardingConfig;
use crate::error::{DatabaseError, RemoteError};
use crate::store::Database;

use super::model::{OnboardingData, settings_keys};

/// Hosted persistence for finished onboarding records.
///
/// Both calls are idempotent upserts and safe to retry.
#[async_trait]
pub trait ProfileBackend: Send + Sync {
    async fn save_preferences(
        &self,
        user_id: &str,
        data: &OnboardingData,
    ) -> Result<(), RemoteError>;

    async fn save_profile_name(&self, user_id: &str, name: &str) -> Result<(), RemoteError>;
}

/// Receives the outcome of the best-effort remote save.
pub trait CompletionObserver: Send + Sync {
    fn remote_failed(&self, user_id: &str, error: &RemoteError);

    fn remote_saved(&self, _user_id: &str) {}
}

/// Default observer: failures become structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CompletionObserver for TracingObserver {
    fn remote_failed(&self, user_id: &str, error: &RemoteError) {
        if error.is_validation() {
            warn!(
                user_id,
                validation = true,
                "Hosted backend rejected onboarding record: {}",
                error
            );
        } else {
            warn!(
                user_id,
                validation = false,
                "Failed to save onboarding record remotely: {}",
                error
            );
        }
    }

    fn remote_saved(&self, user_id: &str) {
        debug!(user_id, "Onboarding record saved remotely");
    }
}

/// What happened to the remote copy.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    Saved,
    /// No backend or no user id configured.
    Skipped,
    Failed(RemoteError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionReport {
    pub data: OnboardingData,
    pub remote: RemoteOutcome,
}

/// Caller-supplied hook, invoked once with the finalized record.
pub type CompletionCallback = Box<dyn FnOnce(&OnboardingData) + Send + Sync>;

#[derive(Clone)]
pub struct CompletionPipeline {
    db: Arc<dyn Database>,
    backend: Option<Arc<dyn ProfileBackend>>,
    observer: Arc<dyn CompletionObserver>,
    local_user: String,
    remote_user_id: Option<String>,
    remote_timeout: Duration,
}

impl CompletionPipeline {
    pub fn new(
        db: Arc<dyn Database>,
        backend: Option<Arc<dyn ProfileBackend>>,
        observer: Arc<dyn CompletionObserver>,
        config: &OnboardingConfig,
    ) -> Self {
        Self {
            db,
            backend,
            observer,
            local_user: config.local_user.clone(),
            remote_user_id: config.remote_user_id.clone(),
            remote_timeout: config.remote_timeout,
        }
    }

    /// Finalize and persist `data`, then run the remote save and callback.
    ///
    /// Returns an error only when the local durability write fails; in that
    /// case neither the remote save nor the callback runs, and the callback
    /// stays in `on_complete` for the next attempt.
    pub async fn run(
        &self,
        data: OnboardingData,
        now: DateTime<Utc>,
        on_complete: &mut Option<CompletionCallback>,
    ) -> Result<CompletionReport, DatabaseError> {
        let pending = self.finalize(data, now, on_complete).await?;
        Ok(pending.finish().await)
    }

    /// Local phase: stamp the record and make it durable.
    ///
    /// The callback is taken out of `on_complete` only once the write has
    /// succeeded. The returned `PendingCompletion` owns everything the remote
    /// phase needs, so it can be awaited without holding the session.
    pub async fn finalize(
        &self,
        mut data: OnboardingData,
        now: DateTime<Utc>,
        on_complete: &mut Option<CompletionCallback>,
    ) -> Result<PendingCompletion, DatabaseError> {
        data.completed_at = Some(now);

        self.write_local(&data).await?;
        info!(mode = %data.setup_mode, "Onboarding completed and saved locally");

        Ok(PendingCompletion {
            pipeline: self.clone(),
            data,
            callback: on_complete.take(),
        })
    }

    /// Writes the record, the name and finally the `onboarded` flag. A failed
    /// write removes the keys already written, so a completed record never
    /// exists without the flag.
    async fn write_local(&self, data: &OnboardingData) -> Result<(), DatabaseError> {
        let record =
            serde_json::to_value(data).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let writes = [
            (settings_keys::ONBOARDING_DATA, record),
            (settings_keys::USER_NAME, Value::String(data.name.clone())),
            (settings_keys::ONBOARDED, Value::String("true".to_string())),
        ];

        for (done, (key, value)) in writes.iter().enumerate() {
            if let Err(e) = self.db.set_setting(&self.local_user, key, value).await {
                warn!(key = *key, "Local completion write failed: {}", e);
                self.roll_back(writes[..done].iter().map(|(key, _)| *key))
                    .await;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn roll_back(&self, keys: impl Iterator<Item = &'static str>) {
        for key in keys {
            if let Err(e) = self.db.delete_setting(&self.local_user, key).await {
                warn!(key, "Failed to roll back completion write: {}", e);
            }
        }
    }

    async fn save_remote(&self, data: &OnboardingData) -> RemoteOutcome {
        let (Some(backend), Some(user_id)) = (&self.backend, &self.remote_user_id) else {
            debug!("No hosted backend configured; skipping remote save");
            return RemoteOutcome::Skipped;
        };

        let attempt = async {
            backend.save_preferences(user_id, data).await?;
            backend.save_profile_name(user_id, &data.name).await
        };

        let result = match tokio::time::timeout(self.remote_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(self.remote_timeout)),
        };

        match result {
            Ok(()) => {
                self.observer.remote_saved(user_id);
                RemoteOutcome::Saved
            }
            Err(e) => {
                self.observer.remote_failed(user_id, &e);
                RemoteOutcome::Failed(e)
            }
        }
    }
}

/// A record that is durable locally and still owes its remote save and
/// callback.
pub struct PendingCompletion {
    pipeline: CompletionPipeline,
    data: OnboardingData,
    callback: Option<CompletionCallback>,
}

impl PendingCompletion {
    pub fn data(&self) -> &OnboardingData {
        &self.data
    }

    /// Remote attempt, then the callback.
    pub async fn finish(self) -> CompletionReport {
        let remote = self.pipeline.save_remote(&self.data).await;

        if let Some(callback) = self.callback {
            callback(&self.data);
        }

        CompletionReport {
            data: self.data,
            remote,
        }
    }
}

/// Whether onboarding has finished for `user_id`, as the app shell sees it.
pub async fn is_onboarded(db: &dyn Database, user_id: &str) -> bool {
    match db.get_setting(user_id, settings_keys::ONBOARDED).await {
        Ok(Some(Value::String(flag))) => flag == "true",
        Ok(Some(Value::Bool(flag))) => flag,
        Ok(_) => false,
        Err(e) => {
            warn!("Failed to read onboarded flag: {}", e);
            false
        }
    }
}

/// The finalized record written by the last completion, if any.
pub async fn load_completed(db: &dyn Database, user_id: &str) -> Option<OnboardingData> {
    let value = db
        .get_setting(user_id, settings_keys::ONBOARDING_DATA)
        .await
        .ok()
        .flatten()?;
    serde_json::from_value(value).ok()
}
