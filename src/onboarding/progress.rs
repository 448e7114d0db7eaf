//! Saved onboarding progress, the resumable checkpoint.
//!
//! Stored in the `settings` table under key `"onboarding_progress"` inside a
//! versioned envelope. Nothing here ever returns an error to the caller: a
//! checkpoint that cannot be read is the same as no checkpoint.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OnboardingConfig;
use crate::store::Database;

use super::model::{OnboardingData, SetupMode, settings_keys};
use super::steps::StepSequencer;

const PROGRESS_VERSION: u32 = 1;

/// A resumable checkpoint: where the user was, in which mode, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedProgress {
    pub step: usize,
    pub mode: SetupMode,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Answers collected so far.
    #[serde(default)]
    pub data: OnboardingData,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedProgress {
    version: u32,
    #[serde(flatten)]
    progress: SavedProgress,
}

/// Reads and writes the single progress slot on the local durable channel.
pub struct ProgressStore {
    db: Arc<dyn Database>,
    user_id: String,
    ttl: Duration,
    floor_step: usize,
}

impl ProgressStore {
    pub fn new(db: Arc<dyn Database>, config: &OnboardingConfig) -> Self {
        Self {
            db,
            user_id: config.local_user.clone(),
            ttl: config.progress_ttl,
            floor_step: config.resume_floor_step,
        }
    }

    /// Overwrite the checkpoint. Failures are logged, not returned.
    pub async fn save(&self, progress: &SavedProgress) {
        let envelope = PersistedProgress {
            version: PROGRESS_VERSION,
            progress: progress.clone(),
        };
        let value = match serde_json::to_value(&envelope) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to serialize onboarding progress: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .db
            .set_setting(&self.user_id, settings_keys::ONBOARDING_PROGRESS, &value)
            .await
        {
            warn!("Failed to persist onboarding progress: {}", e);
            return;
        }
        debug!(step = progress.step, mode = %progress.mode, "Saved onboarding progress");
    }

    /// Read the checkpoint, structurally validated.
    ///
    /// A corrupt, outdated or out-of-range payload is cleared and reported
    /// as absent.
    pub async fn restore(&self) -> Option<SavedProgress> {
        let value = match self
            .db
            .get_setting(&self.user_id, settings_keys::ONBOARDING_PROGRESS)
            .await
        {
            Ok(Some(v)) => v,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read onboarding progress: {}", e);
                return None;
            }
        };

        let envelope: PersistedProgress = match serde_json::from_value(value) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Discarding malformed onboarding progress: {}", e);
                self.clear().await;
                return None;
            }
        };

        if envelope.version != PROGRESS_VERSION {
            warn!(
                version = envelope.version,
                "Discarding onboarding progress with unsupported version"
            );
            self.clear().await;
            return None;
        }

        let progress = envelope.progress;
        if progress.step >= StepSequencer::len(progress.mode) {
            warn!(
                step = progress.step,
                mode = %progress.mode,
                "Discarding onboarding progress pointing past the end of its mode"
            );
            self.clear().await;
            return None;
        }

        Some(progress)
    }

    /// Read the checkpoint only if it is worth offering to resume.
    ///
    /// Stale or too-early checkpoints are deleted as soon as they are seen.
    pub async fn restore_fresh(&self, now: DateTime<Utc>) -> Option<SavedProgress> {
        let progress = self.restore().await?;
        if self.is_fresh(&progress, now) {
            return Some(progress);
        }
        debug!(
            step = progress.step,
            timestamp = progress.timestamp,
            "Discarding stale onboarding progress"
        );
        self.clear().await;
        None
    }

    /// `0 <= now - timestamp < ttl` and the user got past the introduction.
    ///
    /// A checkpoint stamped in the future (clock moved backwards) is stale.
    pub fn is_fresh(&self, progress: &SavedProgress, now: DateTime<Utc>) -> bool {
        let age_ms = now.timestamp_millis().saturating_sub(progress.timestamp);
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        (0..ttl_ms).contains(&age_ms) && progress.step > self.floor_step
    }

    /// Remove the checkpoint. Safe to call when there is none.
    pub async fn clear(&self) {
        if let Err(e) = self
            .db
            .delete_setting(&self.user_id, settings_keys::ONBOARDING_PROGRESS)
            .await
        {
            warn!("Failed to clear onboarding progress: {}", e);
        }
    }
}
