//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Tunables for the onboarding flow.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Saved progress older than this is discarded on restore.
    pub progress_ttl: Duration,
    /// Saved progress at or below this step index is not worth resuming.
    pub resume_floor_step: usize,
    /// Maximum number of automation templates enabled at once.
    pub max_automations: usize,
    /// Upper bound on the best-effort remote save during completion.
    pub remote_timeout: Duration,
    /// Settings-table user id for the local durable channel.
    pub local_user: String,
    /// Hosted-backend user id. Remote save is skipped when unset.
    pub remote_user_id: Option<String>,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            progress_ttl: Duration::from_secs(24 * 60 * 60),
            resume_floor_step: 2,
            max_automations: 3,
            remote_timeout: Duration::from_secs(10),
            local_user: "local".to_string(),
            remote_user_id: None,
        }
    }
}

/// Connection details for the hosted persistence backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: SecretString,
}

/// Process-level configuration for the binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub backend: Option<BackendConfig>,
    pub onboarding: OnboardingConfig,
}

impl AppConfig {
    /// Read configuration from `LIFEOS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = std::env::var("LIFEOS_DB_PATH")
            .unwrap_or_else(|_| "./data/lifeos.db".to_string())
            .into();

        let port = match std::env::var("LIFEOS_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "LIFEOS_PORT".to_string(),
                message: format!("{raw:?} is not a valid port"),
            })?,
            Err(_) => 8080,
        };

        let backend = match std::env::var("LIFEOS_BACKEND_URL") {
            Ok(base_url) => {
                let api_key = std::env::var("LIFEOS_BACKEND_KEY")
                    .map_err(|_| ConfigError::MissingEnvVar("LIFEOS_BACKEND_KEY".to_string()))?;
                Some(BackendConfig {
                    base_url: base_url.trim_end_matches('/').to_string(),
                    api_key: SecretString::from(api_key),
                })
            }
            Err(_) => None,
        };

        let onboarding = OnboardingConfig {
            remote_user_id: std::env::var("LIFEOS_USER_ID").ok().filter(|s| !s.is_empty()),
            ..Default::default()
        };

        Ok(Self {
            db_path,
            port,
            backend,
            onboarding,
        })
    }
}
