//! Hosted profile backend over a PostgREST-style REST API.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::BackendConfig;
use crate::error::RemoteError;

use super::completion::ProfileBackend;
use super::model::{
    AssistantStyle, AutonomyLevel, EnergyPattern, FocusWindow, NotificationLevel, OnboardingData,
    SetupMode, Tone, VoiceSettings, WorkStyle,
};
use super::signals::CognitiveDiscoverySignals;

/// Row shape of the `user_preferences` table.
#[derive(Debug, Serialize)]
struct PreferencesRow<'a> {
    user_id: &'a str,
    setup_mode: SetupMode,
    assistant_style: AssistantStyle,
    tone: Tone,
    autonomy_level: AutonomyLevel,
    voice: &'a VoiceSettings,
    peak_focus: FocusWindow,
    energy_pattern: EnergyPattern,
    work_style: WorkStyle,
    notification_level: NotificationLevel,
    goals: &'a [String],
    automations: &'a [String],
    integrations: &'a [String],
    cognitive_signals: &'a CognitiveDiscoverySignals,
    completed_at: Option<String>,
}

impl<'a> PreferencesRow<'a> {
    fn new(user_id: &'a str, data: &'a OnboardingData) -> Self {
        Self {
            user_id,
            setup_mode: data.setup_mode,
            assistant_style: data.assistant_style,
            tone: data.tone,
            autonomy_level: data.autonomy_level,
            voice: &data.voice,
            peak_focus: data.peak_focus,
            energy_pattern: data.energy_pattern,
            work_style: data.work_style,
            notification_level: data.notification_level,
            goals: &data.goals,
            automations: &data.automations,
            integrations: &data.integrations,
            cognitive_signals: &data.cognitive_signals,
            completed_at: data.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

pub struct HostedProfileBackend {
    base_url: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl HostedProfileBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.api_key.expose_secret();
        request.header("apikey", key).bearer_auth(key)
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<(), RemoteError> {
        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| RemoteError::Request {
                operation: operation.to_string(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(RemoteError::Rejected {
            operation: operation.to_string(),
            status,
            body,
        })
    }
}

#[async_trait]
impl ProfileBackend for HostedProfileBackend {
    async fn save_preferences(
        &self,
        user_id: &str,
        data: &OnboardingData,
    ) -> Result<(), RemoteError> {
        let request = self
            .client
            .post(self.rest_url("user_preferences"))
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&PreferencesRow::new(user_id, data));
        self.send("save_preferences", request).await
    }

    async fn save_profile_name(&self, user_id: &str, name: &str) -> Result<(), RemoteError> {
        let request = self
            .client
            .patch(self.rest_url("profiles"))
            .query(&[("id", format!("eq.{user_id}"))])
            .json(&serde_json::json!({ "full_name": name }));
        self.send("save_profile_name", request).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::Json;
    use axum::Router;
    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{patch, post};
    use serde_json::Value;

    use super::*;

    #[derive(Debug, Clone)]
    struct Captured {
        path: &'static str,
        query: HashMap<String, String>,
        apikey: Option<String>,
        body: Value,
    }

    type Log = Arc<Mutex<Vec<Captured>>>;

    async fn spawn_fake_backend(status: StatusCode) -> (String, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        async fn record(
            path: &'static str,
            log: &Log,
            query: HashMap<String, String>,
            headers: &HeaderMap,
            body: Value,
        ) {
            log.lock().unwrap().push(Captured {
                path,
                query,
                apikey: headers
                    .get("apikey")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from),
                body,
            });
        }

        let app = Router::new()
            .route(
                "/rest/v1/user_preferences",
                post(
                    move |State(log): State<Log>,
                          Query(q): Query<HashMap<String, String>>,
                          headers: HeaderMap,
                          Json(body): Json<Value>| async move {
                        record("user_preferences", &log, q, &headers, body).await;
                        status
                    },
                ),
            )
            .route(
                "/rest/v1/profiles",
                patch(
                    move |State(log): State<Log>,
                          Query(q): Query<HashMap<String, String>>,
                          headers: HeaderMap,
                          Json(body): Json<Value>| async move {
                        record("profiles", &log, q, &headers, body).await;
                        status
                    },
                ),
            )
            .with_state(Arc::clone(&log));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), log)
    }

    fn backend_for(base_url: String) -> HostedProfileBackend {
        HostedProfileBackend::new(&BackendConfig {
            base_url,
            api_key: SecretString::from("test-key".to_string()),
        })
    }

    #[tokio::test]
    async fn save_preferences_upserts_row() {
        let (url, log) = spawn_fake_backend(StatusCode::CREATED).await;
        let backend = backend_for(url);
        let data = OnboardingData {
            name: "Ada".to_string(),
            goals: vec!["sleep more".to_string()],
            ..Default::default()
        };

        backend.save_preferences("user-1", &data).await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        let req = &log[0];
        assert_eq!(req.path, "user_preferences");
        assert_eq!(req.query.get("on_conflict").map(String::as_str), Some("user_id"));
        assert_eq!(req.apikey.as_deref(), Some("test-key"));
        assert_eq!(req.body["user_id"], "user-1");
        assert_eq!(req.body["setup_mode"], "guided");
        assert_eq!(req.body["goals"][0], "sleep more");
    }

    #[tokio::test]
    async fn save_profile_name_patches_by_id() {
        let (url, log) = spawn_fake_backend(StatusCode::NO_CONTENT).await;
        let backend = backend_for(url);

        backend.save_profile_name("user-1", "Ada").await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log[0].path, "profiles");
        assert_eq!(log[0].query.get("id").map(String::as_str), Some("eq.user-1"));
        assert_eq!(log[0].body["full_name"], "Ada");
    }

    #[tokio::test]
    async fn rejection_carries_status() {
        let (url, _log) = spawn_fake_backend(StatusCode::UNPROCESSABLE_ENTITY).await;
        let backend = backend_for(url);

        let err = backend
            .save_preferences("user-1", &OnboardingData::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { status: 422, .. }));
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn unreachable_host_is_request_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = backend_for(format!("http://{addr}"));
        let err = backend.save_profile_name("user-1", "Ada").await.unwrap_err();
        assert!(matches!(err, RemoteError::Request { .. }));
        assert!(!err.is_validation());
    }
}
