//! Integration tests for the onboarding REST surface.
//!
//! Each test spins up an Axum server on a random port backed by an
//! in-memory database and drives it with reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};

use lifeos_onboarding::config::OnboardingConfig;
use lifeos_onboarding::error::RemoteError;
use lifeos_onboarding::onboarding::{
    OnboardingData, OnboardingRouteState, OnboardingSession, ProfileBackend, SessionDeps,
    onboarding_routes,
};
use lifeos_onboarding::store::{Database, LibSqlBackend};

/// Start a server on a random port, return its base URL.
async fn start_server() -> String {
    start_server_with(|deps| deps).await
}

async fn start_server_with(configure: impl FnOnce(SessionDeps) -> SessionDeps) -> String {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let session = OnboardingSession::open(configure(SessionDeps::new(Arc::clone(&db)))).await;
    let state = OnboardingRouteState {
        session: Arc::new(Mutex::new(session)),
        db,
        local_user: "local".to_string(),
        max_automations: 3,
    };
    let app = onboarding_routes(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}/api/onboarding")
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> reqwest::Response {
    client.post(url).json(&body).send().await.unwrap()
}

async fn post_json(client: &reqwest::Client, url: String) -> Value {
    client
        .post(url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn status_reports_fresh_session() {
    let base = start_server().await;
    let status: Value = reqwest::get(format!("{base}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status["onboarded"], false);
    assert_eq!(status["session"]["step"], "welcome");
    assert_eq!(status["session"]["mode"], "guided");
    assert_eq!(status["session"]["total_steps"], 18);
    assert!(status["session"]["pending_resume"].is_null());
}

#[tokio::test]
async fn full_quick_flow_over_http() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    post_json(&client, format!("{base}/advance")).await;
    let at_mode = post_json(&client, format!("{base}/advance")).await;
    assert_eq!(at_mode["to"], "mode_select");

    let chosen: Value = post(&client, format!("{base}/mode"), json!({"mode": "quick"}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(chosen["outcome"], "moved");
    assert_eq!(chosen["to"], "name");

    // Empty name is gated
    let blocked = post_json(&client, format!("{base}/advance")).await;
    assert_eq!(blocked["outcome"], "blocked");
    assert_eq!(blocked["reason"], "name_required");

    let resp = post(&client, format!("{base}/name"), json!({"name": "Ada"})).await;
    assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);

    let skipped = post_json(&client, format!("{base}/skip")).await;
    assert_eq!(skipped["to"], "complete");

    let done = post_json(&client, format!("{base}/complete")).await;
    assert_eq!(done["remote"], "skipped");
    assert_eq!(done["data"]["name"], "Ada");
    assert_eq!(done["data"]["setup_mode"], "quick");
    assert!(done["data"]["completed_at"].is_string());

    let status: Value = reqwest::get(format!("{base}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["onboarded"], true);
    assert_eq!(status["session"]["completed"], true);

    let again = client
        .post(format!("{base}/complete"))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn signals_flow_into_preview() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    post_json(&client, format!("{base}/advance")).await;
    post_json(&client, format!("{base}/advance")).await;
    post(&client, format!("{base}/mode"), json!({"mode": "guided"})).await;
    post(&client, format!("{base}/name"), json!({"name": "Ada"})).await;

    // Walk to the density question
    loop {
        let outcome = post_json(&client, format!("{base}/advance")).await;
        if outcome["to"] == "density_choice" {
            break;
        }
        assert_eq!(outcome["outcome"], "moved");
    }

    let wrong = post(
        &client,
        format!("{base}/signal"),
        json!({"question": "changeTolerance", "value": "low"}),
    )
    .await;
    assert_eq!(wrong.status(), reqwest::StatusCode::CONFLICT);

    let invalid = post(
        &client,
        format!("{base}/signal"),
        json!({"question": "densityChoice", "value": "enormous"}),
    )
    .await;
    assert_eq!(invalid.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

    let ok = post(
        &client,
        format!("{base}/signal"),
        json!({"question": "densityChoice", "value": "dense", "elapsed_ms": 800}),
    )
    .await;
    assert_eq!(ok.status(), reqwest::StatusCode::NO_CONTENT);

    let preview: Value = reqwest::get(format!("{base}/preview"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(preview["profile"]["information_density"]["value"], "dense");
    assert_eq!(preview["profile"]["information_density"]["confidence"], "high");
    let entries = preview["preview"].as_array().unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0]["area"], "density");
}

#[tokio::test]
async fn automation_toggle_respects_cap() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let catalog: Value = reqwest::get(format!("{base}/automations"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(catalog["catalog"].as_array().unwrap().len(), 8);
    assert_eq!(catalog["max"], 3);

    for id in ["morning_brief", "focus_guard", "weekly_reset"] {
        let resp: Value = post(&client, format!("{base}/automations/toggle"), json!({"id": id}))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(resp["outcome"], "enabled");
    }

    let capped: Value = post(
        &client,
        format!("{base}/automations/toggle"),
        json!({"id": "habit_nudge"}),
    )
    .await
    .json()
    .await
    .unwrap();
    assert_eq!(capped["outcome"], "limit_reached");
    assert_eq!(capped["selected"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn data_patch_updates_only_given_fields() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let data: Value = client
        .patch(format!("{base}/data"))
        .json(&json!({"tone": "direct", "goals": ["sleep more"]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(data["tone"], "direct");
    assert_eq!(data["goals"][0], "sleep more");
    assert_eq!(data["assistant_style"], "partner");
}

#[tokio::test]
async fn resume_without_saved_progress_conflicts() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/resume"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);

    let fresh = post_json(&client, format!("{base}/start-fresh")).await;
    assert_eq!(fresh["step"], "welcome");
}

/// Walk a fresh quick-mode session to its terminal step over HTTP.
async fn quick_flow_to_end(client: &reqwest::Client, base: &str) {
    post_json(client, format!("{base}/advance")).await;
    post_json(client, format!("{base}/advance")).await;
    post(client, format!("{base}/mode"), json!({"mode": "quick"})).await;
    post(client, format!("{base}/name"), json!({"name": "Ada"})).await;
    let skipped = post_json(client, format!("{base}/skip")).await;
    assert_eq!(skipped["to"], "complete");
}

#[tokio::test]
async fn review_summary_reflects_answers() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    quick_flow_to_end(&client, &base).await;
    client
        .patch(format!("{base}/data"))
        .json(&json!({"tone": "direct"}))
        .send()
        .await
        .unwrap();

    let review: Value = reqwest::get(format!("{base}/review"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(review["step"], "complete");
    let summary = review["summary"].as_str().unwrap();
    assert!(summary.contains("Ada"), "{summary}");
}

#[tokio::test]
async fn goals_and_integrations_toggle() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let added: Value = post(&client, format!("{base}/goals/toggle"), json!({"value": "sleep"}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(added["selected"], true);
    assert_eq!(added["goals"], json!(["sleep"]));

    let removed: Value = post(
        &client,
        format!("{base}/goals/toggle"),
        json!({"value": " sleep "}),
    )
    .await
    .json()
    .await
    .unwrap();
    assert_eq!(removed["selected"], false);
    assert_eq!(removed["goals"], json!([]));

    let integration: Value = post(
        &client,
        format!("{base}/integrations/toggle"),
        json!({"value": "calendar"}),
    )
    .await
    .json()
    .await
    .unwrap();
    assert_eq!(integration["selected"], true);
    assert_eq!(integration["integrations"], json!(["calendar"]));
}

/// Backend whose preference save waits until the test releases it.
struct GatedBackend {
    gate: Arc<Notify>,
}

#[async_trait]
impl ProfileBackend for GatedBackend {
    async fn save_preferences(
        &self,
        _user_id: &str,
        _data: &OnboardingData,
    ) -> Result<(), RemoteError> {
        self.gate.notified().await;
        Ok(())
    }

    async fn save_profile_name(&self, _user_id: &str, _name: &str) -> Result<(), RemoteError> {
        Ok(())
    }
}

#[tokio::test]
async fn status_stays_responsive_during_remote_save() {
    let gate = Arc::new(Notify::new());
    let backend = Arc::new(GatedBackend {
        gate: Arc::clone(&gate),
    });
    let base = start_server_with(|deps| {
        deps.with_backend(backend).with_config(OnboardingConfig {
            remote_user_id: Some("user-1".to_string()),
            ..Default::default()
        })
    })
    .await;
    let client = reqwest::Client::new();
    quick_flow_to_end(&client, &base).await;

    let completing = {
        let client = client.clone();
        let url = format!("{base}/complete");
        tokio::spawn(async move { client.post(url).send().await.unwrap() })
    };

    let mut completed = false;
    for _ in 0..50 {
        let status: Value = tokio::time::timeout(
            Duration::from_secs(1),
            reqwest::get(format!("{base}/status")),
        )
        .await
        .expect("status blocked while the remote save was pending")
        .unwrap()
        .json()
        .await
        .unwrap();
        if status["session"]["completed"] == true {
            assert_eq!(status["onboarded"], true);
            completed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(completed, "local completion never became visible");
    assert!(!completing.is_finished());

    gate.notify_one();
    let done: Value = completing.await.unwrap().json().await.unwrap();
    assert_eq!(done["remote"], "saved");
}
