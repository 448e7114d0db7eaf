//! REST endpoints driving the onboarding session.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{Error, OnboardingError};
use crate::store::Database;

use super::automations::AUTOMATION_CATALOG;
use super::completion::{RemoteOutcome, is_onboarded};
use super::model::{
    AssistantStyle, AutonomyLevel, EnergyPattern, FocusWindow, NotificationLevel, SetupMode, Tone,
    VoiceSettings, WorkStyle,
};
use super::preview::preview_entries;
use super::session::OnboardingSession;
use super::signals::DiscoveryQuestion;
use super::steps::StepSequencer;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub session: Arc<Mutex<OnboardingSession>>,
    pub db: Arc<dyn Database>,
    pub local_user: String,
    pub max_automations: usize,
}

#[derive(Debug, Deserialize)]
struct ModeRequest {
    mode: SetupMode,
}

#[derive(Debug, Deserialize)]
struct NameRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SignalRequest {
    question: String,
    value: String,
    #[serde(default)]
    elapsed_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SkipSignalRequest {
    question: String,
}

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SelectionRequest {
    value: String,
}

/// Partial update of the free-form answers. Absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DataPatch {
    assistant_style: Option<AssistantStyle>,
    tone: Option<Tone>,
    autonomy_level: Option<AutonomyLevel>,
    voice: Option<VoiceSettings>,
    peak_focus: Option<FocusWindow>,
    energy_pattern: Option<EnergyPattern>,
    work_style: Option<WorkStyle>,
    notification_level: Option<NotificationLevel>,
    goals: Option<Vec<String>>,
    integrations: Option<Vec<String>>,
}

fn onboarding_error(err: OnboardingError) -> Response {
    let status = match err {
        OnboardingError::UnknownQuestion(_) | OnboardingError::InvalidSignalValue { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::CONFLICT,
    };
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}

fn error_response(err: Error) -> Response {
    match err {
        Error::Onboarding(e) => onboarding_error(e),
        other => {
            tracing::error!("Onboarding request failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": other.to_string()})),
            )
                .into_response()
        }
    }
}

/// GET /api/onboarding/status
async fn get_status(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let snapshot = state.session.lock().await.snapshot();
    let onboarded = is_onboarded(state.db.as_ref(), &state.local_user).await;
    Json(serde_json::json!({
        "onboarded": onboarded,
        "session": snapshot,
    }))
}

/// GET /api/onboarding/preview
///
/// The derived profile plus the statements shown on the preview step.
async fn get_preview(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let profile = state.session.lock().await.profile();
    let entries = preview_entries(&profile);
    Json(serde_json::json!({
        "profile": profile,
        "preview": entries,
    }))
}

/// GET /api/onboarding/automations
async fn get_automations(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let selected = state.session.lock().await.data().automations.clone();
    Json(serde_json::json!({
        "catalog": AUTOMATION_CATALOG,
        "selected": selected,
        "max": state.max_automations,
    }))
}

/// GET /api/onboarding/review
///
/// Markdown summary shown on the review step.
async fn get_review(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(serde_json::json!({
        "step": session.current_step(),
        "summary": session.review_summary(),
    }))
}

/// POST /api/onboarding/resume
async fn post_resume(State(state): State<OnboardingRouteState>) -> Response {
    let mut session = state.session.lock().await;
    match session.resume() {
        Ok(_) => Json(session.snapshot()).into_response(),
        Err(e) => onboarding_error(e),
    }
}

/// POST /api/onboarding/start-fresh
async fn post_start_fresh(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    session.start_fresh().await;
    Json(session.snapshot())
}

/// POST /api/onboarding/mode
///
/// On the mode-selection step this chooses the mode and moves on to the name
/// step. Past it, the mode is switched in place. Before it, the request is
/// blocked. A client that advances off mode selection without calling this
/// keeps the default guided mode.
async fn post_mode(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<ModeRequest>,
) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    let outcome = if session.index() == StepSequencer::MODE_SELECT_INDEX {
        session.choose_mode(req.mode).await
    } else {
        session.switch_mode(req.mode).await
    };
    Json(outcome)
}

/// POST /api/onboarding/advance
async fn post_advance(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.session.lock().await.advance().await)
}

/// POST /api/onboarding/retreat
async fn post_retreat(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.session.lock().await.retreat().await)
}

/// POST /api/onboarding/skip
async fn post_skip(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.session.lock().await.skip_to_end().await)
}

/// POST /api/onboarding/signal
async fn post_signal(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<SignalRequest>,
) -> Response {
    let mut session = state.session.lock().await;
    match session.record_signal_raw(&req.question, &req.value, req.elapsed_ms) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => onboarding_error(e),
    }
}

/// POST /api/onboarding/signal/skip
async fn post_skip_signal(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<SkipSignalRequest>,
) -> Response {
    let question: DiscoveryQuestion = match req.question.parse() {
        Ok(q) => q,
        Err(e) => return onboarding_error(e),
    };
    let mut session = state.session.lock().await;
    match session.skip_signal(question) {
        Ok(written) => Json(serde_json::json!({"written": written})).into_response(),
        Err(e) => onboarding_error(e),
    }
}

/// POST /api/onboarding/name
async fn post_name(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<NameRequest>,
) -> Response {
    let mut session = state.session.lock().await;
    match session.set_name(&req.name) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => onboarding_error(e),
    }
}

/// PATCH /api/onboarding/data
async fn patch_data(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<DataPatch>,
) -> Response {
    let mut session = state.session.lock().await;
    let result = session.update_data(|data| {
        if let Some(v) = req.assistant_style {
            data.assistant_style = v;
        }
        if let Some(v) = req.tone {
            data.tone = v;
        }
        if let Some(v) = req.autonomy_level {
            data.autonomy_level = v;
        }
        if let Some(v) = req.voice {
            data.voice = v;
        }
        if let Some(v) = req.peak_focus {
            data.peak_focus = v;
        }
        if let Some(v) = req.energy_pattern {
            data.energy_pattern = v;
        }
        if let Some(v) = req.work_style {
            data.work_style = v;
        }
        if let Some(v) = req.notification_level {
            data.notification_level = v;
        }
        if let Some(v) = req.goals {
            data.goals = v;
        }
        if let Some(v) = req.integrations {
            data.integrations = v;
        }
    });
    match result {
        Ok(()) => Json(session.data().clone()).into_response(),
        Err(e) => onboarding_error(e),
    }
}

/// POST /api/onboarding/goals/toggle
async fn post_toggle_goal(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<SelectionRequest>,
) -> Response {
    let mut session = state.session.lock().await;
    match session.toggle_goal(&req.value) {
        Ok(selected) => Json(serde_json::json!({
            "selected": selected,
            "goals": session.data().goals,
        }))
        .into_response(),
        Err(e) => onboarding_error(e),
    }
}

/// POST /api/onboarding/integrations/toggle
async fn post_toggle_integration(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<SelectionRequest>,
) -> Response {
    let mut session = state.session.lock().await;
    match session.toggle_integration(&req.value) {
        Ok(selected) => Json(serde_json::json!({
            "selected": selected,
            "integrations": session.data().integrations,
        }))
        .into_response(),
        Err(e) => onboarding_error(e),
    }
}

/// POST /api/onboarding/automations/toggle
async fn post_toggle_automation(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<ToggleRequest>,
) -> Response {
    let mut session = state.session.lock().await;
    match session.toggle_automation(&req.id) {
        Ok(outcome) => Json(serde_json::json!({
            "outcome": outcome,
            "selected": session.data().automations,
        }))
        .into_response(),
        Err(e) => onboarding_error(e),
    }
}

/// POST /api/onboarding/complete
///
/// Succeeds once the record is durable locally; the remote outcome is
/// informational. The session lock is released before the remote save.
async fn post_complete(State(state): State<OnboardingRouteState>) -> Response {
    let finalized = state.session.lock().await.finalize().await;
    match finalized {
        Ok(pending) => {
            let report = pending.finish().await;
            let (remote, remote_error) = match &report.remote {
                RemoteOutcome::Saved => ("saved", None),
                RemoteOutcome::Skipped => ("skipped", None),
                RemoteOutcome::Failed(e) => ("failed", Some(e.to_string())),
            };
            Json(serde_json::json!({
                "data": report.data,
                "remote": remote,
                "remote_error": remote_error,
            }))
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/status", get(get_status))
        .route("/api/onboarding/preview", get(get_preview))
        .route("/api/onboarding/automations", get(get_automations))
        .route("/api/onboarding/review", get(get_review))
        .route("/api/onboarding/resume", post(post_resume))
        .route("/api/onboarding/start-fresh", post(post_start_fresh))
        .route("/api/onboarding/mode", post(post_mode))
        .route("/api/onboarding/advance", post(post_advance))
        .route("/api/onboarding/retreat", post(post_retreat))
        .route("/api/onboarding/skip", post(post_skip))
        .route("/api/onboarding/signal", post(post_signal))
        .route("/api/onboarding/signal/skip", post(post_skip_signal))
        .route("/api/onboarding/name", post(post_name))
        .route("/api/onboarding/data", patch(patch_data))
        .route("/api/onboarding/goals/toggle", post(post_toggle_goal))
        .route(
            "/api/onboarding/integrations/toggle",
            post(post_toggle_integration),
        )
        .route(
            "/api/onboarding/automations/toggle",
            post(post_toggle_automation),
        )
        .route("/api/onboarding/complete", post(post_complete))
        .with_state(state)
}
