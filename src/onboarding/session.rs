//! OnboardingSession: the single owner of onboarding state.
//!
//! Navigation never fails. Boundary moves are clamped and report
//! `StepOutcome::Unchanged`; gated moves report `StepOutcome::Blocked`.
//! Every change of the current index writes a progress checkpoint.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::OnboardingConfig;
use crate::error::{OnboardingError, Result};
use crate::store::Database;

use super::automations::{self, ToggleOutcome};
use super::completion::{
    CompletionCallback, CompletionObserver, CompletionPipeline, CompletionReport,
    PendingCompletion, ProfileBackend, TracingObserver,
};
use super::model::{OnboardingData, SetupMode};
use super::preview;
use super::profile::{self, CognitiveProfile};
use super::progress::{ProgressStore, SavedProgress};
use super::signals::{DiscoveryQuestion, QuestionTimer, SignalAnswer, SignalRecorder};
use super::steps::{StepId, StepSequencer};

/// Collaborators a session needs. Only the database is mandatory.
pub struct SessionDeps {
    pub db: Arc<dyn Database>,
    pub backend: Option<Arc<dyn ProfileBackend>>,
    pub observer: Arc<dyn CompletionObserver>,
    pub clock: Arc<dyn Clock>,
    pub config: OnboardingConfig,
}

impl SessionDeps {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            backend: None,
            observer: Arc::new(TracingObserver),
            clock: Arc::new(SystemClock),
            config: OnboardingConfig::default(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn ProfileBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CompletionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: OnboardingConfig) -> Self {
        self.config = config;
        self
    }
}

/// Why a navigation request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// The name step needs a non-blank name.
    NameRequired,
    /// Mode can only be chosen on the mode-selection step.
    NotAtModeSelect,
    /// Skipping ahead is only possible past mode selection.
    BeforeModeSelect,
    /// Saved progress is waiting for a resume / start-fresh decision.
    ResumeDecisionPending,
    Completed,
}

/// Result of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Moved { from: StepId, to: StepId },
    Unchanged { step: StepId },
    Blocked { step: StepId, reason: BlockReason },
}

impl StepOutcome {
    /// The step the session is on after the request.
    pub fn step(&self) -> StepId {
        match self {
            Self::Moved { to, .. } => *to,
            Self::Unchanged { step } | Self::Blocked { step, .. } => *step,
        }
    }

    pub fn moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Serializable view of the session for the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub step: StepId,
    pub index: usize,
    pub mode: SetupMode,
    pub total_steps: usize,
    pub is_terminal: bool,
    pub completed: bool,
    pub pending_resume: Option<SavedProgress>,
    pub data: OnboardingData,
}

pub struct OnboardingSession {
    data: OnboardingData,
    index: usize,
    pending_resume: Option<SavedProgress>,
    completed: bool,
    timer: QuestionTimer,
    progress: ProgressStore,
    pipeline: CompletionPipeline,
    clock: Arc<dyn Clock>,
    max_automations: usize,
    on_complete: Option<CompletionCallback>,
}

impl OnboardingSession {
    /// Start a session, looking for resumable progress.
    ///
    /// Fresh saved progress is held in `pending_resume()`; the session stays
    /// on the entry step until `resume()` or `start_fresh()` is called.
    pub async fn open(deps: SessionDeps) -> Self {
        let SessionDeps {
            db,
            backend,
            observer,
            clock,
            config,
        } = deps;

        let progress = ProgressStore::new(Arc::clone(&db), &config);
        let pending_resume = progress.restore_fresh(clock.now()).await;
        if let Some(saved) = &pending_resume {
            info!(
                step = saved.step,
                mode = %saved.mode,
                "Found resumable onboarding progress"
            );
        }

        let pipeline = CompletionPipeline::new(db, backend, observer, &config);

        Self {
            data: OnboardingData::default(),
            index: 0,
            pending_resume,
            completed: false,
            timer: QuestionTimer::default(),
            progress,
            pipeline,
            clock,
            max_automations: config.max_automations,
            on_complete: None,
        }
    }

    /// Register the hook invoked once when onboarding completes.
    pub fn on_complete<F>(&mut self, callback: F)
    where
        F: FnOnce(&OnboardingData) + Send + Sync + 'static,
    {
        self.on_complete = Some(Box::new(callback));
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn mode(&self) -> SetupMode {
        self.data.setup_mode
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_step(&self) -> StepId {
        StepSequencer::step_at(self.mode(), self.index)
    }

    pub fn steps(&self) -> &'static [StepId] {
        StepSequencer::steps_for(self.mode())
    }

    pub fn is_terminal(&self) -> bool {
        StepSequencer::is_terminal(self.mode(), self.index)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn data(&self) -> &OnboardingData {
        &self.data
    }

    pub fn pending_resume(&self) -> Option<&SavedProgress> {
        self.pending_resume.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            step: self.current_step(),
            index: self.index,
            mode: self.mode(),
            total_steps: StepSequencer::len(self.mode()),
            is_terminal: self.is_terminal(),
            completed: self.completed,
            pending_resume: self.pending_resume.clone(),
            data: self.data.clone(),
        }
    }

    // ── Resume decision ────────────────────────────────────────────

    /// Continue from the saved checkpoint, signals and all.
    pub fn resume(&mut self) -> std::result::Result<StepId, OnboardingError> {
        let saved = self
            .pending_resume
            .take()
            .ok_or(OnboardingError::NoPendingResume)?;

        self.data = saved.data;
        self.data.setup_mode = saved.mode;
        self.data.completed_at = None;
        self.index = saved.step;
        self.show_current_step();

        info!(step = %self.current_step(), mode = %self.mode(), "Resumed onboarding");
        Ok(self.current_step())
    }

    /// Discard any saved progress and begin again at the entry step.
    pub async fn start_fresh(&mut self) {
        self.progress.clear().await;
        self.pending_resume = None;
        self.data = OnboardingData::default();
        self.index = 0;
        self.completed = false;
        self.show_current_step();
        info!("Starting onboarding fresh");
    }

    // ── Navigation ─────────────────────────────────────────────────

    /// Pick the setup mode on the mode-selection step, then move on.
    pub async fn choose_mode(&mut self, mode: SetupMode) -> StepOutcome {
        if let Some(blocked) = self.navigation_block() {
            return blocked;
        }
        if self.index != StepSequencer::MODE_SELECT_INDEX {
            return self.blocked(BlockReason::NotAtModeSelect);
        }

        let from = self.current_step();
        let resolved = StepSequencer::resolve(self.mode(), self.index, mode);
        self.data.setup_mode = mode;
        info!(%mode, "Onboarding mode chosen");

        self.move_to(from, StepSequencer::next(mode, resolved)).await
    }

    /// Change mode mid-flow, keeping the user on the same step when it exists
    /// in the new sequence.
    pub async fn switch_mode(&mut self, mode: SetupMode) -> StepOutcome {
        if let Some(blocked) = self.navigation_block() {
            return blocked;
        }
        if self.index <= StepSequencer::MODE_SELECT_INDEX {
            return self.blocked(BlockReason::BeforeModeSelect);
        }
        if mode == self.mode() || self.is_terminal() {
            return self.unchanged();
        }

        let from = self.current_step();
        let resolved = StepSequencer::resolve(self.mode(), self.index, mode);
        debug!(from_mode = %self.mode(), to_mode = %mode, resolved, "Switching onboarding mode");
        self.data.setup_mode = mode;
        self.move_to(from, resolved).await
    }

    /// Move one step forward.
    ///
    /// Advancing off the mode-selection step without `choose_mode` keeps the
    /// current mode, which is guided for a fresh session.
    pub async fn advance(&mut self) -> StepOutcome {
        if let Some(blocked) = self.navigation_block() {
            return blocked;
        }
        if self.is_terminal() {
            return self.unchanged();
        }

        let from = self.current_step();
        if from == StepId::Name && self.data.name.trim().is_empty() {
            return self.blocked(BlockReason::NameRequired);
        }

        // Moving past an unanswered question counts as skipping it
        if let Some(question) = from.question() {
            self.skip_if_unanswered(question);
        }

        self.move_to(from, StepSequencer::next(self.mode(), self.index))
            .await
    }

    /// Step back, never below the mode-selection step.
    pub async fn retreat(&mut self) -> StepOutcome {
        if let Some(blocked) = self.navigation_block() {
            return blocked;
        }
        if self.index <= StepSequencer::MODE_SELECT_INDEX {
            return self.unchanged();
        }

        let from = self.current_step();
        self.move_to(from, StepSequencer::prev(self.mode(), self.index))
            .await
    }

    /// Jump to the terminal step, filling every unanswered question on the
    /// way with its skip default.
    pub async fn skip_to_end(&mut self) -> StepOutcome {
        if let Some(blocked) = self.navigation_block() {
            return blocked;
        }
        if self.index <= StepSequencer::MODE_SELECT_INDEX {
            return self.blocked(BlockReason::BeforeModeSelect);
        }
        if self.is_terminal() {
            return self.unchanged();
        }
        if self.data.name.trim().is_empty() {
            return self.blocked(BlockReason::NameRequired);
        }

        let terminal = StepSequencer::terminal_index(self.mode());
        let skipped: Vec<DiscoveryQuestion> = self.steps()[self.index..terminal]
            .iter()
            .filter_map(StepId::question)
            .collect();
        for question in skipped {
            self.skip_if_unanswered(question);
        }

        let from = self.current_step();
        self.move_to(from, terminal).await
    }

    // ── Signals ────────────────────────────────────────────────────

    /// Record an answer to the question on the current step.
    ///
    /// Without an explicit `elapsed_ms` the session's own timer is used.
    pub fn record_signal(
        &mut self,
        answer: SignalAnswer,
        elapsed_ms: Option<u64>,
    ) -> std::result::Result<(), OnboardingError> {
        self.ensure_editable()?;
        let question = answer.question();
        self.ensure_current_question(question)?;

        let elapsed_ms = elapsed_ms.or_else(|| self.timer.elapsed_ms(question, self.clock.now()));
        debug!(question = %question, elapsed_ms, "Recording discovery signal");
        SignalRecorder::new(&mut self.data.cognitive_signals).record(answer, elapsed_ms);
        Ok(())
    }

    /// Wire-format variant of `record_signal`.
    pub fn record_signal_raw(
        &mut self,
        question: &str,
        value: &str,
        elapsed_ms: Option<u64>,
    ) -> std::result::Result<(), OnboardingError> {
        let question: DiscoveryQuestion = question.parse()?;
        let answer = SignalAnswer::parse(question, value)?;
        self.record_signal(answer, elapsed_ms)
    }

    /// Skip the question on the current step. Returns whether the default
    /// was written (a real answer is never replaced).
    pub fn skip_signal(
        &mut self,
        question: DiscoveryQuestion,
    ) -> std::result::Result<bool, OnboardingError> {
        self.ensure_editable()?;
        self.ensure_current_question(question)?;
        Ok(SignalRecorder::new(&mut self.data.cognitive_signals).skip(question))
    }

    // ── Data editing ───────────────────────────────────────────────

    pub fn set_name(&mut self, name: &str) -> std::result::Result<(), OnboardingError> {
        self.ensure_editable()?;
        self.data.name = name.trim().to_string();
        Ok(())
    }

    /// Edit the record directly. Mode and completion stamp are owned by the
    /// session and are restored afterwards.
    pub fn update_data<F>(&mut self, edit: F) -> std::result::Result<(), OnboardingError>
    where
        F: FnOnce(&mut OnboardingData),
    {
        self.ensure_editable()?;
        let mode = self.data.setup_mode;
        edit(&mut self.data);
        self.data.setup_mode = mode;
        self.data.completed_at = None;
        Ok(())
    }

    /// Returns whether the goal is now selected.
    pub fn toggle_goal(&mut self, goal: &str) -> std::result::Result<bool, OnboardingError> {
        self.ensure_editable()?;
        Ok(toggle_entry(&mut self.data.goals, goal))
    }

    /// Returns whether the integration is now selected.
    pub fn toggle_integration(
        &mut self,
        integration: &str,
    ) -> std::result::Result<bool, OnboardingError> {
        self.ensure_editable()?;
        Ok(toggle_entry(&mut self.data.integrations, integration))
    }

    pub fn toggle_automation(
        &mut self,
        template_id: &str,
    ) -> std::result::Result<ToggleOutcome, OnboardingError> {
        self.ensure_editable()?;
        let outcome = automations::toggle(
            &mut self.data.automations,
            template_id,
            self.max_automations,
        );
        debug!(template_id, ?outcome, "Toggled automation");
        Ok(outcome)
    }

    // ── Derivations ────────────────────────────────────────────────

    pub fn profile(&self) -> CognitiveProfile {
        profile::build(&self.data.cognitive_signals)
    }

    pub fn adaptation_preview(&self) -> Vec<String> {
        preview::preview(&self.profile())
    }

    pub fn review_summary(&self) -> String {
        self.data.review_summary()
    }

    // ── Completion ─────────────────────────────────────────────────

    /// Finish onboarding from the terminal step.
    ///
    /// Clears saved progress, then runs the completion pipeline. Remote
    /// failures are reported in the returned `CompletionReport`, never as
    /// an error.
    pub async fn complete(&mut self) -> Result<CompletionReport> {
        Ok(self.finalize().await?.finish().await)
    }

    /// Local half of `complete`: check the contract, make the record durable
    /// and mark the session completed.
    ///
    /// The returned `PendingCompletion` carries the remote save and the
    /// completion callback, and borrows nothing from the session, so callers
    /// sharing the session behind a lock can release it before awaiting
    /// `finish`. If the local write fails the checkpoint is written back and
    /// the callback stays registered.
    pub async fn finalize(&mut self) -> Result<PendingCompletion> {
        if self.completed {
            return Err(OnboardingError::AlreadyCompleted.into());
        }
        if self.pending_resume.is_some() {
            return Err(OnboardingError::ResumeDecisionPending.into());
        }
        if !self.is_terminal() {
            return Err(OnboardingError::NotAtTerminal {
                step: self.current_step().to_string(),
            }
            .into());
        }

        self.progress.clear().await;

        match self
            .pipeline
            .finalize(self.data.clone(), self.clock.now(), &mut self.on_complete)
            .await
        {
            Ok(pending) => {
                self.data = pending.data().clone();
                self.completed = true;
                Ok(pending)
            }
            Err(e) => {
                // Keep the checkpoint so nothing collected is lost
                self.save_progress().await;
                Err(e.into())
            }
        }
    }

    // ── Internals ──────────────────────────────────────────────────

    fn navigation_block(&self) -> Option<StepOutcome> {
        if self.completed {
            Some(self.blocked(BlockReason::Completed))
        } else if self.pending_resume.is_some() {
            Some(self.blocked(BlockReason::ResumeDecisionPending))
        } else {
            None
        }
    }

    fn ensure_editable(&self) -> std::result::Result<(), OnboardingError> {
        if self.completed {
            return Err(OnboardingError::AlreadyCompleted);
        }
        if self.pending_resume.is_some() {
            return Err(OnboardingError::ResumeDecisionPending);
        }
        Ok(())
    }

    fn ensure_current_question(
        &self,
        question: DiscoveryQuestion,
    ) -> std::result::Result<(), OnboardingError> {
        let step = self.current_step();
        if step.question() == Some(question) {
            Ok(())
        } else {
            Err(OnboardingError::SignalNotCollected {
                step: step.to_string(),
                question: question.to_string(),
            })
        }
    }

    fn skip_if_unanswered(&mut self, question: DiscoveryQuestion) {
        if !self.data.cognitive_signals.has(question) {
            SignalRecorder::new(&mut self.data.cognitive_signals).skip(question);
        }
    }

    fn blocked(&self, reason: BlockReason) -> StepOutcome {
        StepOutcome::Blocked {
            step: self.current_step(),
            reason,
        }
    }

    fn unchanged(&self) -> StepOutcome {
        StepOutcome::Unchanged {
            step: self.current_step(),
        }
    }

    async fn move_to(&mut self, from: StepId, index: usize) -> StepOutcome {
        self.index = index;
        let to = self.current_step();
        self.show_current_step();
        self.save_progress().await;
        debug!(%from, %to, index, "Onboarding step changed");
        StepOutcome::Moved { from, to }
    }

    fn show_current_step(&mut self) {
        let question = self.current_step().question();
        self.timer.show(question, self.clock.now());
    }

    async fn save_progress(&self) {
        let checkpoint = SavedProgress {
            step: self.index,
            mode: self.mode(),
            timestamp: self.clock.now().timestamp_millis(),
            data: self.data.clone(),
        };
        self.progress.save(&checkpoint).await;
    }
}

fn toggle_entry(list: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if let Some(pos) = list.iter().position(|v| v == value) {
        list.remove(pos);
        false
    } else {
        list.push(value.to_string());
        true
    }
}
