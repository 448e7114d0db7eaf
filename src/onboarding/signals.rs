//! Cognitive discovery signals: the timed answers to the discovery
//! questions, and the recorder that writes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OnboardingError;

/// Declares a closed set of answers for one discovery question, with a
/// stable wire name per variant.
macro_rules! signal_choice {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }
    };
}

signal_choice! {
    /// How much information the user wants on screen at once.
    DensityChoice {
        Minimal => "minimal",
        Balanced => "balanced",
        Dense => "dense",
        Adaptive => "adaptive",
    }
}

signal_choice! {
    TaskOrganization {
        Lists => "lists",
        TimeBlocks => "time_blocks",
        Board => "board",
        Hybrid => "hybrid",
    }
}

signal_choice! {
    ChangeTolerance {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

signal_choice! {
    ProgressVisualization {
        Streaks => "streaks",
        ProgressBars => "progress_bars",
        Milestones => "milestones",
        Minimal => "minimal",
    }
}

signal_choice! {
    /// What the user does when tasks pile up.
    PileUpResponse {
        Reprioritize => "reprioritize",
        PushThrough => "push_through",
        FreezeUp => "freeze_up",
        StepAway => "step_away",
    }
}

signal_choice! {
    ReminderFeeling {
        Helpful => "helpful",
        Neutral => "neutral",
        Nagging => "nagging",
    }
}

signal_choice! {
    /// Whether the system may rearrange things without asking.
    AutoChangePreference {
        AlwaysAsk => "always_ask",
        SuggestFirst => "suggest_first",
        JustDoIt => "just_do_it",
    }
}

signal_choice! {
    SelfRecognitionTag {
        EasilyOverwhelmed => "easily_overwhelmed",
        Perfectionist => "perfectionist",
        Procrastinator => "procrastinator",
        Hyperfocus => "hyperfocus",
        NeedsNovelty => "needs_novelty",
        DeadlineDriven => "deadline_driven",
    }
}

/// The discovery questions, one per signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryQuestion {
    DensityChoice,
    TaskOrganization,
    ChangeTolerance,
    ProgressVisualization,
    PileUpResponse,
    ReminderFeeling,
    AutoChangePreference,
    SelfRecognitionTags,
}

impl DiscoveryQuestion {
    pub const ALL: [DiscoveryQuestion; 8] = [
        Self::DensityChoice,
        Self::TaskOrganization,
        Self::ChangeTolerance,
        Self::ProgressVisualization,
        Self::PileUpResponse,
        Self::ReminderFeeling,
        Self::AutoChangePreference,
        Self::SelfRecognitionTags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DensityChoice => "density_choice",
            Self::TaskOrganization => "task_organization",
            Self::ChangeTolerance => "change_tolerance",
            Self::ProgressVisualization => "progress_visualization",
            Self::PileUpResponse => "pile_up_response",
            Self::ReminderFeeling => "reminder_feeling",
            Self::AutoChangePreference => "auto_change_preference",
            Self::SelfRecognitionTags => "self_recognition_tags",
        }
    }

    /// Multi-select questions carry no decision time.
    pub fn is_timed(&self) -> bool {
        !matches!(self, Self::SelfRecognitionTags)
    }
}

impl std::fmt::Display for DiscoveryQuestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiscoveryQuestion {
    type Err = OnboardingError;

    /// Accepts both `density_choice` and `densityChoice` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .flat_map(|c| {
                if c.is_ascii_uppercase() {
                    vec!['_', c.to_ascii_lowercase()]
                } else {
                    vec![c]
                }
            })
            .collect();
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == normalized)
            .ok_or_else(|| OnboardingError::UnknownQuestion(s.to_string()))
    }
}

/// A typed answer to one discovery question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalAnswer {
    Density(DensityChoice),
    TaskOrganization(TaskOrganization),
    ChangeTolerance(ChangeTolerance),
    ProgressVisualization(ProgressVisualization),
    PileUpResponse(PileUpResponse),
    ReminderFeeling(ReminderFeeling),
    AutoChangePreference(AutoChangePreference),
    SelfRecognition(Vec<SelfRecognitionTag>),
}

impl SignalAnswer {
    pub fn question(&self) -> DiscoveryQuestion {
        match self {
            Self::Density(_) => DiscoveryQuestion::DensityChoice,
            Self::TaskOrganization(_) => DiscoveryQuestion::TaskOrganization,
            Self::ChangeTolerance(_) => DiscoveryQuestion::ChangeTolerance,
            Self::ProgressVisualization(_) => DiscoveryQuestion::ProgressVisualization,
            Self::PileUpResponse(_) => DiscoveryQuestion::PileUpResponse,
            Self::ReminderFeeling(_) => DiscoveryQuestion::ReminderFeeling,
            Self::AutoChangePreference(_) => DiscoveryQuestion::AutoChangePreference,
            Self::SelfRecognition(_) => DiscoveryQuestion::SelfRecognitionTags,
        }
    }

    /// The value written when the user skips a question without answering.
    pub fn skip_default(question: DiscoveryQuestion) -> Self {
        match question {
            DiscoveryQuestion::DensityChoice => Self::Density(DensityChoice::Adaptive),
            DiscoveryQuestion::TaskOrganization => Self::TaskOrganization(TaskOrganization::Hybrid),
            DiscoveryQuestion::ChangeTolerance => Self::ChangeTolerance(ChangeTolerance::Medium),
            DiscoveryQuestion::ProgressVisualization => {
                Self::ProgressVisualization(ProgressVisualization::Milestones)
            }
            DiscoveryQuestion::PileUpResponse => Self::PileUpResponse(PileUpResponse::Reprioritize),
            DiscoveryQuestion::ReminderFeeling => Self::ReminderFeeling(ReminderFeeling::Neutral),
            DiscoveryQuestion::AutoChangePreference => {
                Self::AutoChangePreference(AutoChangePreference::SuggestFirst)
            }
            DiscoveryQuestion::SelfRecognitionTags => Self::SelfRecognition(Vec::new()),
        }
    }

    /// Parse a wire value for `question`. Self-recognition tags are a
    /// comma-separated list; an empty string means no tags.
    pub fn parse(question: DiscoveryQuestion, raw: &str) -> Result<Self, OnboardingError> {
        let raw = raw.trim();
        let invalid = || OnboardingError::InvalidSignalValue {
            question: question.to_string(),
            value: raw.to_string(),
        };

        let answer = match question {
            DiscoveryQuestion::DensityChoice => Self::Density(raw.parse().map_err(|_| invalid())?),
            DiscoveryQuestion::TaskOrganization => {
                Self::TaskOrganization(raw.parse().map_err(|_| invalid())?)
            }
            DiscoveryQuestion::ChangeTolerance => {
                Self::ChangeTolerance(raw.parse().map_err(|_| invalid())?)
            }
            DiscoveryQuestion::ProgressVisualization => {
                Self::ProgressVisualization(raw.parse().map_err(|_| invalid())?)
            }
            DiscoveryQuestion::PileUpResponse => {
                Self::PileUpResponse(raw.parse().map_err(|_| invalid())?)
            }
            DiscoveryQuestion::ReminderFeeling => {
                Self::ReminderFeeling(raw.parse().map_err(|_| invalid())?)
            }
            DiscoveryQuestion::AutoChangePreference => {
                Self::AutoChangePreference(raw.parse().map_err(|_| invalid())?)
            }
            DiscoveryQuestion::SelfRecognitionTags => {
                let tags = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(|t| t.parse().map_err(|_| invalid()))
                    .collect::<Result<Vec<SelfRecognitionTag>, _>>()?;
                Self::SelfRecognition(tags)
            }
        };
        Ok(answer)
    }
}

/// Whether a signal came from a real answer or the skip default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Answered,
    Skipped,
}

/// One recorded signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEntry<T> {
    pub value: T,
    /// Time from the question becoming visible to the choice, when measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    pub source: SignalSource,
    /// How many times an answered value was changed to a different one.
    #[serde(default)]
    pub revisions: u32,
}

/// All discovery signals for one session. `None` means never asked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveDiscoverySignals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density_choice: Option<SignalEntry<DensityChoice>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_organization: Option<SignalEntry<TaskOrganization>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_tolerance: Option<SignalEntry<ChangeTolerance>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_visualization: Option<SignalEntry<ProgressVisualization>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pile_up_response: Option<SignalEntry<PileUpResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_feeling: Option<SignalEntry<ReminderFeeling>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_change_preference: Option<SignalEntry<AutoChangePreference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_recognition_tags: Option<SignalEntry<Vec<SelfRecognitionTag>>>,
}

impl CognitiveDiscoverySignals {
    /// Whether any entry (answered or skipped) exists for `question`.
    pub fn has(&self, question: DiscoveryQuestion) -> bool {
        match question {
            DiscoveryQuestion::DensityChoice => self.density_choice.is_some(),
            DiscoveryQuestion::TaskOrganization => self.task_organization.is_some(),
            DiscoveryQuestion::ChangeTolerance => self.change_tolerance.is_some(),
            DiscoveryQuestion::ProgressVisualization => self.progress_visualization.is_some(),
            DiscoveryQuestion::PileUpResponse => self.pile_up_response.is_some(),
            DiscoveryQuestion::ReminderFeeling => self.reminder_feeling.is_some(),
            DiscoveryQuestion::AutoChangePreference => self.auto_change_preference.is_some(),
            DiscoveryQuestion::SelfRecognitionTags => self.self_recognition_tags.is_some(),
        }
    }

    fn source_of(&self, question: DiscoveryQuestion) -> Option<SignalSource> {
        match question {
            DiscoveryQuestion::DensityChoice => self.density_choice.as_ref().map(|e| e.source),
            DiscoveryQuestion::TaskOrganization => self.task_organization.as_ref().map(|e| e.source),
            DiscoveryQuestion::ChangeTolerance => self.change_tolerance.as_ref().map(|e| e.source),
            DiscoveryQuestion::ProgressVisualization => {
                self.progress_visualization.as_ref().map(|e| e.source)
            }
            DiscoveryQuestion::PileUpResponse => self.pile_up_response.as_ref().map(|e| e.source),
            DiscoveryQuestion::ReminderFeeling => self.reminder_feeling.as_ref().map(|e| e.source),
            DiscoveryQuestion::AutoChangePreference => {
                self.auto_change_preference.as_ref().map(|e| e.source)
            }
            DiscoveryQuestion::SelfRecognitionTags => {
                self.self_recognition_tags.as_ref().map(|e| e.source)
            }
        }
    }
}

/// Writes answers into a signals bag. Last answer wins.
pub struct SignalRecorder<'a> {
    signals: &'a mut CognitiveDiscoverySignals,
}

impl<'a> SignalRecorder<'a> {
    pub fn new(signals: &'a mut CognitiveDiscoverySignals) -> Self {
        Self { signals }
    }

    /// Record an answer, overwriting any earlier one for the same question.
    ///
    /// Elapsed time is dropped for untimed questions.
    pub fn record(&mut self, answer: SignalAnswer, elapsed_ms: Option<u64>) {
        let elapsed_ms = elapsed_ms.filter(|_| answer.question().is_timed());
        self.write(answer, elapsed_ms, SignalSource::Answered);
    }

    /// Write the documented default for `question`, unless it already holds
    /// a real answer. Returns whether the default was written.
    pub fn skip(&mut self, question: DiscoveryQuestion) -> bool {
        if self.signals.source_of(question) == Some(SignalSource::Answered) {
            return false;
        }
        self.write(SignalAnswer::skip_default(question), None, SignalSource::Skipped);
        true
    }

    fn write(&mut self, answer: SignalAnswer, elapsed_ms: Option<u64>, source: SignalSource) {
        let s = &mut *self.signals;
        match answer {
            SignalAnswer::Density(v) => put(&mut s.density_choice, v, elapsed_ms, source),
            SignalAnswer::TaskOrganization(v) => put(&mut s.task_organization, v, elapsed_ms, source),
            SignalAnswer::ChangeTolerance(v) => put(&mut s.change_tolerance, v, elapsed_ms, source),
            SignalAnswer::ProgressVisualization(v) => {
                put(&mut s.progress_visualization, v, elapsed_ms, source)
            }
            SignalAnswer::PileUpResponse(v) => put(&mut s.pile_up_response, v, elapsed_ms, source),
            SignalAnswer::ReminderFeeling(v) => put(&mut s.reminder_feeling, v, elapsed_ms, source),
            SignalAnswer::AutoChangePreference(v) => {
                put(&mut s.auto_change_preference, v, elapsed_ms, source)
            }
            SignalAnswer::SelfRecognition(tags) => {
                let mut unique = Vec::with_capacity(tags.len());
                for tag in tags {
                    if !unique.contains(&tag) {
                        unique.push(tag);
                    }
                }
                put(&mut s.self_recognition_tags, unique, None, source)
            }
        }
    }
}

fn put<T: PartialEq>(
    slot: &mut Option<SignalEntry<T>>,
    value: T,
    elapsed_ms: Option<u64>,
    source: SignalSource,
) {
    let revisions = match slot.as_ref() {
        Some(prev)
            if prev.source == SignalSource::Answered && source == SignalSource::Answered =>
        {
            if prev.value == value {
                prev.revisions
            } else {
                prev.revisions + 1
            }
        }
        _ => 0,
    };
    *slot = Some(SignalEntry {
        value,
        elapsed_ms,
        source,
        revisions,
    });
}

/// Measures decision time from the moment a question step becomes visible.
#[derive(Debug, Clone, Default)]
pub struct QuestionTimer {
    shown: Option<(DiscoveryQuestion, DateTime<Utc>)>,
}

impl QuestionTimer {
    /// Start timing `question`, or stop timing when the new step asks nothing.
    pub fn show(&mut self, question: Option<DiscoveryQuestion>, now: DateTime<Utc>) {
        self.shown = question.map(|q| (q, now));
    }

    /// Milliseconds since `question` was shown, if it is the one on screen.
    pub fn elapsed_ms(&self, question: DiscoveryQuestion, now: DateTime<Utc>) -> Option<u64> {
        match self.shown {
            Some((shown, at)) if shown == question && question.is_timed() => {
                u64::try_from((now - at).num_milliseconds()).ok()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn record_overwrites_previous_answer() {
        let mut signals = CognitiveDiscoverySignals::default();
        let mut recorder = SignalRecorder::new(&mut signals);
        recorder.record(SignalAnswer::Density(DensityChoice::Minimal), Some(3000));
        recorder.record(SignalAnswer::Density(DensityChoice::Dense), Some(900));

        let entry = signals.density_choice.unwrap();
        assert_eq!(entry.value, DensityChoice::Dense);
        assert_eq!(entry.elapsed_ms, Some(900));
        assert_eq!(entry.source, SignalSource::Answered);
        assert_eq!(entry.revisions, 1);
    }

    #[test]
    fn same_answer_twice_is_not_a_revision() {
        let mut signals = CognitiveDiscoverySignals::default();
        let mut recorder = SignalRecorder::new(&mut signals);
        recorder.record(SignalAnswer::ReminderFeeling(ReminderFeeling::Helpful), Some(500));
        recorder.record(SignalAnswer::ReminderFeeling(ReminderFeeling::Helpful), Some(700));
        assert_eq!(signals.reminder_feeling.unwrap().revisions, 0);
    }

    #[test]
    fn skip_writes_documented_defaults() {
        let expected = [
            (DiscoveryQuestion::DensityChoice, "adaptive"),
            (DiscoveryQuestion::TaskOrganization, "hybrid"),
            (DiscoveryQuestion::ChangeTolerance, "medium"),
            (DiscoveryQuestion::ProgressVisualization, "milestones"),
            (DiscoveryQuestion::PileUpResponse, "reprioritize"),
            (DiscoveryQuestion::ReminderFeeling, "neutral"),
            (DiscoveryQuestion::AutoChangePreference, "suggest_first"),
        ];

        let mut signals = CognitiveDiscoverySignals::default();
        for (question, _) in expected {
            assert!(!signals.has(question));
            assert!(SignalRecorder::new(&mut signals).skip(question));
            assert!(signals.has(question), "{question} should be set after skip");
        }
        assert!(SignalRecorder::new(&mut signals).skip(DiscoveryQuestion::SelfRecognitionTags));

        let json = serde_json::to_value(&signals).unwrap();
        for (question, value) in expected {
            assert_eq!(json[question.as_str()]["value"], value);
            assert_eq!(json[question.as_str()]["source"], "skipped");
        }
        assert_eq!(json["self_recognition_tags"]["value"], serde_json::json!([]));
    }

    #[test]
    fn skip_keeps_a_real_answer() {
        let mut signals = CognitiveDiscoverySignals::default();
        let mut recorder = SignalRecorder::new(&mut signals);
        recorder.record(SignalAnswer::ChangeTolerance(ChangeTolerance::High), Some(1200));
        assert!(!recorder.skip(DiscoveryQuestion::ChangeTolerance));
        assert_eq!(signals.change_tolerance.unwrap().value, ChangeTolerance::High);
    }

    #[test]
    fn answering_after_skip_starts_fresh_revision_count() {
        let mut signals = CognitiveDiscoverySignals::default();
        let mut recorder = SignalRecorder::new(&mut signals);
        recorder.skip(DiscoveryQuestion::TaskOrganization);
        recorder.record(SignalAnswer::TaskOrganization(TaskOrganization::Board), Some(2000));
        let entry = signals.task_organization.unwrap();
        assert_eq!(entry.source, SignalSource::Answered);
        assert_eq!(entry.revisions, 0);
    }

    #[test]
    fn parse_rejects_values_outside_the_enumeration() {
        let err = SignalAnswer::parse(DiscoveryQuestion::DensityChoice, "extreme").unwrap_err();
        assert_eq!(
            err,
            OnboardingError::InvalidSignalValue {
                question: "density_choice".into(),
                value: "extreme".into(),
            }
        );
    }

    #[test]
    fn self_recognition_tags_are_untimed_and_deduplicated() {
        let mut signals = CognitiveDiscoverySignals::default();
        let answer = SignalAnswer::parse(
            DiscoveryQuestion::SelfRecognitionTags,
            "perfectionist, hyperfocus,perfectionist",
        )
        .unwrap();
        SignalRecorder::new(&mut signals).record(answer, Some(4000));
        let entry = signals.self_recognition_tags.unwrap();
        assert_eq!(
            entry.value,
            vec![SelfRecognitionTag::Perfectionist, SelfRecognitionTag::Hyperfocus]
        );
        assert_eq!(entry.elapsed_ms, None);
    }

    #[test]
    fn question_parses_both_spellings() {
        assert_eq!(
            "densityChoice".parse::<DiscoveryQuestion>().unwrap(),
            DiscoveryQuestion::DensityChoice
        );
        assert_eq!(
            "pile_up_response".parse::<DiscoveryQuestion>().unwrap(),
            DiscoveryQuestion::PileUpResponse
        );
        assert!("favouriteColour".parse::<DiscoveryQuestion>().is_err());
    }

    #[test]
    fn timer_measures_only_the_visible_question() {
        let start = Utc::now();
        let mut timer = QuestionTimer::default();
        timer.show(Some(DiscoveryQuestion::DensityChoice), start);

        let later = start + Duration::milliseconds(800);
        assert_eq!(timer.elapsed_ms(DiscoveryQuestion::DensityChoice, later), Some(800));
        assert_eq!(timer.elapsed_ms(DiscoveryQuestion::ChangeTolerance, later), None);

        timer.show(None, later);
        assert_eq!(timer.elapsed_ms(DiscoveryQuestion::DensityChoice, later), None);
    }

    #[test]
    fn absent_signals_are_omitted_from_json() {
        let json = serde_json::to_value(CognitiveDiscoverySignals::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
