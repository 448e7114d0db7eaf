//! Step identifiers and the per-mode step sequences.
//!
//! The sequencer only ever deals in `StepId` values. What a step looks like
//! is the caller's business; `StepId::kind` and `StepId::question` are the
//! only hooks a renderer needs.

use serde::{Deserialize, Serialize};

use super::model::SetupMode;
use super::signals::DiscoveryQuestion;

/// Every step that can appear in any onboarding sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Welcome,
    SafetyIntro,
    ModeSelect,
    Name,
    AssistantStyle,
    Tone,
    Autonomy,
    Voice,
    Goals,
    DailyRhythm,
    EnergyPattern,
    DensityChoice,
    TaskOrganization,
    ChangeTolerance,
    ProgressVisualization,
    PileUpResponse,
    ReminderFeeling,
    AutoChangePreference,
    SelfRecognition,
    WorkStyle,
    Automations,
    Integrations,
    Notifications,
    AdaptationPreview,
    Review,
    Complete,
}

/// Broad category of a step, enough to pick a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Intro,
    ModeChoice,
    Input,
    Discovery,
    Preview,
    Review,
    Terminal,
}

impl StepId {
    pub fn kind(&self) -> StepKind {
        use StepId::*;
        match self {
            Welcome | SafetyIntro => StepKind::Intro,
            ModeSelect => StepKind::ModeChoice,
            AdaptationPreview => StepKind::Preview,
            Review => StepKind::Review,
            Complete => StepKind::Terminal,
            _ if self.question().is_some() => StepKind::Discovery,
            _ => StepKind::Input,
        }
    }

    /// The discovery question this step collects, if any.
    pub fn question(&self) -> Option<DiscoveryQuestion> {
        use StepId::*;
        match self {
            DensityChoice => Some(DiscoveryQuestion::DensityChoice),
            TaskOrganization => Some(DiscoveryQuestion::TaskOrganization),
            ChangeTolerance => Some(DiscoveryQuestion::ChangeTolerance),
            ProgressVisualization => Some(DiscoveryQuestion::ProgressVisualization),
            PileUpResponse => Some(DiscoveryQuestion::PileUpResponse),
            ReminderFeeling => Some(DiscoveryQuestion::ReminderFeeling),
            AutoChangePreference => Some(DiscoveryQuestion::AutoChangePreference),
            SelfRecognition => Some(DiscoveryQuestion::SelfRecognitionTags),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        use StepId::*;
        match self {
            Welcome => "Welcome",
            SafetyIntro => "Your data, your rules",
            ModeSelect => "How much time do you have?",
            Name => "What should we call you?",
            AssistantStyle => "Pick an assistant style",
            Tone => "How should it talk to you?",
            Autonomy => "How much should it do on its own?",
            Voice => "Voice",
            Goals => "What are you working toward?",
            DailyRhythm => "When do you focus best?",
            EnergyPattern => "How does your energy run?",
            DensityChoice => "How much on screen at once?",
            TaskOrganization => "How do you organize tasks?",
            ChangeTolerance => "How do you feel about change?",
            ProgressVisualization => "How do you like to see progress?",
            PileUpResponse => "When things pile up...",
            ReminderFeeling => "Reminders feel...",
            AutoChangePreference => "When we could improve something...",
            SelfRecognition => "Any of these sound like you?",
            WorkStyle => "Solo or together?",
            Automations => "Start with a few automations",
            Integrations => "Connect your tools",
            Notifications => "How often should we nudge you?",
            AdaptationPreview => "Here's how we'll adapt",
            Review => "Review",
            Complete => "All set",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // serde and Display share the snake_case name
        let json = serde_json::to_value(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json.as_str().unwrap_or_default())
    }
}

const QUICK: [StepId; 7] = [
    StepId::Welcome,
    StepId::SafetyIntro,
    StepId::ModeSelect,
    StepId::Name,
    StepId::AssistantStyle,
    StepId::Goals,
    StepId::Complete,
];

const GUIDED: [StepId; 18] = [
    StepId::Welcome,
    StepId::SafetyIntro,
    StepId::ModeSelect,
    StepId::Name,
    StepId::AssistantStyle,
    StepId::Tone,
    StepId::Voice,
    StepId::Goals,
    StepId::DensityChoice,
    StepId::TaskOrganization,
    StepId::ChangeTolerance,
    StepId::ProgressVisualization,
    StepId::ReminderFeeling,
    StepId::Automations,
    StepId::Integrations,
    StepId::AdaptationPreview,
    StepId::Review,
    StepId::Complete,
];

const DEEP: [StepId; 26] = [
    StepId::Welcome,
    StepId::SafetyIntro,
    StepId::ModeSelect,
    StepId::Name,
    StepId::AssistantStyle,
    StepId::Tone,
    StepId::Autonomy,
    StepId::Voice,
    StepId::Goals,
    StepId::DailyRhythm,
    StepId::EnergyPattern,
    StepId::DensityChoice,
    StepId::TaskOrganization,
    StepId::ChangeTolerance,
    StepId::ProgressVisualization,
    StepId::PileUpResponse,
    StepId::ReminderFeeling,
    StepId::AutoChangePreference,
    StepId::SelfRecognition,
    StepId::WorkStyle,
    StepId::Automations,
    StepId::Integrations,
    StepId::Notifications,
    StepId::AdaptationPreview,
    StepId::Review,
    StepId::Complete,
];

/// Pure lookups over the three fixed step sequences.
pub struct StepSequencer;

impl StepSequencer {
    /// Index of the mode-selection step. Identical in every mode.
    pub const MODE_SELECT_INDEX: usize = 2;

    pub fn steps_for(mode: SetupMode) -> &'static [StepId] {
        match mode {
            SetupMode::Quick => &QUICK,
            SetupMode::Guided => &GUIDED,
            SetupMode::Deep => &DEEP,
        }
    }

    pub fn len(mode: SetupMode) -> usize {
        Self::steps_for(mode).len()
    }

    pub fn terminal_index(mode: SetupMode) -> usize {
        Self::len(mode) - 1
    }

    /// Step at `index`, clamped into the sequence.
    pub fn step_at(mode: SetupMode, index: usize) -> StepId {
        let steps = Self::steps_for(mode);
        steps[index.min(steps.len() - 1)]
    }

    pub fn next(mode: SetupMode, index: usize) -> usize {
        (index + 1).min(Self::terminal_index(mode))
    }

    pub fn prev(_mode: SetupMode, index: usize) -> usize {
        index.saturating_sub(1)
    }

    pub fn is_terminal(mode: SetupMode, index: usize) -> bool {
        index == Self::terminal_index(mode)
    }

    /// Map a position in one mode's sequence onto another mode's sequence.
    ///
    /// Resolves by step identity when the step exists in both; otherwise
    /// keeps the position, clamped to the new sequence.
    pub fn resolve(from: SetupMode, index: usize, to: SetupMode) -> usize {
        let step = Self::step_at(from, index);
        Self::steps_for(to)
            .iter()
            .position(|s| *s == step)
            .unwrap_or_else(|| index.min(Self::terminal_index(to)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const MODES: [SetupMode; 3] = [SetupMode::Quick, SetupMode::Guided, SetupMode::Deep];

    #[test]
    fn sequence_lengths() {
        assert_eq!(StepSequencer::len(SetupMode::Quick), 7);
        assert_eq!(StepSequencer::len(SetupMode::Guided), 18);
        assert_eq!(StepSequencer::len(SetupMode::Deep), 26);
    }

    #[test]
    fn sequences_are_deterministic_and_free_of_duplicates() {
        for mode in MODES {
            let a = StepSequencer::steps_for(mode);
            let b = StepSequencer::steps_for(mode);
            assert_eq!(a, b);
            assert!(!a.is_empty());
            let unique: HashSet<_> = a.iter().collect();
            assert_eq!(unique.len(), a.len(), "{mode} repeats a step");
        }
    }

    #[test]
    fn every_mode_shares_the_mandatory_prefix() {
        let prefix = [
            StepId::Welcome,
            StepId::SafetyIntro,
            StepId::ModeSelect,
            StepId::Name,
        ];
        for mode in MODES {
            assert_eq!(&StepSequencer::steps_for(mode)[..4], &prefix);
            assert_eq!(
                StepSequencer::steps_for(mode)[StepSequencer::MODE_SELECT_INDEX],
                StepId::ModeSelect
            );
            assert_eq!(
                StepSequencer::step_at(mode, StepSequencer::terminal_index(mode)),
                StepId::Complete
            );
        }
    }

    #[test]
    fn shared_steps_keep_relative_order() {
        let deep = StepSequencer::steps_for(SetupMode::Deep);
        for mode in [SetupMode::Quick, SetupMode::Guided] {
            let positions: Vec<usize> = StepSequencer::steps_for(mode)
                .iter()
                .filter_map(|s| deep.iter().position(|d| d == s))
                .collect();
            assert!(
                positions.windows(2).all(|w| w[0] < w[1]),
                "{mode} orders a shared step differently from deep"
            );
        }
    }

    #[test]
    fn next_then_prev_round_trips_below_the_top() {
        for mode in MODES {
            let terminal = StepSequencer::terminal_index(mode);
            for index in 0..terminal {
                let next = StepSequencer::next(mode, index);
                assert_eq!(next, index + 1);
                assert_eq!(StepSequencer::prev(mode, next), index);
            }
            assert_eq!(StepSequencer::next(mode, terminal), terminal);
        }
    }

    #[test]
    fn prev_clamps_at_zero() {
        assert_eq!(StepSequencer::prev(SetupMode::Quick, 0), 0);
    }

    #[test]
    fn is_terminal_only_on_last_index() {
        for mode in MODES {
            let len = StepSequencer::len(mode);
            for index in 0..len {
                assert_eq!(StepSequencer::is_terminal(mode, index), index == len - 1);
            }
        }
    }

    #[test]
    fn resolve_by_identity_across_modes() {
        // density_choice is index 8 in guided, 11 in deep
        assert_eq!(StepSequencer::resolve(SetupMode::Guided, 8, SetupMode::Deep), 11);
        assert_eq!(
            StepSequencer::resolve(SetupMode::Guided, 2, SetupMode::Quick),
            StepSequencer::MODE_SELECT_INDEX
        );
    }

    #[test]
    fn resolve_clamps_when_step_is_missing() {
        // density_choice does not exist in quick
        assert_eq!(StepSequencer::resolve(SetupMode::Guided, 8, SetupMode::Quick), 6);
        assert_eq!(StepSequencer::resolve(SetupMode::Deep, 9, SetupMode::Quick), 6);
    }

    #[test]
    fn discovery_steps_expose_their_question() {
        assert_eq!(StepId::DensityChoice.kind(), StepKind::Discovery);
        assert_eq!(
            StepId::SelfRecognition.question(),
            Some(DiscoveryQuestion::SelfRecognitionTags)
        );
        assert_eq!(StepId::Name.kind(), StepKind::Input);
        assert_eq!(StepId::Name.question(), None);
        assert_eq!(StepId::Complete.kind(), StepKind::Terminal);
    }

    #[test]
    fn display_matches_serde() {
        assert_eq!(StepId::PileUpResponse.to_string(), "pile_up_response");
        assert_eq!(
            serde_json::to_string(&StepId::AdaptationPreview).unwrap(),
            "\"adaptation_preview\""
        );
    }
}
