//! Cognitive profile: rule-based traits derived from discovery signals.
//!
//! `build` is a pure function of the signals. The stated answer always
//! decides a trait's value; decision time and secondary signals only move
//! the confidence, or fill in a trait whose question was skipped.

use serde::{Deserialize, Serialize};

use super::signals::{
    AutoChangePreference, ChangeTolerance, CognitiveDiscoverySignals, DensityChoice,
    PileUpResponse, ProgressVisualization, ReminderFeeling, SelfRecognitionTag, SignalEntry,
    SignalSource, TaskOrganization,
};

/// Answers faster than this read as a strong preference.
pub const FAST_CHOICE_MS: u64 = 1_500;
/// Answers slower than this read as a hesitant one.
pub const SLOW_CHOICE_MS: u64 = 8_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Value came from a skip default or was never asked.
    Default,
    Low,
    Moderate,
    High,
}

impl Confidence {
    fn lowered(self) -> Self {
        match self {
            Self::High => Self::Moderate,
            Self::Moderate | Self::Low => Self::Low,
            Self::Default => Self::Default,
        }
    }

    fn raised(self) -> Self {
        match self {
            Self::Low => Self::Moderate,
            Self::Moderate | Self::High => Self::High,
            Self::Default => Self::Default,
        }
    }
}

/// One resolved trait with how it was derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileTrait<T> {
    pub value: T,
    pub confidence: Confidence,
    pub derivation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityPreference {
    Minimal,
    Balanced,
    Dense,
    Adaptive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructurePreference {
    Sequential,
    TimeBoxed,
    Visual,
    Flexible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityPreference {
    Stable,
    Gradual,
    Exploratory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStyle {
    Streaks,
    Bars,
    Milestones,
    Quiet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneHandling {
    Gentle,
    Encouraging,
    Direct,
}

/// The derived profile. Never stored; rebuild it from the signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CognitiveProfile {
    pub information_density: ProfileTrait<DensityPreference>,
    pub task_structure: ProfileTrait<StructurePreference>,
    pub change_pacing: ProfileTrait<StabilityPreference>,
    pub progress_visualization: ProfileTrait<ProgressStyle>,
    pub emotional_tone: ProfileTrait<ToneHandling>,
}

/// Build a complete profile from a signals snapshot.
pub fn build(signals: &CognitiveDiscoverySignals) -> CognitiveProfile {
    CognitiveProfile {
        information_density: density_trait(signals),
        task_structure: structure_trait(signals),
        change_pacing: stability_trait(signals),
        progress_visualization: progress_trait(signals),
        emotional_tone: tone_trait(signals),
    }
}

/// Confidence implied by how an answer was given.
fn timing_confidence<T>(entry: &SignalEntry<T>) -> Confidence {
    if entry.source == SignalSource::Skipped {
        return Confidence::Default;
    }
    let base = match entry.elapsed_ms {
        Some(ms) if ms < FAST_CHOICE_MS => Confidence::High,
        Some(ms) if ms <= SLOW_CHOICE_MS => Confidence::Moderate,
        Some(_) => Confidence::Low,
        None => Confidence::Moderate,
    };
    if entry.revisions > 0 {
        base.lowered()
    } else {
        base
    }
}

fn describe<T: std::fmt::Display>(entry: &SignalEntry<T>) -> String {
    let mut text = match (entry.source, entry.elapsed_ms) {
        (SignalSource::Skipped, _) => format!("skipped; using default \"{}\"", entry.value),
        (SignalSource::Answered, Some(ms)) => format!("answered \"{}\" in {ms}ms", entry.value),
        (SignalSource::Answered, None) => format!("answered \"{}\"", entry.value),
    };
    if entry.revisions > 0 {
        text.push_str(&format!(" after {} change(s)", entry.revisions));
    }
    text
}

fn has_tag(signals: &CognitiveDiscoverySignals, tag: SelfRecognitionTag) -> bool {
    signals
        .self_recognition_tags
        .as_ref()
        .is_some_and(|e| e.value.contains(&tag))
}

const NOT_ASKED: &str = "not asked; using default";

fn density_trait(signals: &CognitiveDiscoverySignals) -> ProfileTrait<DensityPreference> {
    let Some(entry) = signals.density_choice.as_ref() else {
        return ProfileTrait {
            value: DensityPreference::Adaptive,
            confidence: Confidence::Default,
            derivation: NOT_ASKED.to_string(),
        };
    };
    let value = match entry.value {
        DensityChoice::Minimal => DensityPreference::Minimal,
        DensityChoice::Balanced => DensityPreference::Balanced,
        DensityChoice::Dense => DensityPreference::Dense,
        DensityChoice::Adaptive => DensityPreference::Adaptive,
    };
    ProfileTrait {
        value,
        confidence: timing_confidence(entry),
        derivation: describe(entry),
    }
}

fn structure_trait(signals: &CognitiveDiscoverySignals) -> ProfileTrait<StructurePreference> {
    let Some(entry) = signals.task_organization.as_ref() else {
        return ProfileTrait {
            value: StructurePreference::Flexible,
            confidence: Confidence::Default,
            derivation: NOT_ASKED.to_string(),
        };
    };
    let value = match entry.value {
        TaskOrganization::Lists => StructurePreference::Sequential,
        TaskOrganization::TimeBlocks => StructurePreference::TimeBoxed,
        TaskOrganization::Board => StructurePreference::Visual,
        TaskOrganization::Hybrid => StructurePreference::Flexible,
    };
    ProfileTrait {
        value,
        confidence: timing_confidence(entry),
        derivation: describe(entry),
    }
}

fn stability_from_auto_change(pref: AutoChangePreference) -> StabilityPreference {
    match pref {
        AutoChangePreference::AlwaysAsk => StabilityPreference::Stable,
        AutoChangePreference::SuggestFirst => StabilityPreference::Gradual,
        AutoChangePreference::JustDoIt => StabilityPreference::Exploratory,
    }
}

fn stability_trait(signals: &CognitiveDiscoverySignals) -> ProfileTrait<StabilityPreference> {
    if let Some(entry) = signals
        .change_tolerance
        .as_ref()
        .filter(|e| e.source == SignalSource::Answered)
    {
        let value = match entry.value {
            ChangeTolerance::Low => StabilityPreference::Stable,
            ChangeTolerance::Medium => StabilityPreference::Gradual,
            ChangeTolerance::High => StabilityPreference::Exploratory,
        };
        let mut confidence = timing_confidence(entry);
        let mut derivation = describe(entry);
        if let Some(auto) = signals
            .auto_change_preference
            .as_ref()
            .filter(|e| e.source == SignalSource::Answered)
        {
            if stability_from_auto_change(auto.value) == value {
                confidence = confidence.raised();
                derivation.push_str(&format!("; corroborated by \"{}\"", auto.value));
            }
        }
        return ProfileTrait {
            value,
            confidence,
            derivation,
        };
    }

    // Stated tolerance missing or skipped: lean on secondary signals.
    if let Some(auto) = signals
        .auto_change_preference
        .as_ref()
        .filter(|e| e.source == SignalSource::Answered)
    {
        return ProfileTrait {
            value: stability_from_auto_change(auto.value),
            confidence: Confidence::Low,
            derivation: format!("inferred from auto-change preference \"{}\"", auto.value),
        };
    }
    if has_tag(signals, SelfRecognitionTag::NeedsNovelty) {
        return ProfileTrait {
            value: StabilityPreference::Exploratory,
            confidence: Confidence::Low,
            derivation: "inferred from self-recognition \"needs_novelty\"".to_string(),
        };
    }

    ProfileTrait {
        value: StabilityPreference::Gradual,
        confidence: Confidence::Default,
        derivation: match signals.change_tolerance.as_ref() {
            Some(entry) => describe(entry),
            None => NOT_ASKED.to_string(),
        },
    }
}

fn progress_trait(signals: &CognitiveDiscoverySignals) -> ProfileTrait<ProgressStyle> {
    let Some(entry) = signals.progress_visualization.as_ref() else {
        return ProfileTrait {
            value: ProgressStyle::Milestones,
            confidence: Confidence::Default,
            derivation: NOT_ASKED.to_string(),
        };
    };
    let value = match entry.value {
        ProgressVisualization::Streaks => ProgressStyle::Streaks,
        ProgressVisualization::ProgressBars => ProgressStyle::Bars,
        ProgressVisualization::Milestones => ProgressStyle::Milestones,
        ProgressVisualization::Minimal => ProgressStyle::Quiet,
    };
    ProfileTrait {
        value,
        confidence: timing_confidence(entry),
        derivation: describe(entry),
    }
}

fn tone_trait(signals: &CognitiveDiscoverySignals) -> ProfileTrait<ToneHandling> {
    let finds_reminders_nagging = signals
        .reminder_feeling
        .as_ref()
        .is_some_and(|e| e.source == SignalSource::Answered && e.value == ReminderFeeling::Nagging);
    let overwhelm_tags = has_tag(signals, SelfRecognitionTag::EasilyOverwhelmed)
        || has_tag(signals, SelfRecognitionTag::Perfectionist);

    if let Some(entry) = signals
        .pile_up_response
        .as_ref()
        .filter(|e| e.source == SignalSource::Answered)
    {
        let value = match entry.value {
            PileUpResponse::FreezeUp | PileUpResponse::StepAway => ToneHandling::Gentle,
            PileUpResponse::Reprioritize => ToneHandling::Encouraging,
            PileUpResponse::PushThrough => ToneHandling::Direct,
        };
        let mut confidence = timing_confidence(entry);
        let mut derivation = describe(entry);
        // Conflicting evidence weakens a direct tone but never replaces it.
        if value == ToneHandling::Direct && (finds_reminders_nagging || overwhelm_tags) {
            confidence = confidence.lowered();
            derivation.push_str("; tempered by sensitivity to pressure");
        }
        return ProfileTrait {
            value,
            confidence,
            derivation,
        };
    }

    if finds_reminders_nagging || overwhelm_tags {
        return ProfileTrait {
            value: ToneHandling::Gentle,
            confidence: Confidence::Low,
            derivation: "inferred from reminder feeling and self-recognition".to_string(),
        };
    }

    ProfileTrait {
        value: ToneHandling::Encouraging,
        confidence: Confidence::Default,
        derivation: match signals.pile_up_response.as_ref() {
            Some(entry) => describe(entry),
            None => NOT_ASKED.to_string(),
        },
    }
}
