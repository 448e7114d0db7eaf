//! Adaptation preview: what the user is told the system will do for them.
//!
//! Reads only the derived `CognitiveProfile`, never the raw signals.

use serde::Serialize;

use super::profile::{
    CognitiveProfile, Confidence, DensityPreference, ProfileTrait, ProgressStyle,
    StabilityPreference, StructurePreference, ToneHandling,
};

/// The area of behavior a preview statement covers, in display priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationArea {
    Density,
    TaskStructure,
    ChangePacing,
    ProgressVisualization,
    EmotionalTone,
}

/// One preview statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewEntry {
    pub area: AdaptationArea,
    pub confidence: Confidence,
    pub text: String,
}

/// Ordered preview statements, one per trait.
pub fn preview_entries(profile: &CognitiveProfile) -> Vec<PreviewEntry> {
    vec![
        entry(
            AdaptationArea::Density,
            &profile.information_density,
            density_text,
        ),
        entry(
            AdaptationArea::TaskStructure,
            &profile.task_structure,
            structure_text,
        ),
        entry(
            AdaptationArea::ChangePacing,
            &profile.change_pacing,
            pacing_text,
        ),
        entry(
            AdaptationArea::ProgressVisualization,
            &profile.progress_visualization,
            progress_text,
        ),
        entry(
            AdaptationArea::EmotionalTone,
            &profile.emotional_tone,
            tone_text,
        ),
    ]
}

/// Ordered, human-readable preview lines.
pub fn preview(profile: &CognitiveProfile) -> Vec<String> {
    preview_entries(profile)
        .into_iter()
        .map(|e| e.text)
        .collect()
}

fn entry<T: Copy>(
    area: AdaptationArea,
    profile_trait: &ProfileTrait<T>,
    text: fn(T) -> &'static str,
) -> PreviewEntry {
    let statement = text(profile_trait.value);
    let text = match profile_trait.confidence {
        Confidence::Default => format!("{statement} (a starting point we'll tune as we learn)"),
        Confidence::Low => format!("{statement} (we'll check in on this early)"),
        Confidence::Moderate | Confidence::High => statement.to_string(),
    };
    PreviewEntry {
        area,
        confidence: profile_trait.confidence,
        text,
    }
}

fn density_text(value: DensityPreference) -> &'static str {
    match value {
        DensityPreference::Minimal => {
            "Your dashboard will show only what matters right now, with details a tap away."
        }
        DensityPreference::Balanced => {
            "Your dashboard will balance today's essentials with a short look ahead."
        }
        DensityPreference::Dense => {
            "Your dashboard will show rich, information-dense views so you can see everything at once."
        }
        DensityPreference::Adaptive => {
            "Your dashboard will adjust how much it shows based on how busy your day is."
        }
    }
}

fn structure_text(value: StructurePreference) -> &'static str {
    match value {
        StructurePreference::Sequential => "Tasks will be organized as simple ordered lists.",
        StructurePreference::TimeBoxed => "Tasks will be laid out in time blocks on your calendar.",
        StructurePreference::Visual => "Tasks will be grouped on a visual board by status.",
        StructurePreference::Flexible => {
            "Tasks will mix lists and time blocks, whichever fits the moment."
        }
    }
}

fn pacing_text(value: StabilityPreference) -> &'static str {
    match value {
        StabilityPreference::Stable => {
            "Layouts and routines will stay put; changes will always be proposed first."
        }
        StabilityPreference::Gradual => "New features and changes will be introduced gradually.",
        StabilityPreference::Exploratory => {
            "We'll try new layouts and ideas with you often and keep what works."
        }
    }
}

fn progress_text(value: ProgressStyle) -> &'static str {
    match value {
        ProgressStyle::Streaks => "Progress will be tracked with daily streaks.",
        ProgressStyle::Bars => "Progress will be shown with progress bars toward each goal.",
        ProgressStyle::Milestones => "Progress will be marked by milestones as you reach them.",
        ProgressStyle::Quiet => "Progress tracking will stay quiet and out of your way.",
    }
}

fn tone_text(value: ToneHandling) -> &'static str {
    match value {
        ToneHandling::Gentle => {
            "When things pile up, we'll keep it gentle and help you pick one small next step."
        }
        ToneHandling::Encouraging => {
            "When things pile up, we'll help you reprioritize with encouragement."
        }
        ToneHandling::Direct => "When things pile up, we'll be direct about what needs doing.",
    }
}
