//! Onboarding data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signals::CognitiveDiscoverySignals;

/// Which step sequence the user chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupMode {
    Quick,
    Guided,
    Deep,
}

impl Default for SetupMode {
    fn default() -> Self {
        Self::Guided
    }
}

impl std::fmt::Display for SetupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quick => write!(f, "quick"),
            Self::Guided => write!(f, "guided"),
            Self::Deep => write!(f, "deep"),
        }
    }
}

/// The assistant persona the user picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantStyle {
    Coach,
    #[default]
    Partner,
    Butler,
    Minimalist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Warm,
    Neutral,
    Direct,
    Playful,
}

/// How much the assistant may do without asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyLevel {
    AskFirst,
    #[default]
    Suggest,
    Autonomous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusWindow {
    Morning,
    Afternoon,
    Evening,
    #[default]
    Varies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyPattern {
    Steady,
    Sprints,
    #[default]
    Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStyle {
    Solo,
    Collaborative,
    #[default]
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Minimal,
    #[default]
    Balanced,
    Frequent,
}

/// Voice assistant settings. The wake-word pipeline itself lives elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub enabled: bool,
    pub wake_word: String,
    /// Speech rate multiplier, 1.0 = normal.
    pub speaking_rate: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            wake_word: "hey life".to_string(),
            speaking_rate: 1.0,
        }
    }
}

/// Everything collected during onboarding.
///
/// Every field has a default, so the record can be completed even when
/// steps were skipped.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingData {
    pub name: String,
    pub setup_mode: SetupMode,
    pub assistant_style: AssistantStyle,
    pub tone: Tone,
    pub autonomy_level: AutonomyLevel,
    pub voice: VoiceSettings,
    pub peak_focus: FocusWindow,
    pub energy_pattern: EnergyPattern,
    pub work_style: WorkStyle,
    pub notification_level: NotificationLevel,
    pub goals: Vec<String>,
    /// Enabled automation template ids.
    pub automations: Vec<String>,
    pub integrations: Vec<String>,
    pub cognitive_signals: CognitiveDiscoverySignals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl OnboardingData {
    /// Render the collected answers as a markdown summary for the review step.
    pub fn review_summary(&self) -> String {
        let mut parts = vec!["# Your setup".to_string()];

        parts.push(format!("- **Name:** {}", self.name));
        parts.push(format!("- **Setup:** {}", self.setup_mode));
        parts.push(format!(
            "- **Assistant:** {}, {} tone, {}",
            enum_label(&self.assistant_style),
            enum_label(&self.tone),
            enum_label(&self.autonomy_level)
        ));

        if self.voice.enabled {
            parts.push(format!("- **Voice:** on (\"{}\")", self.voice.wake_word));
        }

        if !self.goals.is_empty() {
            parts.push(format!("- **Goals:** {}", self.goals.join(", ")));
        }

        if !self.automations.is_empty() {
            parts.push(format!("- **Automations:** {}", self.automations.join(", ")));
        }

        if !self.integrations.is_empty() {
            parts.push(format!("- **Integrations:** {}", self.integrations.join(", ")));
        }

        parts.join("\n")
    }
}

fn enum_label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(|s| s.replace('_', " ")))
        .unwrap_or_default()
}

/// Settings keys for everything the onboarding flow writes locally.
pub mod settings_keys {
    /// In-progress checkpoint (`SavedProgress`).
    pub const ONBOARDING_PROGRESS: &str = "onboarding_progress";
    /// `"true"` once onboarding has completed; read by the app shell.
    pub const ONBOARDED: &str = "onboarded";
    /// Plain user name for quick personalization.
    pub const USER_NAME: &str = "user_name";
    /// Full finalized `OnboardingData`, the durability fallback.
    pub const ONBOARDING_DATA: &str = "onboarding_data";
}
