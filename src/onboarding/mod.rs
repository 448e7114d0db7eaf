//! Onboarding engine: step sequencing, discovery signals, the derived
//! cognitive profile, resumable progress and completion.
//!
//! `OnboardingSession` owns all state; everything else here is either a pure
//! function over that state or a port it talks through.

pub mod automations;
pub mod completion;
pub mod model;
pub mod preview;
pub mod profile;
pub mod progress;
pub mod remote;
pub mod routes;
pub mod session;
pub mod signals;
pub mod steps;

pub use automations::{AUTOMATION_CATALOG, AutomationTemplate, ToggleOutcome};
pub use completion::{
    CompletionCallback, CompletionObserver, CompletionPipeline, CompletionReport,
    PendingCompletion, ProfileBackend, RemoteOutcome, TracingObserver, is_onboarded,
    load_completed,
};
pub use model::{OnboardingData, SetupMode};
pub use preview::{AdaptationArea, PreviewEntry, preview, preview_entries};
pub use profile::{CognitiveProfile, Confidence, ProfileTrait, build as build_profile};
pub use progress::{ProgressStore, SavedProgress};
pub use remote::HostedProfileBackend;
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use session::{BlockReason, OnboardingSession, SessionDeps, SessionSnapshot, StepOutcome};
pub use signals::{
    CognitiveDiscoverySignals, DiscoveryQuestion, SignalAnswer, SignalEntry, SignalRecorder,
    SignalSource,
};
pub use steps::{StepId, StepKind, StepSequencer};
