//! Error types for the onboarding engine.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Onboarding error: {0}")]
    Onboarding(#[from] OnboardingError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Caller-contract violations raised by the onboarding session.
///
/// Boundary navigation (retreating below the floor, advancing past the
/// terminal step) is clamped and never produces one of these.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OnboardingError {
    #[error("Cannot complete onboarding from step {step}; the terminal step has not been reached")]
    NotAtTerminal { step: String },

    #[error("Onboarding has already been completed")]
    AlreadyCompleted,

    #[error("Step {step} does not collect the {question} signal")]
    SignalNotCollected { step: String, question: String },

    #[error("Unknown discovery question: {0}")]
    UnknownQuestion(String),

    #[error("Invalid value {value:?} for discovery question {question}")]
    InvalidSignalValue { question: String, value: String },

    #[error("No saved progress is waiting to be resumed")]
    NoPendingResume,

    #[error("Saved progress was found; choose to resume or start fresh first")]
    ResumeDecisionPending,
}

/// Failures from the hosted persistence backend.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("{operation} request failed: {reason}")]
    Request { operation: String, reason: String },

    #[error("{operation} rejected with status {status}: {body}")]
    Rejected {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Remote save timed out after {0:?}")]
    Timeout(Duration),
}

impl RemoteError {
    /// Whether the backend refused the payload itself (4xx), as opposed to a
    /// transport problem or server-side outage.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if (400..500).contains(status))
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
