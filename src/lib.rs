//! Life OS onboarding: first-run setup flow and cognitive adaptation.

pub mod clock;
pub mod config;
pub mod error;
pub mod onboarding;
pub mod store;
