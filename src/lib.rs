//! KYC Onboarding — identity, phone and PIN verification workflow.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod telemetry;
