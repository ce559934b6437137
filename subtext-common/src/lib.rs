//! Common types and utilities shared across Subtext crates.
//!
//! This crate defines the shared error type and observability helpers used
//! throughout the Subtext workspace. It stays dependency-light so every crate
//! can depend on it.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`SubtextError`] and [`Result`]: Shared error handling
//! - [`FailureKind`]: the three user-visible failure families
//! - [`schema::SchemaVersion`]: the versioned JSON display contracts
//!
//! # Examples
//!
//! ```rust
//! use subtext_common::{FailureKind, SubtextError};
//!
//! let err = SubtextError::RateLimit;
//! assert_eq!(err.kind(), FailureKind::Provider);
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;
pub mod schema;

pub use schema::SchemaVersion;

/// Error types used across the Subtext system.
#[derive(thiserror::Error, Debug)]
pub enum SubtextError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,

    /// The provider throttled the request.
    #[error("Rate limit exceeded")]
    RateLimit,

    /// The provider rejected the credential.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The provider answered with an error or an unusable payload.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Text could not be acquired from the given source.
    #[error("Acquisition error: {0}")]
    Acquisition(String),

    /// The requested action does not fit the current session state.
    #[error("Session error: {0}")]
    Session(String),
}

/// Failure families surfaced to the user. Every failure is terminal for the
/// action that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Fetching or extracting a page failed; the user should paste the text.
    Acquisition,
    /// The model answered with something that is not the expected JSON.
    MalformedOutput,
    /// Rate limit, auth, timeout, network or any other provider failure.
    Provider,
    /// Misuse of the session (e.g. replying before analyzing).
    Usage,
}

impl SubtextError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SubtextError::Acquisition(_) => FailureKind::Acquisition,
            SubtextError::Session(_) | SubtextError::Config(_) => FailureKind::Usage,
            SubtextError::Network(_)
            | SubtextError::Timeout
            | SubtextError::RateLimit
            | SubtextError::Auth(_)
            | SubtextError::Provider(_) => FailureKind::Provider,
        }
    }
}

/// Convenient alias for results that use [`SubtextError`].
pub type Result<T> = std::result::Result<T, SubtextError>;
