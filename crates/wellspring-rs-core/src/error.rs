//! Error types for the core orchestration crate.

use std::time::Duration;
use thiserror::Error;
use wellspring_rs_profile::ProfileStoreError;
use wellspring_rs_protocol::ExpertDomain;

/// Failures of a single generation call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// The provider cannot be reached or refuses service.
    #[error("generation service unavailable: {0}")]
    Unavailable(String),
    /// The provider answered with an error for this call.
    #[error("generation failed: {0}")]
    Failed(String),
    /// The call exceeded its deadline.
    #[error("generation timed out after {0:?}")]
    TimedOut(Duration),
    /// The provider answered with no text.
    #[error("generation returned no text")]
    Empty,
}

impl GenerationError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, GenerationError::Unavailable(_))
    }
}

/// Failures of one expert responder.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExpertError {
    /// The generation call failed.
    #[error("{domain} expert generation failed: {source}")]
    Generation {
        domain: ExpertDomain,
        #[source]
        source: GenerationError,
    },
    /// The reply could not be read as an answer document.
    #[error("{domain} expert reply was unreadable: {reason}")]
    Degraded { domain: ExpertDomain, reason: String },
    /// The reply parsed but carried no content.
    #[error("{0} expert returned an empty answer")]
    EmptyAnswer(ExpertDomain),
    /// The expert did not answer before its deadline.
    #[error("{domain} expert timed out after {timeout:?}")]
    TimedOut {
        domain: ExpertDomain,
        timeout: Duration,
    },
}

/// Error taxonomy for request handling.
///
/// Only `GenerationUnavailable` reaches the caller, as an apology envelope.
/// The rest are recorded as degradations while the request still succeeds.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoreError {
    /// The generation service cannot be reached.
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(String),
    /// A structured reply fell through to its default value.
    #[error("extraction degraded for {shape}: {reason}")]
    ExtractionDegraded { shape: String, reason: String },
    /// A subsystem or expert produced nothing usable and was left out.
    #[error("{subsystem} omitted: {reason}")]
    SubsystemOmitted { subsystem: String, reason: String },
    /// The routing decision was missing or contradictory fields.
    #[error("routing ambiguous: {0}")]
    RoutingAmbiguous(String),
    /// A required subsystem has no registered handler.
    #[error("unknown subsystem: {0}")]
    UnknownSubsystem(String),
    /// Profile storage failed.
    #[error("profile store error: {0}")]
    Profile(String),
}

impl From<ProfileStoreError> for CoreError {
    fn from(err: ProfileStoreError) -> Self {
        CoreError::Profile(err.to_string())
    }
}
