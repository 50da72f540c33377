//! Error taxonomy shared by the agents, the orchestrator and the adapters.

use thiserror::Error;

/// A failed call to the completion primitive.
///
/// This is never retried by the core and never masked: the lecture stops at
/// the turn where it happened.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionFailure {
    #[error("completion transport error: {0}")]
    Transport(String),
    #[error("completion rate limited: {0}")]
    RateLimited(String),
    #[error("completion authentication failed: {0}")]
    Auth(String),
    #[error("malformed completion response: {0}")]
    Malformed(String),
}

/// The topic lookup produced nothing usable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupMiss {
    #[error("no article found for '{0}'")]
    NotFound(String),
    #[error("topic lookup failed: {0}")]
    Transport(String),
}

/// Errors surfaced by the lecture orchestrator.
#[derive(Debug, Error)]
pub enum LectureError {
    #[error(transparent)]
    Completion(#[from] CompletionFailure),
    #[error("invalid lecture configuration: {0}")]
    InvalidConfig(String),
    #[error("cannot {action} while the lecture is {phase}")]
    Phase { action: &'static str, phase: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_failure_converts_into_lecture_error() {
        let err: LectureError = CompletionFailure::RateLimited("slow down".into()).into();
        assert!(matches!(err, LectureError::Completion(CompletionFailure::RateLimited(_))));
        assert_eq!(err.to_string(), "completion rate limited: slow down");
    }

    #[test]
    fn test_phase_error_display() {
        let err = LectureError::Phase {
            action: "close",
            phase: "init".to_string(),
        };
        assert_eq!(err.to_string(), "cannot close while the lecture is init");
    }
}
