//! Error types for the arbor engine.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failures raised while performing an action tree.
///
/// `Failed` is the umbrella kind: arbitrary leaf errors are wrapped into it
/// at the boundary (via the `From` conversions below or
/// [`PerformError::failed`]), while already-well-typed engine failures pass
/// through untouched. The type is `Clone` so a single failure can be both
/// recorded in a [`Report`](crate::report::Report) and propagated to the
/// caller.
#[derive(Debug, Clone, Error)]
pub enum PerformError {
    #[error("Action failed: {0}")]
    Failed(String),
    #[error("Unbound context variable: {0}")]
    Unbound(String),
    #[error("Action timed out after {0:?}")]
    TimedOut(Duration),
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<PerformError>,
    },
    #[error("{} parallel branches failed; first: {}", .secondary.len() + 1, .primary)]
    Aggregate {
        primary: Box<PerformError>,
        secondary: Vec<PerformError>,
    },
    #[error("Worker panicked: {0}")]
    Panicked(String),
}

impl PerformError {
    /// Wrap an arbitrary failure message into the umbrella `Failed` kind.
    pub fn failed(message: impl Into<String>) -> Self {
        PerformError::Failed(message.into())
    }

    /// The kind of this failure, as seen by Attempt/Retry matchers.
    pub fn kind(&self) -> FaultKind {
        match self {
            PerformError::TimedOut(_) => FaultKind::Timeout,
            PerformError::Unbound(_) => FaultKind::Unbound,
            _ => FaultKind::Execution,
        }
    }
}

impl From<std::io::Error> for PerformError {
    fn from(err: std::io::Error) -> Self {
        PerformError::Failed(err.to_string())
    }
}

impl From<serde_json::Error> for PerformError {
    fn from(err: serde_json::Error) -> Self {
        PerformError::Failed(err.to_string())
    }
}

/// Matcher over a failure's kind, used by the Attempt and Retry combinators.
///
/// `Any` plays the supertype role: it matches every failure. The remaining
/// kinds match exactly one branch of [`PerformError::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Any,
    Execution,
    Timeout,
    Unbound,
}

impl FaultKind {
    /// Whether a raised failure is of this kind (or `Any`).
    pub fn matches(&self, err: &PerformError) -> bool {
        *self == FaultKind::Any || *self == err.kind()
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Any => write!(f, "any"),
            FaultKind::Execution => write!(f, "execution"),
            FaultKind::Timeout => write!(f, "timeout"),
            FaultKind::Unbound => write!(f, "unbound"),
        }
    }
}

/// Invalid combinator configuration, rejected at build time.
///
/// Builders fail fast: none of these can surface during execution. Negative
/// retry counts are unrepresentable (`u32` plus the `Unbounded` sentinel), so
/// the builders only have to reject zero delays/durations and missing
/// required fields.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Retry delay must be greater than zero")]
    ZeroRetryDelay,
    #[error("Retry requires an attempt count or unbounded()")]
    MissingRetryCount,
    #[error("Timeout duration must be greater than zero")]
    ZeroTimeout,
    #[error("Attempt requires a fault kind to match")]
    MissingFaultKind,
    #[error("Attempt requires a recovery action")]
    MissingRecovery,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perform_error_display() {
        let err = PerformError::failed("disk on fire");
        assert_eq!(err.to_string(), "Action failed: disk on fire");

        let err = PerformError::Unbound("user".to_string());
        assert_eq!(err.to_string(), "Unbound context variable: user");

        let err = PerformError::TimedOut(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Action timed out after 250ms");
    }

    #[test]
    fn test_retries_exhausted_display_includes_last_cause() {
        let err = PerformError::RetriesExhausted {
            attempts: 4,
            last: Box::new(PerformError::failed("still broken")),
        };
        assert_eq!(
            err.to_string(),
            "Retries exhausted after 4 attempts: Action failed: still broken"
        );
    }

    #[test]
    fn test_aggregate_display_counts_all_branches() {
        let err = PerformError::Aggregate {
            primary: Box::new(PerformError::failed("first")),
            secondary: vec![
                PerformError::failed("second"),
                PerformError::failed("third"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "3 parallel branches failed; first: Action failed: first"
        );
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(PerformError::failed("x").kind(), FaultKind::Execution);
        assert_eq!(
            PerformError::Unbound("x".to_string()).kind(),
            FaultKind::Unbound
        );
        assert_eq!(
            PerformError::TimedOut(Duration::from_secs(1)).kind(),
            FaultKind::Timeout
        );
        assert_eq!(
            PerformError::Panicked("boom".to_string()).kind(),
            FaultKind::Execution
        );
        assert_eq!(
            PerformError::RetriesExhausted {
                attempts: 1,
                last: Box::new(PerformError::failed("x")),
            }
            .kind(),
            FaultKind::Execution
        );
    }

    #[test]
    fn test_fault_kind_any_matches_everything() {
        let errs = [
            PerformError::failed("x"),
            PerformError::Unbound("v".to_string()),
            PerformError::TimedOut(Duration::from_secs(1)),
        ];
        for err in &errs {
            assert!(FaultKind::Any.matches(err));
        }
    }

    #[test]
    fn test_fault_kind_exact_matching() {
        let timeout = PerformError::TimedOut(Duration::from_secs(1));
        assert!(FaultKind::Timeout.matches(&timeout));
        assert!(!FaultKind::Execution.matches(&timeout));
        assert!(!FaultKind::Unbound.matches(&timeout));

        let failed = PerformError::failed("x");
        assert!(FaultKind::Execution.matches(&failed));
        assert!(!FaultKind::Timeout.matches(&failed));
    }

    #[test]
    fn test_fault_kind_display() {
        assert_eq!(FaultKind::Any.to_string(), "any");
        assert_eq!(FaultKind::Execution.to_string(), "execution");
        assert_eq!(FaultKind::Timeout.to_string(), "timeout");
        assert_eq!(FaultKind::Unbound.to_string(), "unbound");
    }

    #[test]
    fn test_from_io_error_wraps_into_failed() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let err: PerformError = io.into();
        assert!(matches!(err, PerformError::Failed(_)));
        assert!(err.to_string().contains("missing file"));
    }

    #[test]
    fn test_build_error_display() {
        assert_eq!(
            BuildError::ZeroRetryDelay.to_string(),
            "Retry delay must be greater than zero"
        );
        assert_eq!(
            BuildError::ZeroTimeout.to_string(),
            "Timeout duration must be greater than zero"
        );
        assert_eq!(
            BuildError::MissingRecovery.to_string(),
            "Attempt requires a recovery action"
        );
    }

    #[test]
    fn test_perform_error_is_clone() {
        let err = PerformError::Aggregate {
            primary: Box::new(PerformError::failed("a")),
            secondary: vec![PerformError::failed("b")],
        };
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }
}
