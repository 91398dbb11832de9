use thiserror::Error;

/// Application-wide error types for mapcheck.
///
/// Assertion mismatches are *not* errors — they are recorded as failed
/// [`crate::report::Outcome`]s on the result. Everything here represents a
/// step that could not be carried out at all.
#[derive(Error, Debug)]
pub enum CheckError {
    /// A wait-condition never became true within its deadline.
    #[error("condition not met within {elapsed_ms} ms: {condition}")]
    Timeout { condition: String, elapsed_ms: u64 },

    /// A driver action (navigate, fill, click, evaluate) could not be performed.
    #[error("interaction failed: {0}")]
    Interaction(String),

    /// Page state could not be extracted (e.g. element disappeared between
    /// wait and capture).
    #[error("capture failed: {0}")]
    Capture(String),

    /// The overall scenario deadline elapsed before all steps completed.
    #[error("scenario deadline exceeded after {0} seconds")]
    DeadlineExceeded(u64),

    /// The run was cancelled by the host.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// JSON serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Screenshot or other file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A target URL could not be parsed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl CheckError {
    /// Short machine-readable label for reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckError::Timeout { .. } => "timeout",
            CheckError::Interaction(_) => "interaction",
            CheckError::Capture(_) => "capture",
            CheckError::DeadlineExceeded(_) => "deadline",
            CheckError::Cancelled(_) => "cancelled",
            CheckError::Serialization(_) => "serialization",
            CheckError::Io(_) => "io",
            CheckError::Url(_) => "url",
            CheckError::Generic(_) => "generic",
        }
    }

    /// Returns true if this error aborted the run from outside the steps
    /// (host deadline or cancellation) rather than from a failing step.
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            CheckError::DeadlineExceeded(_) | CheckError::Cancelled(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_carries_condition_and_elapsed() {
        let err = CheckError::Timeout {
            condition: "at least 1 '.place-item' elements".into(),
            elapsed_ms: 10_042,
        };
        let msg = err.to_string();
        assert!(msg.contains("10042 ms"));
        assert!(msg.contains(".place-item"));
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn test_abort_classification() {
        assert!(CheckError::DeadlineExceeded(30).is_abort());
        assert!(CheckError::Cancelled("ctrl-c".into()).is_abort());
        assert!(!CheckError::Interaction("click rejected".into()).is_abort());
        assert!(!CheckError::Capture("element gone".into()).is_abort());
    }
}
