//! Control-plane error classification
//!
//! Maps opaque errors returned by remote-call collaborators into the small
//! set of categories the confirmation loop acts on. Classification is by
//! error code, not by string matching on the Display format, so the matching
//! rules are swappable per backend without touching the loop logic.

use thiserror::Error;

/// Typed error surfaced by a control-plane client
///
/// Resource-specific clients are expected to wrap their backend's error
/// shape in this (or attach it to an `anyhow` chain) so the default
/// classifier can read the code. Errors without a `RemoteError` in the chain
/// are classified by scanning their Debug representation for known codes.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RemoteError {
    /// Backend error code, if the control plane supplied one
    pub code: Option<String>,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// An error the control plane returned without a code
    pub fn uncoded(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

/// Category of one status-query or submission error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The remote system reports the resource does not exist. For a
    /// delete-confirmation loop this is the success signal.
    NotFound,
    /// A prior asynchronous operation on this resource has not settled yet.
    /// Retry signal.
    OperationInProgress,
    /// Anything else. Not retryable, surfaced immediately.
    Fatal,
    /// The query succeeded with no error at all. Produced by the polling
    /// loop, never by a classifier (classifiers only see actual errors).
    None,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::OperationInProgress => "in_progress",
            ErrorCategory::Fatal => "fatal",
            ErrorCategory::None => "none",
        }
    }
}

/// Maps an opaque collaborator error into an [`ErrorCategory`]
///
/// Implementations must be pure: same error in, same category out, no I/O.
/// An implementation should never return [`ErrorCategory::None`] for an
/// error it was handed; the loop treats that the same as
/// `OperationInProgress` to stay on the safe (retry) side.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &anyhow::Error) -> ErrorCategory;
}

/// Known control-plane error codes for "does not exist" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "NotFound",
    "ResourceNotFound",
    "ResourceGroupNotFound",
    "ParentNotFound",
];

/// Known control-plane error codes for "async operation still settling"
const IN_PROGRESS_CODES: &[&str] = &[
    "AsyncOpIncomplete",
    "AsyncOperationNotComplete",
    "AnotherOperationInProgress",
    "Conflict",
];

/// Default classifier driven by code tables
///
/// The built-in tables cover the codes a typical ARM-style control plane
/// emits; construct with [`CodeClassifier::new`] to match a different
/// backend.
#[derive(Debug, Clone)]
pub struct CodeClassifier {
    not_found: Vec<String>,
    in_progress: Vec<String>,
}

impl Default for CodeClassifier {
    fn default() -> Self {
        Self::new(
            NOT_FOUND_CODES.iter().map(|c| c.to_string()),
            IN_PROGRESS_CODES.iter().map(|c| c.to_string()),
        )
    }
}

impl CodeClassifier {
    pub fn new(
        not_found: impl IntoIterator<Item = String>,
        in_progress: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            not_found: not_found.into_iter().collect(),
            in_progress: in_progress.into_iter().collect(),
        }
    }

    /// Classify a bare error code
    pub fn classify_code(&self, code: &str) -> ErrorCategory {
        if self.not_found.iter().any(|c| c == code) {
            ErrorCategory::NotFound
        } else if self.in_progress.iter().any(|c| c == code) {
            ErrorCategory::OperationInProgress
        } else {
            ErrorCategory::Fatal
        }
    }

    /// Extract a known code from a debug string representation
    ///
    /// Fallback for collaborators that don't surface a typed `RemoteError`.
    fn extract_code<'a>(&'a self, debug_str: &str) -> Option<&'a str> {
        self.not_found
            .iter()
            .chain(self.in_progress.iter())
            .find(|code| debug_str.contains(code.as_str()))
            .map(|code| code.as_str())
    }
}

impl ErrorClassifier for CodeClassifier {
    fn classify(&self, error: &anyhow::Error) -> ErrorCategory {
        // Walk the error chain looking for a typed control-plane error.
        for cause in error.chain() {
            if let Some(remote) = cause.downcast_ref::<RemoteError>() {
                return match &remote.code {
                    Some(code) => self.classify_code(code),
                    None => ErrorCategory::Fatal,
                };
            }
        }

        // Fallback: scan the debug representation for known codes.
        let debug_str = format!("{:?}", error);
        match self.extract_code(&debug_str) {
            Some(code) => self.classify_code(code),
            None => ErrorCategory::Fatal,
        }
    }
}
