//! Bounded confirmation polling with cancellation support
//!
//! Drives the retry loop that re-queries resource state until a terminal
//! condition is reached or the wait budget is exhausted. The status query is
//! an opaque async collaborator; every error it returns is routed through an
//! [`ErrorClassifier`] and folded into the final [`LifecycleVerdict`].
//! Classification never escapes this loop as an error.

use crate::error::{ErrorCategory, ErrorClassifier};
use crate::resource::ResourceRef;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Bounds on a confirmation loop's total duration and polling cadence
///
/// Configured by the caller, read-only thereafter. The defaults are policy,
/// not contract; the original deployment ran with a 20-minute timeout and a
/// 3-second interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBudget {
    /// Maximum total time to wait before giving up
    pub timeout: Duration,
    /// Fixed delay between poll attempts
    pub interval: Duration,
}

impl Default for WaitBudget {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(3),
        }
    }
}

impl WaitBudget {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Create a budget with the given timeout and the default interval
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}

/// The terminal condition the loop is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    /// Waiting for the resource to be gone (delete confirmation). A
    /// `NotFound` classification is authoritative success here.
    Absent,
    /// Waiting for the resource to exist (create confirmation). A
    /// `NotFound` classification is a retry signal here; the resource may
    /// simply not be visible yet.
    Present,
}

impl Goal {
    fn satisfied_by(self, present: bool) -> bool {
        match self {
            Goal::Absent => !present,
            Goal::Present => present,
        }
    }
}

/// Result of one status-query attempt
///
/// Produced fresh on every poll, logged, then consumed. The raw error is
/// retained so a `Fatal` classification can surface it in the verdict.
#[derive(Debug)]
pub struct OperationOutcome {
    pub category: ErrorCategory,
    /// Whether the resource was present, when the query succeeded
    pub present: Option<bool>,
    /// The collaborator's error, retained for diagnostics
    pub raw: Option<anyhow::Error>,
    pub observed_at: DateTime<Utc>,
}

impl OperationOutcome {
    fn observed(present: bool) -> Self {
        Self {
            category: ErrorCategory::None,
            present: Some(present),
            raw: None,
            observed_at: Utc::now(),
        }
    }

    fn errored(category: ErrorCategory, raw: anyhow::Error) -> Self {
        Self {
            category,
            present: None,
            raw: Some(raw),
            observed_at: Utc::now(),
        }
    }
}

/// Terminal result of a confirmation loop
///
/// Exactly one variant is produced per invocation. Only `Failed` is an
/// error in the caller's sense; `TimedOut` is retryable by the caller with
/// a fresh budget, while `Failed` needs external diagnosis first.
#[derive(Debug)]
pub enum LifecycleVerdict {
    /// The terminal predicate over the queried state was satisfied
    Completed,
    /// The control plane reported the delete target does not exist
    AlreadyAbsent,
    /// A non-retryable error was observed; carries the raw error
    Failed { source: anyhow::Error },
    /// The wait budget elapsed without a terminal classification
    TimedOut { elapsed: Duration, attempts: u32 },
    /// The caller's cancellation signal fired
    Cancelled { elapsed: Duration, attempts: u32 },
}

impl LifecycleVerdict {
    /// Whether the awaited state was reached
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            LifecycleVerdict::Completed | LifecycleVerdict::AlreadyAbsent
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleVerdict::Completed => "completed",
            LifecycleVerdict::AlreadyAbsent => "already_absent",
            LifecycleVerdict::Failed { .. } => "failed",
            LifecycleVerdict::TimedOut { .. } => "timed_out",
            LifecycleVerdict::Cancelled { .. } => "cancelled",
        }
    }
}

/// Polls a status-query collaborator until a terminal condition is reached
///
/// One poller can serve any number of concurrent confirmation loops; each
/// `await_terminal` call owns its own clock and attempt counter.
pub struct CompletionPoller<C> {
    classifier: C,
}

impl<C: ErrorClassifier> CompletionPoller<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Re-query resource state until the goal is reached, a fatal error is
    /// observed, the budget elapses, or the caller cancels.
    ///
    /// Policy notes, pinned deliberately:
    /// - The deadline is checked before every attempt; an attempt never
    ///   starts past the deadline.
    /// - The inter-attempt sleep is capped at the remaining budget, so the
    ///   loop wakes exactly at the deadline rather than overshooting.
    /// - Cancellation races both the in-flight query and the sleep, so
    ///   cancelling mid-sleep returns within the current interval.
    /// - A `Fatal` classification short-circuits even on the first attempt;
    ///   no minimum retry count is guaranteed.
    pub async fn await_terminal<Q, Fut>(
        &self,
        resource: &ResourceRef,
        goal: Goal,
        budget: &WaitBudget,
        cancel: Option<&CancellationToken>,
        query: Q,
    ) -> LifecycleVerdict
    where
        Q: Fn() -> Fut,
        Fut: Future<Output = Result<bool, anyhow::Error>>,
    {
        let start = Instant::now();
        let deadline = start + budget.timeout;
        let mut attempts = 0u32;

        loop {
            if cancel.is_some_and(|token| token.is_cancelled()) {
                return self.cancelled(resource, start, attempts);
            }

            if Instant::now() >= deadline {
                warn!(
                    resource = %resource.description(),
                    attempts,
                    timeout_ms = budget.timeout.as_millis() as u64,
                    "Confirmation budget exhausted"
                );
                return LifecycleVerdict::TimedOut {
                    elapsed: start.elapsed(),
                    attempts,
                };
            }

            attempts += 1;

            // Abort the in-flight query promptly on cancellation.
            let result = tokio::select! {
                result = query() => result,
                _ = wait_cancelled(cancel) => {
                    return self.cancelled(resource, start, attempts);
                }
            };

            let outcome = match result {
                Ok(present) => OperationOutcome::observed(present),
                Err(err) => OperationOutcome::errored(self.classifier.classify(&err), err),
            };

            debug!(
                resource = %resource.description(),
                attempt = attempts,
                elapsed_ms = start.elapsed().as_millis() as u64,
                category = outcome.category.as_str(),
                present = outcome.present,
                "Poll attempt"
            );

            match outcome.category {
                ErrorCategory::None => {
                    if outcome.present.is_some_and(|p| goal.satisfied_by(p)) {
                        info!(
                            resource = %resource.description(),
                            attempts,
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            goal = ?goal,
                            "Resource reached goal state"
                        );
                        return LifecycleVerdict::Completed;
                    }
                }
                ErrorCategory::NotFound if goal == Goal::Absent => {
                    info!(
                        resource = %resource.description(),
                        attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Resource confirmed absent"
                    );
                    return LifecycleVerdict::AlreadyAbsent;
                }
                // NotFound while awaiting presence means not visible yet.
                // Both it and a still-settling operation are retry signals.
                ErrorCategory::NotFound | ErrorCategory::OperationInProgress => {}
                ErrorCategory::Fatal => {
                    let source = outcome
                        .raw
                        .unwrap_or_else(|| anyhow!("control plane reported a fatal error"));
                    warn!(
                        resource = %resource.description(),
                        attempts,
                        error = ?source,
                        "Confirmation failed"
                    );
                    return LifecycleVerdict::Failed { source };
                }
            }

            // Sleep the fixed interval, capped at the remaining budget and
            // interruptible by cancellation.
            let nap = budget
                .interval
                .min(deadline.saturating_duration_since(Instant::now()));
            tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                _ = wait_cancelled(cancel) => {
                    return self.cancelled(resource, start, attempts);
                }
            }
        }
    }

    fn cancelled(
        &self,
        resource: &ResourceRef,
        start: Instant,
        attempts: u32,
    ) -> LifecycleVerdict {
        info!(
            resource = %resource.description(),
            attempts,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Confirmation cancelled by caller"
        );
        LifecycleVerdict::Cancelled {
            elapsed: start.elapsed(),
            attempts,
        }
    }
}

/// Resolve when the token is cancelled; pend forever when there is none
async fn wait_cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}
