//! Lifecycle orchestration: submit, then confirm
//!
//! Sequences "submit teardown" → "confirm completion via polling" and
//! produces the final [`LifecycleVerdict`] for the caller. Submission is
//! at-most-once per invocation; confirmation is the only retried phase.

use crate::error::{ErrorCategory, ErrorClassifier};
use crate::resource::ResourceRef;
use crate::wait::{CompletionPoller, Goal, LifecycleVerdict, WaitBudget};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tally of verdicts from a multi-resource teardown
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    pub total: usize,
    pub completed: usize,
    pub already_absent: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
}

impl TeardownReport {
    fn tally(&mut self, verdict: &LifecycleVerdict) {
        match verdict {
            LifecycleVerdict::Completed => self.completed += 1,
            LifecycleVerdict::AlreadyAbsent => self.already_absent += 1,
            LifecycleVerdict::Failed { .. } => self.failed += 1,
            LifecycleVerdict::TimedOut { .. } => self.timed_out += 1,
            LifecycleVerdict::Cancelled { .. } => self.cancelled += 1,
        }
    }

    /// Whether every resource was confirmed gone
    pub fn all_clear(&self) -> bool {
        self.failed == 0 && self.timed_out == 0 && self.cancelled == 0
    }
}

/// Sequences submission and confirmation for resource lifecycles
pub struct Orchestrator<C> {
    poller: CompletionPoller<C>,
}

impl<C: ErrorClassifier> Orchestrator<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            poller: CompletionPoller::new(classifier),
        }
    }

    /// Submit a delete request once, then confirm the resource is gone.
    ///
    /// Submission errors are classified rather than propagated:
    /// - `OperationInProgress`: a delete is already underway from a prior
    ///   attempt; proceed straight to confirmation.
    /// - `NotFound`: the target is already gone; still confirm via one
    ///   query, so repeat teardown of an absent resource yields
    ///   `AlreadyAbsent` the same way both times.
    /// - anything else: return `Failed` without ever polling.
    pub async fn teardown<S, SFut, Q, QFut>(
        &self,
        resource: &ResourceRef,
        budget: &WaitBudget,
        cancel: Option<&CancellationToken>,
        submit: S,
        query: Q,
    ) -> LifecycleVerdict
    where
        S: FnOnce() -> SFut,
        SFut: Future<Output = Result<(), anyhow::Error>>,
        Q: Fn() -> QFut,
        QFut: Future<Output = Result<bool, anyhow::Error>>,
    {
        info!(resource = %resource.description(), "Submitting teardown");

        if let Err(err) = submit().await {
            match self.poller.classifier().classify(&err) {
                ErrorCategory::OperationInProgress => {
                    debug!(
                        resource = %resource.description(),
                        "Delete already in flight, confirming completion"
                    );
                }
                ErrorCategory::NotFound => {
                    debug!(
                        resource = %resource.description(),
                        "Teardown target not found at submission, confirming absence"
                    );
                }
                _ => {
                    warn!(
                        resource = %resource.description(),
                        error = ?err,
                        "Teardown submission failed"
                    );
                    return LifecycleVerdict::Failed { source: err };
                }
            }
        }

        self.poller
            .await_terminal(resource, Goal::Absent, budget, cancel, query)
            .await
    }

    /// Confirm that a previously submitted create operation has settled and
    /// the resource exists.
    ///
    /// `NotFound` is a retry signal here: a freshly created resource may
    /// lag its own control plane's visibility.
    pub async fn confirm_created<Q, QFut>(
        &self,
        resource: &ResourceRef,
        budget: &WaitBudget,
        cancel: Option<&CancellationToken>,
        query: Q,
    ) -> LifecycleVerdict
    where
        Q: Fn() -> QFut,
        QFut: Future<Output = Result<bool, anyhow::Error>>,
    {
        self.poller
            .await_terminal(resource, Goal::Present, budget, cancel, query)
            .await
    }

    /// Tear down a set of resources in dependency order.
    ///
    /// Resources are grouped by [`teardown_priority`]; tiers run
    /// sequentially (children before parents), loops within a tier run
    /// concurrently, each with its own budget clock and attempt counter.
    ///
    /// [`teardown_priority`]: crate::resource::ResourceKind::teardown_priority
    pub async fn teardown_all<SF, SFut, QF, QFut>(
        &self,
        resources: &[ResourceRef],
        budget: &WaitBudget,
        cancel: Option<&CancellationToken>,
        submit_for: SF,
        query_for: QF,
    ) -> TeardownReport
    where
        SF: Fn(&ResourceRef) -> SFut,
        SFut: Future<Output = Result<(), anyhow::Error>>,
        QF: Fn(&ResourceRef) -> QFut,
        QFut: Future<Output = Result<bool, anyhow::Error>>,
    {
        let mut tiers: BTreeMap<u8, Vec<&ResourceRef>> = BTreeMap::new();
        for resource in resources {
            tiers
                .entry(resource.kind.teardown_priority())
                .or_default()
                .push(resource);
        }

        let mut report = TeardownReport {
            total: resources.len(),
            ..Default::default()
        };

        for (priority, tier) in tiers {
            debug!(priority, count = tier.len(), "Tearing down tier");

            let verdicts = join_all(tier.iter().copied().map(|resource| {
                self.teardown(
                    resource,
                    budget,
                    cancel,
                    || submit_for(resource),
                    || query_for(resource),
                )
            }))
            .await;

            for (resource, verdict) in tier.iter().zip(&verdicts) {
                report.tally(verdict);
                if !verdict.is_success() {
                    warn!(
                        resource = %resource.description(),
                        verdict = verdict.as_str(),
                        "Teardown did not complete"
                    );
                }
            }
        }

        info!(
            total = report.total,
            completed = report.completed,
            already_absent = report.already_absent,
            failed = report.failed,
            timed_out = report.timed_out,
            cancelled = report.cancelled,
            "Teardown finished"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::time::Duration;

    #[test]
    fn report_tally_and_all_clear() {
        let mut report = TeardownReport {
            total: 3,
            ..Default::default()
        };
        report.tally(&LifecycleVerdict::Completed);
        report.tally(&LifecycleVerdict::AlreadyAbsent);
        assert!(report.all_clear());

        report.tally(&LifecycleVerdict::TimedOut {
            elapsed: Duration::from_secs(10),
            attempts: 2,
        });
        assert!(!report.all_clear());
        assert_eq!(report.completed, 1);
        assert_eq!(report.already_absent, 1);
        assert_eq!(report.timed_out, 1);
    }

    #[test]
    fn report_counts_failures_and_cancellations() {
        let mut report = TeardownReport::default();
        report.tally(&LifecycleVerdict::Failed {
            source: anyhow!("quota exceeded"),
        });
        report.tally(&LifecycleVerdict::Cancelled {
            elapsed: Duration::ZERO,
            attempts: 0,
        });
        assert_eq!(report.failed, 1);
        assert_eq!(report.cancelled, 1);
        assert!(!report.all_clear());
    }
}
