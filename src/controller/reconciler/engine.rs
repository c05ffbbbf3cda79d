//! # Reconciliation Engine
//!
//! Pure decision logic: observed state in, action and planned outcome out.
//! Nothing here touches the cluster.
//!
//! | Observed state        | Action      | Outcome                        |
//! |-----------------------|-------------|--------------------------------|
//! | Paused                | NoOp        | Success                        |
//! | Absent                | Create      | Success                        |
//! | RunningCurrent        | Wait        | SuccessWithRequeue             |
//! | SucceededEquivalent   | NoOp        | Success                        |
//! | SucceededDivergent    | Replace     | Success                        |
//! | FailedEquivalent      | Replace     | retryable `ExecutionFailed`    |
//! | FailedDivergent       | Replace     | retryable `ExecutionFailed`    |
//! | Indeterminate         | ReportError | fatal `InvariantViolation`     |
//!
//! A running Job is never preempted, even when the spec changed under it;
//! the new spec is picked up once the Job terminates.

use crate::controller::job::JobLifecycle;
use crate::controller::reconciler::types::ReconcilerError;
use std::time::Duration;

/// What the reconciler saw, after classification and comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedState {
    Paused,
    Absent,
    RunningCurrent,
    SucceededEquivalent,
    SucceededDivergent,
    FailedEquivalent,
    FailedDivergent,
    Indeterminate,
}

impl ObservedState {
    /// Combine the pause flag, the Job lifecycle and the comparator verdict
    ///
    /// `equivalent` is `None` when there is no Job to compare. Pause wins over
    /// everything else.
    #[must_use]
    pub fn observe(paused: bool, lifecycle: JobLifecycle, equivalent: Option<bool>) -> Self {
        if paused {
            return ObservedState::Paused;
        }
        match (lifecycle, equivalent) {
            (JobLifecycle::Absent, _) => ObservedState::Absent,
            (JobLifecycle::Running, _) => ObservedState::RunningCurrent,
            (JobLifecycle::Succeeded, Some(true)) => ObservedState::SucceededEquivalent,
            (JobLifecycle::Succeeded, Some(false)) => ObservedState::SucceededDivergent,
            (JobLifecycle::Failed, Some(true)) => ObservedState::FailedEquivalent,
            (JobLifecycle::Failed, Some(false)) => ObservedState::FailedDivergent,
            (JobLifecycle::Succeeded | JobLifecycle::Failed, None)
            | (JobLifecycle::Indeterminate, _) => ObservedState::Indeterminate,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservedState::Paused => "paused",
            ObservedState::Absent => "absent",
            ObservedState::RunningCurrent => "running",
            ObservedState::SucceededEquivalent => "succeeded_equivalent",
            ObservedState::SucceededDivergent => "succeeded_divergent",
            ObservedState::FailedEquivalent => "failed_equivalent",
            ObservedState::FailedDivergent => "failed_divergent",
            ObservedState::Indeterminate => "indeterminate",
        }
    }
}

impl std::fmt::Display for ObservedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutation to perform this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    NoOp,
    Create,
    /// Delete the observed Job, then create the candidate
    Replace,
    Wait,
    ReportError,
}

impl JobAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::NoOp => "noop",
            JobAction::Create => "create",
            JobAction::Replace => "replace",
            JobAction::Wait => "wait",
            JobAction::ReportError => "report_error",
        }
    }

    /// Whether the action writes to the cluster
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        matches!(self, JobAction::Create | JobAction::Replace)
    }
}

/// Outcome planned before the action runs
///
/// The reconciler turns retryable errors into `ErrorWithRequeue` with a
/// per-Migration backoff delay.
#[derive(Debug)]
pub enum PlannedOutcome {
    Success,
    SuccessWithRequeue(Duration),
    Retryable(ReconcilerError),
    Fatal(ReconcilerError),
}

/// Full decision for one cycle
#[derive(Debug)]
pub struct Decision {
    pub state: ObservedState,
    pub action: JobAction,
    pub outcome: PlannedOutcome,
}

/// Decide what to do about `state`
///
/// `job_name` names the Job in error values; `running_requeue` is the delay
/// before a running Job is looked at again.
#[must_use]
pub fn decide(state: ObservedState, job_name: &str, running_requeue: Duration) -> Decision {
    let (action, outcome) = match state {
        ObservedState::Paused => (JobAction::NoOp, PlannedOutcome::Success),
        ObservedState::Absent => (JobAction::Create, PlannedOutcome::Success),
        ObservedState::RunningCurrent => (
            JobAction::Wait,
            PlannedOutcome::SuccessWithRequeue(running_requeue),
        ),
        ObservedState::SucceededEquivalent => (JobAction::NoOp, PlannedOutcome::Success),
        ObservedState::SucceededDivergent => (JobAction::Replace, PlannedOutcome::Success),
        ObservedState::FailedEquivalent | ObservedState::FailedDivergent => (
            JobAction::Replace,
            PlannedOutcome::Retryable(ReconcilerError::ExecutionFailed {
                job: job_name.to_string(),
            }),
        ),
        ObservedState::Indeterminate => (
            JobAction::ReportError,
            PlannedOutcome::Fatal(ReconcilerError::InvariantViolation(format!(
                "job {job_name} finished without reporting succeeded or failed pods"
            ))),
        ),
    };

    Decision {
        state,
        action,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEUE: Duration = Duration::from_secs(5);

    const ALL_LIFECYCLES: [JobLifecycle; 5] = [
        JobLifecycle::Absent,
        JobLifecycle::Running,
        JobLifecycle::Succeeded,
        JobLifecycle::Failed,
        JobLifecycle::Indeterminate,
    ];

    #[test]
    fn test_pause_dominates_every_lifecycle() {
        for lifecycle in ALL_LIFECYCLES {
            for equivalent in [None, Some(true), Some(false)] {
                let state = ObservedState::observe(true, lifecycle, equivalent);
                assert_eq!(state, ObservedState::Paused);
                let decision = decide(state, "orders", REQUEUE);
                assert!(!decision.action.is_mutating());
                assert!(matches!(decision.outcome, PlannedOutcome::Success));
            }
        }
    }

    #[test]
    fn test_observe_table() {
        use JobLifecycle as L;
        use ObservedState as S;
        let cases = [
            (L::Absent, None, S::Absent),
            (L::Running, Some(true), S::RunningCurrent),
            (L::Running, Some(false), S::RunningCurrent),
            (L::Succeeded, Some(true), S::SucceededEquivalent),
            (L::Succeeded, Some(false), S::SucceededDivergent),
            (L::Failed, Some(true), S::FailedEquivalent),
            (L::Failed, Some(false), S::FailedDivergent),
            (L::Indeterminate, Some(true), S::Indeterminate),
            (L::Succeeded, None, S::Indeterminate),
        ];
        for (lifecycle, equivalent, expected) in cases {
            assert_eq!(
                ObservedState::observe(false, lifecycle, equivalent),
                expected,
                "{lifecycle:?} / {equivalent:?}"
            );
        }
    }

    #[test]
    fn test_absent_creates() {
        let decision = decide(ObservedState::Absent, "orders", REQUEUE);
        assert_eq!(decision.action, JobAction::Create);
        assert!(matches!(decision.outcome, PlannedOutcome::Success));
    }

    #[test]
    fn test_running_waits_with_requeue() {
        let decision = decide(ObservedState::RunningCurrent, "orders", REQUEUE);
        assert_eq!(decision.action, JobAction::Wait);
        assert!(matches!(
            decision.outcome,
            PlannedOutcome::SuccessWithRequeue(d) if d == REQUEUE
        ));
    }

    #[test]
    fn test_succeeded_equivalent_is_a_fixed_point() {
        let decision = decide(ObservedState::SucceededEquivalent, "orders", REQUEUE);
        assert_eq!(decision.action, JobAction::NoOp);
        assert!(matches!(decision.outcome, PlannedOutcome::Success));
    }

    #[test]
    fn test_succeeded_divergent_replaces() {
        let decision = decide(ObservedState::SucceededDivergent, "orders", REQUEUE);
        assert_eq!(decision.action, JobAction::Replace);
        assert!(matches!(decision.outcome, PlannedOutcome::Success));
    }

    #[test]
    fn test_failed_replaces_and_retries() {
        for state in [ObservedState::FailedEquivalent, ObservedState::FailedDivergent] {
            let decision = decide(state, "orders", REQUEUE);
            assert_eq!(decision.action, JobAction::Replace);
            match decision.outcome {
                PlannedOutcome::Retryable(ReconcilerError::ExecutionFailed { job }) => {
                    assert_eq!(job, "orders");
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
    }

    #[test]
    fn test_indeterminate_is_fatal() {
        let decision = decide(ObservedState::Indeterminate, "orders", REQUEUE);
        assert_eq!(decision.action, JobAction::ReportError);
        assert!(matches!(
            decision.outcome,
            PlannedOutcome::Fatal(ReconcilerError::InvariantViolation(_))
        ));
    }
}
