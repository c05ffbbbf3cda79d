//! # Job Status Classification
//!
//! Maps the raw status of an observed Job onto a lifecycle state.
//!
//! A Job is terminal only once its `Complete` or `Failed` condition is `True`.
//! The succeeded/failed counters are populated while pods are still running,
//! so they are read only after termination has been established.

use k8s_openapi::api::batch::v1::Job;

/// Lifecycle state of the migration Job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobLifecycle {
    /// No Job exists for the Migration
    Absent,
    /// Job exists and has not reached a terminal condition
    Running,
    /// Terminal with at least one succeeded pod and no failed pods
    Succeeded,
    /// Terminal with at least one failed pod
    Failed,
    /// Terminal but neither counter is set
    Indeterminate,
}

impl JobLifecycle {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            JobLifecycle::Absent => "absent",
            JobLifecycle::Running => "running",
            JobLifecycle::Succeeded => "succeeded",
            JobLifecycle::Failed => "failed",
            JobLifecycle::Indeterminate => "indeterminate",
        }
    }
}

/// Classify an observed Job
///
/// Failure takes precedence over success when both counters are set.
#[must_use]
pub fn classify(job: Option<&Job>) -> JobLifecycle {
    let Some(job) = job else {
        return JobLifecycle::Absent;
    };

    if !is_finished(job) {
        return JobLifecycle::Running;
    }

    let (succeeded, failed) = job
        .status
        .as_ref()
        .map_or((0, 0), |s| (s.succeeded.unwrap_or(0), s.failed.unwrap_or(0)));

    if failed > 0 {
        JobLifecycle::Failed
    } else if succeeded > 0 {
        JobLifecycle::Succeeded
    } else {
        JobLifecycle::Indeterminate
    }
}

/// Whether the Job reached a terminal condition, without telling success from failure
#[must_use]
pub fn is_finished(job: &Job) -> bool {
    job.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| (c.type_ == "Complete" || c.type_ == "Failed") && c.status == "True")
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use k8s_openapi::api::batch::v1::{JobCondition, JobStatus};

    pub(crate) fn job_with_status(
        condition: Option<(&str, &str)>,
        succeeded: Option<i32>,
        failed: Option<i32>,
    ) -> Job {
        Job {
            status: Some(JobStatus {
                conditions: condition.map(|(type_, status)| {
                    vec![JobCondition {
                        type_: type_.to_string(),
                        status: status.to_string(),
                        ..JobCondition::default()
                    }]
                }),
                succeeded,
                failed,
                ..JobStatus::default()
            }),
            ..Job::default()
        }
    }

    #[test]
    fn test_absent_when_no_job() {
        assert_eq!(classify(None), JobLifecycle::Absent);
    }

    #[test]
    fn test_running_without_status() {
        assert_eq!(classify(Some(&Job::default())), JobLifecycle::Running);
    }

    #[test]
    fn test_counters_without_terminal_condition_are_running() {
        let job = job_with_status(None, Some(1), None);
        assert_eq!(classify(Some(&job)), JobLifecycle::Running);

        let job = job_with_status(None, None, Some(1));
        assert_eq!(classify(Some(&job)), JobLifecycle::Running);
    }

    #[test]
    fn test_condition_must_be_true() {
        let job = job_with_status(Some(("Complete", "False")), Some(1), None);
        assert_eq!(classify(Some(&job)), JobLifecycle::Running);
    }

    #[test]
    fn test_complete_with_success() {
        let job = job_with_status(Some(("Complete", "True")), Some(1), None);
        assert_eq!(classify(Some(&job)), JobLifecycle::Succeeded);
    }

    #[test]
    fn test_failed_condition_with_failures() {
        let job = job_with_status(Some(("Failed", "True")), None, Some(3));
        assert_eq!(classify(Some(&job)), JobLifecycle::Failed);
    }

    #[test]
    fn test_failure_wins_over_stale_success() {
        let job = job_with_status(Some(("Complete", "True")), Some(1), Some(1));
        assert_eq!(classify(Some(&job)), JobLifecycle::Failed);
    }

    #[test]
    fn test_terminal_without_counters_is_indeterminate() {
        let job = job_with_status(Some(("Failed", "True")), Some(0), Some(0));
        assert_eq!(classify(Some(&job)), JobLifecycle::Indeterminate);
    }
}
